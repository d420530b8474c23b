//! Document queries over raw markup.
//!
//! Everything here is synchronous and works on a freshly parsed
//! `scraper::Html`, so callers never hold a parsed document across an await.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::browser::{ElementHandle, FormSnapshot, Locator};

/// Collapse runs of whitespace into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(selector = css, "invalid selector: {e}");
            None
        }
    }
}

pub fn text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

pub fn attribute<'a>(el: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// First descendant of `el` matching `css`.
pub fn first_in<'a>(el: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    el.select(&sel).next()
}

pub fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => doc.select(&sel).collect(),
        None => Vec::new(),
    }
}

pub fn page_title(markup: &str) -> Option<String> {
    let doc = Html::parse_document(markup);
    let sel = selector("title")?;
    doc.select(&sel)
        .next()
        .map(|el| text(&el))
        .filter(|t| !t.is_empty())
}

/// Rendered text of the document, excluding script and style bodies.
pub fn visible_text(markup: &str) -> String {
    let doc = Html::parse_document(markup);
    let mut out = String::new();
    for node in doc.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else { continue };
        let in_script = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
            .is_some_and(|name| matches!(name.as_str(), "script" | "style" | "noscript"));
        if !in_script {
            out.push_str(chunk);
            out.push(' ');
        }
    }
    clean_text(&out)
}

/// Parsed `application/ld+json` blocks; top-level arrays are flattened.
pub fn json_ld(markup: &str) -> Vec<Value> {
    let doc = Html::parse_document(markup);
    let mut blocks = Vec::new();
    for el in select_all(&doc, r#"script[type="application/ld+json"]"#) {
        let raw = el.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Array(items)) => blocks.extend(items),
            Ok(v) => blocks.push(v),
            Err(e) => tracing::debug!("skipping malformed JSON-LD block: {e}"),
        }
    }
    blocks
}

/// Evaluate a locator against `markup`. Prefers the first visible match and
/// falls back to the first hidden one so the caller can see why it was
/// rejected.
pub fn find(markup: &str, locator: &Locator) -> Option<ElementHandle> {
    let doc = Html::parse_document(markup);
    let (css, needle) = match *locator {
        Locator::Text { tag, text } => (tag.to_string(), Some(text)),
        Locator::Role { role, name } => (format!(r#"[role="{role}"]"#), Some(name)),
        Locator::Class { tag, fragment } => (format!(r#"{tag}[class*="{fragment}"]"#), None),
        Locator::Css(css) => (css.to_string(), None),
    };

    let needle = needle.map(str::to_lowercase);
    let candidates = select_all(&doc, &css).into_iter().filter(|el| match &needle {
        None => true,
        Some(n) => accessible_name(el).to_lowercase().contains(n.as_str()),
    });

    let mut first_hidden = None;
    for el in candidates {
        if is_visible(&el) {
            return Some(snapshot(&el));
        }
        if first_hidden.is_none() {
            first_hidden = Some(snapshot(&el));
        }
    }
    first_hidden
}

fn accessible_name(el: &ElementRef<'_>) -> String {
    let label = el.value().attr("aria-label").unwrap_or_default();
    let value = match el.value().name() {
        "input" => el.value().attr("value").unwrap_or_default(),
        _ => "",
    };
    format!("{} {label} {value}", text(el))
}

fn hides(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    if v.attr("hidden").is_some() || v.attr("aria-hidden") == Some("true") {
        return true;
    }
    v.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn is_visible(el: &ElementRef<'_>) -> bool {
    if el.value().name() == "input" && el.value().attr("type") == Some("hidden") {
        return false;
    }
    if hides(el) {
        return false;
    }
    !el.ancestors().filter_map(ElementRef::wrap).any(|a| hides(&a))
}

fn is_enabled(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    v.attr("disabled").is_none()
        && v.attr("readonly").is_none()
        && v.attr("aria-disabled") != Some("true")
}

fn snapshot(el: &ElementRef<'_>) -> ElementHandle {
    let attrs: BTreeMap<String, String> = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let form = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "form")
        .map(|f| form_snapshot(&f));

    ElementHandle {
        tag: el.value().name().to_string(),
        text: text(el),
        attrs,
        visible: is_visible(el),
        enabled: is_enabled(el),
        form,
    }
}

fn form_snapshot(form: &ElementRef<'_>) -> FormSnapshot {
    let mut fields = Vec::new();
    if let Some(sel) = selector("input[name], textarea[name], select[name]") {
        for field in form.select(&sel) {
            let v = field.value();
            let Some(name) = v.attr("name") else { continue };
            let value = match v.name() {
                "textarea" => field.text().collect::<String>(),
                "input" => {
                    let kind = v.attr("type").unwrap_or("text").to_ascii_lowercase();
                    let unchecked = matches!(kind.as_str(), "checkbox" | "radio")
                        && v.attr("checked").is_none();
                    if unchecked || matches!(kind.as_str(), "submit" | "button" | "image" | "reset") {
                        continue;
                    }
                    v.attr("value").unwrap_or_default().to_string()
                }
                _ => String::new(),
            };
            fields.push((name.to_string(), value));
        }
    }

    FormSnapshot {
        action: form.value().attr("action").map(String::from),
        method: form
            .value()
            .attr("method")
            .unwrap_or("get")
            .to_ascii_lowercase(),
        fields,
    }
}
