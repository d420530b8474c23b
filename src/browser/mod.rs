// Browsing session capability.
// The driver, scraper and outreach channels only talk to pages through the
// BrowsingSession trait; every lookup returns a typed Lookup instead of an
// error so "try the next strategy" is an explicit branch.

pub mod document;
pub mod http;

#[cfg(test)]
pub mod fake;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::AgentError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of a bounded lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    TimedOut,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound | Lookup::TimedOut => None,
        }
    }
}

/// How to find an element in the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// `tag` whose text contains `text`, case-insensitively.
    Text { tag: &'static str, text: &'static str },
    /// Element with ARIA `role` whose accessible name contains `name`.
    Role { role: &'static str, name: &'static str },
    /// `tag` whose class attribute contains `fragment`.
    Class { tag: &'static str, fragment: &'static str },
    /// Plain CSS selector.
    Css(&'static str),
}

/// A named entry in an ordered fallback list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub locator: Locator,
}

impl Strategy {
    pub const fn new(name: &'static str, locator: Locator) -> Self {
        Self { name, locator }
    }
}

/// Form enclosing an element, captured when the element was found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    pub action: Option<String>,
    pub method: String,
    pub fields: Vec<(String, String)>,
}

/// Snapshot of a located element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementHandle {
    pub tag: String,
    pub text: String,
    pub attrs: BTreeMap<String, String>,
    pub visible: bool,
    pub enabled: bool,
    pub form: Option<FormSnapshot>,
}

/// What a click on an element does to the browsing context.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    Follow(Url),
    OpenContext(Url),
    Submit {
        url: Url,
        method: String,
        fields: Vec<(String, String)>,
    },
    Inert,
}

impl ElementHandle {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }

    /// Key under which a filled value is submitted.
    pub fn field_name(&self) -> Option<&str> {
        self.attr("name").or_else(|| self.attr("id"))
    }

    pub fn is_submit_control(&self) -> bool {
        match self.tag.as_str() {
            "button" => !matches!(self.attr("type"), Some("button") | Some("reset")),
            "input" => matches!(self.attr("type"), Some("submit") | Some("image")),
            _ => false,
        }
    }

    /// Resolve the effect of clicking this element against the page URL.
    pub fn click_action(&self, base: &Url) -> ClickAction {
        if let Some(href) = self.attr("href").map(str::trim) {
            let scripted = href.is_empty()
                || href.starts_with('#')
                || href.to_ascii_lowercase().starts_with("javascript:");
            if !scripted && let Ok(url) = base.join(href) {
                if self.attr("target") == Some("_blank") {
                    return ClickAction::OpenContext(url);
                }
                return ClickAction::Follow(url);
            }
        }

        if self.is_submit_control()
            && let Some(form) = &self.form
        {
            return form_action(form, base);
        }

        ClickAction::Inert
    }
}

/// Submission target of `form`, relative to the page URL.
pub fn form_action(form: &FormSnapshot, base: &Url) -> ClickAction {
    let url = form
        .action
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .and_then(|a| base.join(a).ok())
        .unwrap_or_else(|| base.clone());
    ClickAction::Submit {
        url,
        method: form.method.clone(),
        fields: form.fields.clone(),
    }
}

/// A long-lived page-automation context.
#[async_trait]
pub trait BrowsingSession: Send {
    /// Load `url` into the current context.
    async fn navigate(&mut self, url: &str) -> Result<(), AgentError>;

    /// Wait until the current page stops changing.
    async fn wait_for_quiescence(&mut self, timeout: Duration) -> Lookup<()>;

    async fn find_element(&mut self, locator: &Locator) -> Lookup<ElementHandle>;

    /// Poll `find_element` until it matches or `timeout` elapses.
    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Lookup<ElementHandle> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Lookup::Found(el) = self.find_element(locator).await {
                return Lookup::Found(el);
            }
            if tokio::time::Instant::now() >= deadline {
                return Lookup::TimedOut;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), AgentError>;

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), AgentError>;

    /// Press Enter in `element`.
    async fn submit(&mut self, element: &ElementHandle) -> Result<(), AgentError>;

    fn current_url(&self) -> Option<String>;

    async fn content(&mut self) -> Result<String, AgentError>;

    async fn title(&mut self) -> Option<String> {
        let markup = self.content().await.ok()?;
        document::page_title(&markup)
    }

    /// URL of a tab or window opened since the last call, if any.
    async fn take_new_context(&mut self) -> Option<String>;

    async fn close(&mut self) -> Result<(), AgentError>;
}

/// Walk `strategies` in order and return the first hit accepted by `accept`.
/// A miss, a timeout or a rejected hit only moves on to the next strategy.
pub async fn first_match<F>(
    session: &mut dyn BrowsingSession,
    strategies: &[Strategy],
    accept: F,
) -> Option<(&'static str, ElementHandle)>
where
    F: Fn(&ElementHandle) -> bool + Send + Sync,
{
    for strategy in strategies {
        match session.find_element(&strategy.locator).await {
            Lookup::Found(el) if accept(&el) => return Some((strategy.name, el)),
            Lookup::Found(_) => {
                tracing::debug!(strategy = strategy.name, "match rejected (hidden or disabled)");
            }
            Lookup::NotFound => tracing::debug!(strategy = strategy.name, "no match"),
            Lookup::TimedOut => tracing::debug!(strategy = strategy.name, "lookup timed out"),
        }
    }
    None
}

/// Click the first actionable element found by `strategies`. A failed click
/// moves on to the next strategy.
pub async fn click_first(
    session: &mut dyn BrowsingSession,
    strategies: &[Strategy],
) -> Option<(&'static str, ElementHandle)> {
    for strategy in strategies {
        let el = match session.find_element(&strategy.locator).await {
            Lookup::Found(el) if el.is_actionable() => el,
            Lookup::Found(_) => {
                tracing::debug!(strategy = strategy.name, "match rejected (hidden or disabled)");
                continue;
            }
            Lookup::NotFound | Lookup::TimedOut => continue,
        };
        match session.click(&el).await {
            Ok(()) => return Some((strategy.name, el)),
            Err(e) => tracing::debug!(strategy = strategy.name, "click failed: {e}"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(tag: &str, attrs: &[(&str, &str)]) -> ElementHandle {
        ElementHandle {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            visible: true,
            enabled: true,
            ..Default::default()
        }
    }

    fn base() -> Url {
        Url::parse("https://www.naukri.com/job-listings-ml-engineer-123").unwrap()
    }

    #[test]
    fn anchor_follows_resolved_href() {
        let el = handle("a", &[("href", "/apply/123")]);
        assert_eq!(
            el.click_action(&base()),
            ClickAction::Follow(Url::parse("https://www.naukri.com/apply/123").unwrap())
        );
    }

    #[test]
    fn blank_target_opens_context() {
        let el = handle("a", &[("href", "https://careers.example.com/apply"), ("target", "_blank")]);
        assert!(matches!(el.click_action(&base()), ClickAction::OpenContext(_)));
    }

    #[test]
    fn script_links_and_plain_buttons_are_inert() {
        assert_eq!(handle("a", &[("href", "javascript:void(0)")]).click_action(&base()), ClickAction::Inert);
        assert_eq!(handle("a", &[("href", "#")]).click_action(&base()), ClickAction::Inert);
        assert_eq!(handle("button", &[]).click_action(&base()), ClickAction::Inert);
    }

    #[test]
    fn submit_button_posts_enclosing_form() {
        let mut el = handle("button", &[]);
        el.form = Some(FormSnapshot {
            action: Some("/login".into()),
            method: "post".into(),
            fields: vec![("user".into(), String::new())],
        });
        match el.click_action(&base()) {
            ClickAction::Submit { url, method, fields } => {
                assert_eq!(url.as_str(), "https://www.naukri.com/login");
                assert_eq!(method, "post");
                assert_eq!(fields.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_button_inside_form_does_not_submit() {
        let mut el = handle("button", &[("type", "button")]);
        el.form = Some(FormSnapshot::default());
        assert_eq!(el.click_action(&base()), ClickAction::Inert);
    }
}
