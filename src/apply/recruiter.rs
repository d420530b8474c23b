use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::apply::strategies::{RECRUITER_CONTACT, RECRUITER_NAME, REVEAL_RECRUITER};
use crate::browser::{BrowsingSession, ElementHandle, click_first, document, first_match};
use crate::models::recruiter::RecruiterInfo;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

const CONTACT_KEYS: [&str; 3] = ["recruiter", "applicationContact", "contactPoint"];
const MAX_JSON_DEPTH: usize = 6;

fn plausible_name(text: &str) -> bool {
    (2..=60).contains(&text.chars().count())
}

/// Read recruiter details from the current page.
///
/// Order: reveal controls, name and contact strategies, an email-shaped
/// substring in the visible text, then JSON-LD contact fields. Addresses at
/// `site_domain` belong to the portal, not the recruiter.
pub async fn extract(session: &mut dyn BrowsingSession, site_domain: &str) -> RecruiterInfo {
    if let Some((strategy, _)) = click_first(session, REVEAL_RECRUITER).await {
        tracing::debug!(strategy, "Revealed recruiter details");
    }

    let name = first_match(session, RECRUITER_NAME, |el| el.visible && plausible_name(&el.text))
        .await
        .map(|(_, el)| el.text);
    let contact = first_match(session, RECRUITER_CONTACT, |el| contact_from(el).is_some())
        .await
        .and_then(|(_, el)| contact_from(&el));

    let mut info = RecruiterInfo { name, contact };
    if info.name.is_some() && info.contact.is_some() {
        return info;
    }

    let markup = session.content().await.unwrap_or_default();
    if info.contact.is_none() {
        info.contact = find_email(&document::visible_text(&markup), site_domain);
    }
    if info.name.is_none() || info.contact.is_none() {
        let structured = structured_contact(&document::json_ld(&markup));
        info.name = info.name.or(structured.name);
        info.contact = info.contact.or(structured.contact);
    }
    info
}

/// Email from a `mailto:` link, or the profile URL itself.
fn contact_from(el: &ElementHandle) -> Option<String> {
    let href = el.attr("href")?.trim();
    if let Some(rest) = href.strip_prefix("mailto:") {
        let address = rest.split('?').next().unwrap_or_default().trim();
        return (!address.is_empty()).then(|| address.to_string());
    }
    (!href.is_empty()).then(|| href.to_string())
}

pub fn find_email(text: &str, site_domain: &str) -> Option<String> {
    let portal = site_domain.to_lowercase();
    EMAIL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .find(|addr| {
            let domain = addr.rsplit('@').next().unwrap_or_default().to_lowercase();
            domain != portal && !domain.ends_with(&format!(".{portal}"))
        })
}

/// Name and email or profile URL from the first contact-like object in JSON-LD.
pub fn structured_contact(blocks: &[Value]) -> RecruiterInfo {
    for block in blocks {
        if let Some(obj) = find_contact_object(block, 0) {
            let text = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
            };
            let info = RecruiterInfo {
                name: text("name").filter(|n| plausible_name(n)),
                contact: text("email").or_else(|| text("url")),
            };
            if !info.is_empty() {
                return info;
            }
        }
    }
    RecruiterInfo::default()
}

fn find_contact_object(value: &Value, depth: usize) -> Option<&Map<String, Value>> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            for key in CONTACT_KEYS {
                match map.get(key) {
                    Some(Value::Object(obj)) => return Some(obj),
                    Some(Value::Array(items)) => {
                        if let Some(obj) = items.iter().find_map(Value::as_object) {
                            return Some(obj);
                        }
                    }
                    _ => {}
                }
            }
            map.values().find_map(|v| find_contact_object(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| find_contact_object(v, depth + 1)),
        _ => None,
    }
}
