//! Ordered fallback lists for the job detail page.

use crate::browser::Locator::{Class, Css, Role, Text};
use crate::browser::Strategy;

pub const APPLY: &[Strategy] = &[
    Strategy::new("apply-now-button", Text { tag: "button", text: "apply now" }),
    Strategy::new("easy-apply-button", Text { tag: "button", text: "easy apply" }),
    Strategy::new("apply-button", Text { tag: "button", text: "apply" }),
    Strategy::new("apply-link", Text { tag: "a", text: "apply" }),
    Strategy::new("interested-button", Text { tag: "button", text: "i am interested" }),
    Strategy::new("aria-apply", Role { role: "button", name: "apply" }),
    Strategy::new("apply-button-class", Class { tag: "*", fragment: "apply-button" }),
    Strategy::new("apply-btn-class", Class { tag: "*", fragment: "apply-btn" }),
];

/// "Continue on company site" style affordances, tried when no apply control is usable.
pub const COMPANY_SITE: &[Strategy] = &[
    Strategy::new("company-site-button", Text { tag: "button", text: "company site" }),
    Strategy::new("company-site-link", Text { tag: "a", text: "company site" }),
    Strategy::new("company-site-class", Class { tag: "*", fragment: "company-site" }),
];

/// Controls that expand hidden recruiter details.
pub const REVEAL_RECRUITER: &[Strategy] = &[
    Strategy::new("view-contact", Text { tag: "button", text: "view contact" }),
    Strategy::new("show-contact", Text { tag: "button", text: "show contact" }),
    Strategy::new("view-recruiter", Text { tag: "a", text: "view recruiter" }),
];

pub const RECRUITER_NAME: &[Strategy] = &[
    Strategy::new("recruiter-name-span", Css("span[class*='recruiter-name']")),
    Strategy::new("recruiter-block-span", Css("div[class*='recruiter'] span")),
    Strategy::new("recruiter-link-span", Css("a[href*='recruiter'] span")),
    Strategy::new("hr-name-class", Class { tag: "*", fragment: "hr-name" }),
];

pub const RECRUITER_CONTACT: &[Strategy] = &[
    Strategy::new("mailto-link", Css("a[href^='mailto:']")),
    Strategy::new("linkedin-profile", Css("a[href*='linkedin.com/in/']")),
];
