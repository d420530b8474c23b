use std::collections::HashSet;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use scraper::{ElementRef, Html};
use url::Url;

use crate::browser::{BrowsingSession, Lookup, document};
use crate::error::AgentError;
use crate::models::job::{JobCandidate, JobSource};

/// Registrable domain of the source site; anything else counts as external.
pub const SITE_DOMAIN: &str = "naukri.com";
pub const BASE_URL: &str = "https://www.naukri.com";

/// Slug characters left as-is in search paths.
const SLUG_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-');

/// One layout of search-result cards.
struct CardPattern {
    name: &'static str,
    card: &'static str,
    title: &'static str,
    company: &'static str,
}

/// Result-card layouts, most specific first.
const CARD_PATTERNS: &[CardPattern] = &[
    CardPattern {
        name: "job-tuple",
        card: "article.jobTuple",
        title: "a.title",
        company: "a.subTitle, a.comp-name",
    },
    CardPattern {
        name: "srp-wrapper",
        card: "div.srp-jobtuple-wrapper",
        title: "a.title",
        company: "a.comp-name, a.subTitle",
    },
    CardPattern {
        name: "cust-tuple",
        card: "div.cust-job-tuple",
        title: "a.title, h2 a",
        company: "a.comp-name, [class*='comp-name']",
    },
    CardPattern {
        name: "data-job-id",
        card: "[data-job-id]",
        title: "a[href]",
        company: "[class*='comp']",
    },
];

const FALLBACK_PATTERN: &str = "generic-links";

/// Scrapes search-result pages through the browsing session.
pub struct SiteScraper {
    settle_timeout: Duration,
}

impl SiteScraper {
    pub fn new(settle_timeout: Duration) -> Self {
        Self { settle_timeout }
    }

    /// `{base}/{role}-jobs-in-{location}?experience={n}`
    pub fn search_url(role: &str, location: &str, experience: &str) -> String {
        format!(
            "{BASE_URL}/{}-jobs-in-{}?experience={}",
            slug(role),
            slug(location),
            utf8_percent_encode(experience.trim(), NON_ALPHANUMERIC)
        )
    }

    pub async fn scrape(
        &self,
        session: &mut dyn BrowsingSession,
        role: &str,
        location: &str,
        experience: &str,
    ) -> Result<Vec<JobCandidate>, AgentError> {
        let url = Self::search_url(role, location, experience);
        session.navigate(&url).await?;
        if session.wait_for_quiescence(self.settle_timeout).await == Lookup::TimedOut {
            tracing::debug!(url = %url, "results page still busy, reading it anyway");
        }

        let markup = session.content().await?;
        let page_url = session
            .current_url()
            .and_then(|u| Url::parse(&u).ok())
            .map_or_else(|| Url::parse(&url), Ok)?;

        let (pattern, jobs) = extract_postings(&markup, &page_url, role);
        tracing::info!(role, location, pattern, "Found {} postings", jobs.len());
        Ok(jobs)
    }
}

fn slug(value: &str) -> String {
    let joined = value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    utf8_percent_encode(&joined, SLUG_SET).to_string()
}

/// Extract postings with the first card pattern that yields any, falling
/// back to posting-like links. Returns the pattern name used.
pub fn extract_postings(markup: &str, page_url: &Url, role: &str) -> (&'static str, Vec<JobCandidate>) {
    let doc = Html::parse_document(markup);

    for pattern in CARD_PATTERNS {
        let jobs = collect_unique(
            document::select_all(&doc, pattern.card)
                .iter()
                .filter_map(|card| parse_card(card, pattern, page_url)),
        );
        if !jobs.is_empty() {
            return (pattern.name, jobs);
        }
    }

    let jobs = collect_unique(
        document::select_all(&doc, "a[href]")
            .iter()
            .filter_map(|a| parse_link(a, page_url, role)),
    );
    (FALLBACK_PATTERN, jobs)
}

fn collect_unique(jobs: impl Iterator<Item = JobCandidate>) -> Vec<JobCandidate> {
    let mut seen = HashSet::new();
    jobs.filter(|job| seen.insert(job.link.clone())).collect()
}

fn resolve_link(href: &str, page_url: &Url) -> Option<String> {
    let mut url = page_url.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

fn parse_card(card: &ElementRef<'_>, pattern: &CardPattern, page_url: &Url) -> Option<JobCandidate> {
    let title_el = document::first_in(card, pattern.title)?;
    let link = resolve_link(document::attribute(&title_el, "href")?, page_url)?;
    let title = document::text(&title_el);
    if title.is_empty() {
        return None;
    }
    let company = document::first_in(card, pattern.company)
        .map(|el| document::text(&el))
        .unwrap_or_default();

    Some(
        JobCandidate::new(title, link, company, JobSource::Scrape)
            .with_description(document::text(card)),
    )
}

/// Words in link text that mark a single posting.
const POSTING_WORDS: &[&str] = &["hiring", "opening", "vacancy"];

/// Last resort: anchors whose target or text looks like an individual posting.
fn parse_link(anchor: &ElementRef<'_>, page_url: &Url, role: &str) -> Option<JobCandidate> {
    let href = document::attribute(anchor, "href")?;
    let title = Some(document::text(anchor))
        .filter(|t| !t.is_empty())
        .or_else(|| document::attribute(anchor, "title").map(document::clean_text))?;
    if title.chars().count() > 150 {
        return None;
    }

    let target = href.to_lowercase();
    let target_matches =
        target.contains("job-listings") || target.contains("/job/") || target.contains("jobid=");
    // Related-search links repeat the role, so they never count on text alone.
    let text_matches = !target.contains("-jobs-in-") && {
        let text = title.to_lowercase();
        let role = role.trim().to_lowercase();
        (!role.is_empty() && text.contains(&role)) || POSTING_WORDS.iter().any(|w| text.contains(w))
    };
    if !target_matches && !text_matches {
        return None;
    }
    let link = resolve_link(href, page_url)?;
    Some(JobCandidate::new(title, link, "", JobSource::Scrape))
}
