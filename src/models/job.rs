use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobSource {
    #[serde(rename = "scrape")]
    Scrape,
    #[serde(rename = "api:adzuna")]
    Adzuna,
    #[serde(rename = "api:jsearch")]
    JSearch,
}

impl JobSource {
    /// Structured search APIs only return postings matching the query, so
    /// their results skip the keyword filter.
    pub fn is_structured(self) -> bool {
        !matches!(self, JobSource::Scrape)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobSource::Scrape => "scrape",
            JobSource::Adzuna => "api:adzuna",
            JobSource::JSearch => "api:jsearch",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered posting. Identity is `link`: two candidates with the same
/// link are the same job regardless of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub title: String,
    pub link: String,
    pub company: String,
    pub source: JobSource,
    /// Card or API snippet text, only consulted by the relevance filter.
    #[serde(default)]
    pub description: String,
}

impl JobCandidate {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        company: impl Into<String>,
        source: JobSource,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            company: company.into(),
            source,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// True when the title names one of `roles`, or the title plus
    /// description mention one of `keywords`. Case-insensitive substring match.
    pub fn matches(&self, roles: &[String], keywords: &[String]) -> bool {
        let title = self.title.to_lowercase();
        let title_match = roles
            .iter()
            .map(|r| r.trim().to_lowercase())
            .any(|r| !r.is_empty() && title.contains(&r));
        if title_match {
            return true;
        }

        let text = format!("{title} {}", self.description.to_lowercase());
        keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && text.contains(&k))
    }
}
