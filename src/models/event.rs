use chrono::{DateTime, Local};

use crate::models::job::JobCandidate;
use crate::models::recruiter::RecruiterInfo;

/// Format used by every human-readable log line and CSV row.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// A scraped candidate that matched neither roles nor keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipRecord {
    pub timestamp: DateTime<Local>,
    pub job_title: String,
    pub job_link: String,
}

impl SkipRecord {
    pub fn for_job(job: &JobCandidate) -> Self {
        Self {
            timestamp: Local::now(),
            job_title: job.title.clone(),
            job_link: job.link.clone(),
        }
    }
}

/// An apply click that left the source site.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalApplicationRecord {
    pub timestamp: DateTime<Local>,
    pub job_title: String,
    pub company: String,
    pub naukri_link: String,
    pub external_url: String,
}

impl ExternalApplicationRecord {
    pub fn for_job(job: &JobCandidate, external_url: &str) -> Self {
        Self {
            timestamp: Local::now(),
            job_title: job.title.clone(),
            company: job.company.clone(),
            naukri_link: job.link.clone(),
            external_url: external_url.to_string(),
        }
    }
}

/// Recruiter details left for manual follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RecruiterContactRecord {
    pub timestamp: DateTime<Local>,
    pub job_title: String,
    pub hr_name: String,
    pub contact_info: String,
}

impl RecruiterContactRecord {
    pub fn for_job(job: &JobCandidate, recruiter: &RecruiterInfo) -> Self {
        Self {
            timestamp: Local::now(),
            job_title: job.title.clone(),
            hr_name: recruiter.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            contact_info: recruiter.contact.clone().unwrap_or_else(|| "N/A".to_string()),
        }
    }

    /// `timestamp | Job: <title> | HR Name: <name> | Contact Info: <info>`
    pub fn to_line(&self) -> String {
        format!(
            "{} | Job: {} | HR Name: {} | Contact Info: {}",
            format_timestamp(&self.timestamp),
            self.job_title,
            self.hr_name,
            self.contact_info
        )
    }
}

/// `timestamp | title | link`
pub fn applied_line(at: &DateTime<Local>, job: &JobCandidate) -> String {
    format!("{} | {} | {}", format_timestamp(at), job.title, job.link)
}
