use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::collectors::SearchApi;
use crate::config::AdzunaSettings;
use crate::error::AgentError;
use crate::models::job::{JobCandidate, JobSource};

const BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";
const PAGE_SIZE: u32 = 20;

pub struct AdzunaClient {
    settings: AdzunaSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    redirect_url: String,
    #[serde(default)]
    description: String,
    company: Option<AdzunaCompany>,
}

#[derive(Debug, Deserialize)]
struct AdzunaCompany {
    display_name: Option<String>,
}

impl AdzunaClient {
    pub fn new(settings: AdzunaSettings) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { settings, client })
    }
}

#[async_trait]
impl SearchApi for AdzunaClient {
    fn name(&self) -> &str {
        "adzuna"
    }

    fn source(&self) -> JobSource {
        JobSource::Adzuna
    }

    async fn search(
        &self,
        role: &str,
        location: &str,
        _experience: &str,
    ) -> Result<Vec<JobCandidate>, AgentError> {
        let url = format!("{BASE_URL}/{}/search/1", self.settings.country);
        let page_size = PAGE_SIZE.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("app_id", self.settings.app_id.as_str()),
                ("app_key", self.settings.app_key.as_str()),
                ("what", role),
                ("where", location),
                ("results_per_page", page_size.as_str()),
                ("content-type", "application/json"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::JobProcessing(format!(
                "Adzuna returned {status}: {body}"
            )));
        }

        let data: AdzunaResponse = resp.json().await?;
        Ok(parse_results(data))
    }
}

fn parse_results(data: AdzunaResponse) -> Vec<JobCandidate> {
    data.results
        .into_iter()
        .filter(|job| !job.redirect_url.trim().is_empty())
        .map(|job| {
            let company = job
                .company
                .and_then(|c| c.display_name)
                .unwrap_or_else(|| "Unknown".to_string());
            JobCandidate::new(job.title.trim(), job.redirect_url.trim(), company, JobSource::Adzuna)
                .with_description(job.description)
        })
        .collect()
}
