use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::collectors::SearchApi;
use crate::error::AgentError;
use crate::models::job::{JobCandidate, JobSource};

const BASE_URL: &str = "https://jsearch.p.rapidapi.com/search";
const RAPIDAPI_HOST: &str = "jsearch.p.rapidapi.com";

/// JSearch (RapidAPI) client.
pub struct JSearchClient {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Deserialize)]
struct JSearchJob {
    #[serde(default)]
    job_title: String,
    job_apply_link: Option<String>,
    job_google_link: Option<String>,
    employer_name: Option<String>,
    #[serde(default)]
    job_description: String,
}

impl JSearchClient {
    pub fn new(api_key: String) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { api_key, client })
    }
}

/// JSearch buckets experience into named ranges.
fn experience_bucket(years: &str) -> Option<&'static str> {
    let years: f64 = years.trim().parse().ok()?;
    Some(if years < 1.0 {
        "no_experience"
    } else if years < 3.0 {
        "under_3_years_experience"
    } else {
        "more_than_3_years_experience"
    })
}

#[async_trait]
impl SearchApi for JSearchClient {
    fn name(&self) -> &str {
        "jsearch"
    }

    fn source(&self) -> JobSource {
        JobSource::JSearch
    }

    async fn search(
        &self,
        role: &str,
        location: &str,
        experience: &str,
    ) -> Result<Vec<JobCandidate>, AgentError> {
        let query = format!("{role} in {location}");
        let mut params = vec![("query", query.as_str()), ("page", "1"), ("num_pages", "1")];
        if let Some(bucket) = experience_bucket(experience) {
            params.push(("job_requirements", bucket));
        }

        let resp = self
            .client
            .get(BASE_URL)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(&params)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::JobProcessing(format!(
                "JSearch returned {status}: {body}"
            )));
        }

        let data: JSearchResponse = resp.json().await?;
        Ok(parse_results(data))
    }
}

fn parse_results(data: JSearchResponse) -> Vec<JobCandidate> {
    data.data
        .into_iter()
        .filter_map(|job| {
            let usable = |l: &String| !l.trim().is_empty();
            let link = job
                .job_apply_link
                .filter(usable)
                .or(job.job_google_link.filter(usable))?;
            Some(
                JobCandidate::new(
                    job.job_title.trim(),
                    link.trim(),
                    job.employer_name.unwrap_or_else(|| "Unknown".to_string()),
                    JobSource::JSearch,
                )
                .with_description(job.job_description),
            )
        })
        .collect()
}
