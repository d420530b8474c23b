// Job source adapters and the discovery orchestrator.
// Search APIs implement SearchApi; the site scraper drives the browsing
// session directly because result pages need the logged-in context.

pub mod adzuna;
pub mod discovery;
pub mod jsearch;
pub mod naukri;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::AgentError;
use crate::models::job::{JobCandidate, JobSource};

/// A structured job-search API.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn source(&self) -> JobSource;

    /// Postings for one (role, location) query.
    async fn search(
        &self,
        role: &str,
        location: &str,
        experience: &str,
    ) -> Result<Vec<JobCandidate>, AgentError>;
}

/// Build a client for every API whose keys are configured.
pub fn configured_apis(settings: &Settings) -> Vec<Box<dyn SearchApi>> {
    let mut apis: Vec<Box<dyn SearchApi>> = Vec::new();

    if let Some(adzuna) = &settings.adzuna {
        match adzuna::AdzunaClient::new(adzuna.clone()) {
            Ok(client) => apis.push(Box::new(client)),
            Err(e) => tracing::warn!("Adzuna disabled: {e}"),
        }
    }
    if let Some(key) = &settings.jsearch_key {
        match jsearch::JSearchClient::new(key.clone()) {
            Ok(client) => apis.push(Box::new(client)),
            Err(e) => tracing::warn!("JSearch disabled: {e}"),
        }
    }

    apis
}
