#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Message generation failed: {0}")]
    Generation(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Job processing failed: {0}")]
    JobProcessing(String),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AgentError {
    /// Only configuration problems and a repeated login failure stop a run.
    /// Everything else is absorbed by the stage that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Config(_) | AgentError::Authentication(_))
    }

    /// Map a transport error to the taxonomy: timeouts degrade, the rest stay HTTP errors.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::NavigationTimeout(url.to_string())
        } else {
            AgentError::Http(err.without_url())
        }
    }
}

/// Request URLs can carry API keys as query parameters, so they never reach
/// the error text.
impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Http(err.without_url())
    }
}
