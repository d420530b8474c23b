use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiSettings;
use crate::error::AgentError;

/// Upper bound on any outreach message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 900;
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Text generation backend.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

pub struct GeminiClient {
    settings: GeminiSettings,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder().timeout(GENERATION_TIMEOUT).build()?;
        Ok(Self {
            settings,
            base_url: GEMINI_BASE_URL.to_string(),
            client,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl MessageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.settings.model);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.settings.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Generation(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(AgentError::Generation(format!("Gemini returned {status}: {detail}")));
        }

        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Generation(format!("malformed response: {e}")))?;
        Ok(response_text(data))
    }
}

fn response_text(data: GenerateResponse) -> String {
    data.candidates
        .into_iter()
        .filter_map(|c| c.content)
        .next()
        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
        .unwrap_or_default()
}

/// Everything the message is about.
#[derive(Debug, Clone, Copy)]
pub struct Pitch<'a> {
    pub resume: &'a str,
    pub recruiter_name: &'a str,
    pub role_hint: &'a str,
    pub job_link: &'a str,
    pub company: &'a str,
}

pub fn build_prompt(pitch: &Pitch<'_>) -> String {
    let company = if pitch.company.trim().is_empty() {
        "the hiring company"
    } else {
        pitch.company.trim()
    };
    format!(
        "You are a concise, professional job applicant.\n\
         Write an 80-130 word recruiter message to {name} about a role like \"{role}\" at {company}.\n\
         Use 1-2 resume achievements with metrics and end with a polite call to action.\n\
         Reply with the message text only.\n\
         Job: {link}\n\
         Resume:\n{resume}\n",
        name = pitch.recruiter_name,
        role = pitch.role_hint,
        link = pitch.job_link,
        resume = pitch.resume.trim(),
    )
}

pub fn fallback_message(recruiter_name: &str, role_hint: &str) -> String {
    format!(
        "Hi {recruiter_name}, I noticed the opening for {role_hint} and have just applied. \
         My background lines up closely with the role and I would love to connect. Thanks!"
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Writes outreach messages. Never fails: any generation problem falls back
/// to a fixed template.
pub struct Composer {
    generator: Box<dyn MessageGenerator>,
    timeout: Duration,
}

impl Composer {
    pub fn new(generator: Box<dyn MessageGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn compose(&self, pitch: &Pitch<'_>) -> String {
        let prompt = build_prompt(pitch);
        let generated = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                tracing::warn!("Generator returned an empty message, using the template");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("Generation failed, using the template: {e}");
                None
            }
            Err(_) => {
                tracing::warn!("Generation timed out after {:?}, using the template", self.timeout);
                None
            }
        };

        let message = generated
            .map(|text| text.trim().to_string())
            .unwrap_or_else(|| fallback_message(pitch.recruiter_name, pitch.role_hint));
        truncate_chars(&message, MAX_MESSAGE_CHARS)
    }
}
