use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use clap::builder::BoolishValueParser;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AgentError;
use crate::pacing::Pacing;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobagent", about = "Paced job discovery and application agent")]
pub struct Config {
    /// Run one sweep, or repeat sweeps on an interval
    #[arg(value_enum, default_value_t = RunMode::Once)]
    pub mode: RunMode,

    /// Search preferences file
    #[arg(long = "config", env = "CONFIG_PATH", default_value = "config.json")]
    pub config_path: PathBuf,

    /// Plain-text resume used for outreach prompts
    #[arg(long = "resume", env = "RESUME_PATH")]
    pub resume_path: Option<PathBuf>,

    /// Directory holding the applied-jobs index and audit logs
    #[arg(long, env = "STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    #[arg(long, env = "NAUKRI_EMAIL", hide_env_values = true)]
    pub naukri_email: Option<String>,

    #[arg(long, env = "NAUKRI_PASSWORD", hide_env_values = true)]
    pub naukri_password: Option<String>,

    /// Generate recruiter messages and try to deliver them
    #[arg(long, env = "AI_MESSAGING", action = clap::ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "true")]
    pub ai_messaging: bool,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    #[arg(long, env = "ADZUNA_APP_ID", hide_env_values = true)]
    pub adzuna_app_id: Option<String>,

    #[arg(long, env = "ADZUNA_APP_KEY", hide_env_values = true)]
    pub adzuna_app_key: Option<String>,

    #[arg(long, env = "ADZUNA_COUNTRY", default_value = "in")]
    pub adzuna_country: String,

    #[arg(long, env = "JSEARCH_API_KEY", hide_env_values = true)]
    pub jsearch_api_key: Option<String>,

    /// Also reach recruiters through LinkedIn
    #[arg(long, env = "LINKEDIN_MESSAGING", action = clap::ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "false")]
    pub linkedin_messaging: bool,

    #[arg(long, env = "LINKEDIN_EMAIL", hide_env_values = true)]
    pub linkedin_email: Option<String>,

    #[arg(long, env = "LINKEDIN_PASSWORD", hide_env_values = true)]
    pub linkedin_password: Option<String>,

    /// Overrides `discovery` from the config file
    #[arg(long, env = "DISCOVERY_MODE", value_enum)]
    pub discovery: Option<DiscoveryMode>,

    /// Overrides `headless` from the config file
    #[arg(long, env = "HEADLESS", value_parser = BoolishValueParser::new())]
    pub headless: Option<bool>,

    /// Minutes to sleep between sweeps in loop mode
    #[arg(long, env = "AGENT_INTERVAL_MIN", default_value = "60")]
    pub interval_minutes: u64,

    /// Upper bound on a single page load
    #[arg(long, env = "PAGE_TIMEOUT_SECS", default_value = "20")]
    pub page_timeout_secs: u64,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Loop,
}

#[derive(clap::ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    #[default]
    Scrape,
    Api,
    Hybrid,
}

/// Contents of `config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub roles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_experience", deserialize_with = "string_or_number")]
    pub experience: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub discovery: Option<DiscoveryMode>,
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default = "default_pace_min")]
    pub apply_pacing_seconds_min: f64,
    #[serde(default = "default_pace_max")]
    pub apply_pacing_seconds_max: f64,
}

fn default_experience() -> String {
    "0".to_string()
}

fn default_pace_min() -> f64 {
    2.0
}

fn default_pace_max() -> f64 {
    4.0
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

impl SearchConfig {
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: SearchConfig = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Config(format!("malformed {}: {e}", path.display())))?;

        if config.roles.iter().all(|r| r.trim().is_empty()) {
            return Err(AgentError::Config("`roles` must name at least one role".into()));
        }
        if config.locations.iter().all(|l| l.trim().is_empty()) {
            return Err(AgentError::Config("`locations` must name at least one location".into()));
        }
        if config.apply_pacing_seconds_min < 0.0 || config.apply_pacing_seconds_max < 0.0 {
            return Err(AgentError::Config("pacing seconds cannot be negative".into()));
        }
        Ok(config)
    }
}

/// Merge precedence for settings with two sources: environment first, then
/// the config file, then the built-in default.
pub fn resolve<T>(env: Option<T>, file: Option<T>, default: T) -> T {
    env.or(file).unwrap_or(default)
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AdzunaSettings {
    pub app_id: String,
    pub app_key: String,
    pub country: String,
}

/// Validated, merged settings for a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub search: SearchConfig,
    pub discovery: DiscoveryMode,
    pub headless: bool,
    pub pacing: Pacing,
    pub interval: Duration,
    pub page_timeout: Duration,
    pub resume_path: PathBuf,
    pub state_dir: PathBuf,
    pub site: Credentials,
    /// None when the operator declined AI messaging.
    pub gemini: Option<GeminiSettings>,
    pub adzuna: Option<AdzunaSettings>,
    pub jsearch_key: Option<String>,
    /// Present only when LinkedIn messaging is opted in and configured.
    pub linkedin: Option<Credentials>,
}

impl Settings {
    pub fn messaging_enabled(&self) -> bool {
        self.gemini.is_some()
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl Config {
    /// Validate everything a run needs before any session is opened.
    pub fn settings(&self) -> Result<Settings, AgentError> {
        let resume_path = self
            .resume_path
            .clone()
            .ok_or_else(|| AgentError::Config("RESUME_PATH is not set".into()))?;
        if !resume_path.is_file() {
            return Err(AgentError::Config(format!(
                "resume not found at {}",
                resume_path.display()
            )));
        }

        let site = match (present(&self.naukri_email), present(&self.naukri_password)) {
            (Some(username), Some(password)) => Credentials { username, password },
            _ => {
                return Err(AgentError::Config(
                    "NAUKRI_EMAIL and NAUKRI_PASSWORD must be set".into(),
                ));
            }
        };

        let gemini = if self.ai_messaging {
            let api_key = present(&self.gemini_api_key).ok_or_else(|| {
                AgentError::Config("GEMINI_API_KEY is required when AI_MESSAGING is on".into())
            })?;
            Some(GeminiSettings {
                api_key,
                model: self.gemini_model.clone(),
            })
        } else {
            None
        };

        let search = SearchConfig::load(&self.config_path)?;

        let adzuna = match (present(&self.adzuna_app_id), present(&self.adzuna_app_key)) {
            (Some(app_id), Some(app_key)) => Some(AdzunaSettings {
                app_id,
                app_key,
                country: self.adzuna_country.to_lowercase(),
            }),
            _ => None,
        };

        let linkedin = if self.linkedin_messaging && gemini.is_some() {
            match (present(&self.linkedin_email), present(&self.linkedin_password)) {
                (Some(username), Some(password)) => Some(Credentials { username, password }),
                _ => {
                    tracing::warn!("LINKEDIN_MESSAGING is on but LinkedIn credentials are missing");
                    None
                }
            }
        } else {
            None
        };

        Ok(Settings {
            discovery: resolve(self.discovery, search.discovery, DiscoveryMode::default()),
            headless: resolve(self.headless, search.headless, false),
            pacing: Pacing::new(search.apply_pacing_seconds_min, search.apply_pacing_seconds_max),
            interval: Duration::from_secs(self.interval_minutes.saturating_mul(60)),
            page_timeout: Duration::from_secs(self.page_timeout_secs.max(1)),
            resume_path,
            state_dir: self.state_dir.clone(),
            site,
            gemini,
            adzuna,
            jsearch_key: present(&self.jsearch_api_key),
            linkedin,
            search,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(config_json: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("config.json"), config_json).unwrap();
            std::fs::write(dir.path().join("resume.txt"), "Built X, cut latency 40%").unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).display().to_string()
        }

        fn args(&self, extra: &[&str]) -> Vec<String> {
            let mut args = vec![
                "jobagent".to_string(),
                "--config".to_string(),
                self.path("config.json"),
                "--resume".to_string(),
                self.path("resume.txt"),
                "--naukri-email".to_string(),
                "me@example.com".to_string(),
                "--naukri-password".to_string(),
                "secret".to_string(),
                "--gemini-api-key".to_string(),
                "g-key".to_string(),
            ];
            args.extend(extra.iter().map(|s| s.to_string()));
            args
        }
    }

    const BASIC: &str = r#"{"roles": ["Data Scientist"], "locations": ["Bangalore"], "experience": 2,
        "keywords": ["pytorch"], "discovery": "hybrid", "headless": true,
        "apply_pacing_seconds_min": 5, "apply_pacing_seconds_max": 1}"#;

    #[test]
    fn resolve_prefers_env_then_file_then_default() {
        assert_eq!(resolve(Some(1), Some(2), 3), 1);
        assert_eq!(resolve(None, Some(2), 3), 2);
        assert_eq!(resolve(None::<i32>, None, 3), 3);
    }

    #[test]
    fn file_values_fill_in_when_env_is_silent() {
        let fx = Fixture::new(BASIC);
        let config = Config::try_parse_from(fx.args(&[])).unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.discovery, DiscoveryMode::Hybrid);
        assert!(settings.headless);
        assert_eq!(settings.search.experience, "2");
        assert_eq!((settings.pacing.min_secs(), settings.pacing.max_secs()), (1.0, 5.0));
        assert!(settings.messaging_enabled());
        assert!(settings.adzuna.is_none());
        assert_eq!(config.mode, RunMode::Once);
    }

    #[test]
    fn cli_overrides_file() {
        let fx = Fixture::new(BASIC);
        let config = Config::try_parse_from(fx.args(&["--discovery", "api", "--headless", "0", "loop"])).unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.discovery, DiscoveryMode::Api);
        assert!(!settings.headless);
        assert_eq!(config.mode, RunMode::Loop);
    }

    #[test]
    fn missing_resume_is_fatal() {
        let fx = Fixture::new(BASIC);
        let mut args = fx.args(&[]);
        let pos = args.iter().position(|a| a == "--resume").unwrap();
        args[pos + 1] = fx.path("nope.txt");
        let err = Config::try_parse_from(args).unwrap().settings().unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn gemini_key_only_needed_with_ai_messaging() {
        let fx = Fixture::new(BASIC);
        let mut args = fx.args(&["--ai-messaging", "false"]);
        let pos = args.iter().position(|a| a == "--gemini-api-key").unwrap();
        args[pos + 1] = "  ".to_string();
        let settings = Config::try_parse_from(args.clone()).unwrap().settings().unwrap();
        assert!(!settings.messaging_enabled());

        let idx = args.iter().position(|a| a == "--ai-messaging").unwrap();
        args[idx + 1] = "true".to_string();
        assert!(Config::try_parse_from(args).unwrap().settings().is_err());
    }

    #[test]
    fn malformed_or_empty_config_is_rejected() {
        let fx = Fixture::new(r#"{"roles": [], "locations": ["Pune"]}"#);
        assert!(matches!(
            Config::try_parse_from(fx.args(&[])).unwrap().settings(),
            Err(AgentError::Config(_))
        ));

        let fx = Fixture::new("{roles:");
        assert!(matches!(
            Config::try_parse_from(fx.args(&[])).unwrap().settings(),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "u".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
