//! Configuration (layered: code > env > .env file).

use std::time::Duration;

use bon::Builder;

use crate::error::{Result, RivuletError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_INSTRUCTION: &str = "You are a helpful assistant.";

/// Deployment configuration for the orchestration engine.
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Upstream completion endpoint.
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    /// Upstream access credential. Required to serve requests.
    #[builder(into)]
    pub api_key: Option<String>,
    /// Model used when a request names none.
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub default_model: String,
    /// Instruction text seeding every new session.
    #[builder(into, default = DEFAULT_INSTRUCTION.to_string())]
    pub instruction: String,
    /// Maximum retained non-instruction messages per session.
    #[builder(default = 10)]
    pub max_messages: usize,
    /// Sessions idle beyond this duration are swept.
    #[builder(default = Duration::from_secs(1800))]
    pub idle_expiry: Duration,
    /// Interval of the background expiry sweep.
    #[builder(default = Duration::from_secs(60))]
    pub sweep_interval: Duration,
    #[builder(default)]
    pub progressive: ProgressiveConfig,
    #[builder(default)]
    pub retrieval: RetrievalConfig,
}

/// Secondary-model preamble settings.
#[derive(Debug, Clone)]
pub struct ProgressiveConfig {
    pub enabled: bool,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 64,
            temperature: 0.7,
        }
    }
}

/// Retrieval-augmentation settings.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub threshold: f32,
    pub max_documents: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.75,
            max_documents: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Load from environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            base_url: env_string("RIVULET_BASE_URL", DEFAULT_BASE_URL),
            api_key: std::env::var("RIVULET_API_KEY").ok(),
            default_model: env_string("RIVULET_MODEL", DEFAULT_MODEL),
            instruction: env_string("RIVULET_INSTRUCTION", DEFAULT_INSTRUCTION),
            max_messages: env_parsed("RIVULET_MAX_MESSAGES", 10),
            idle_expiry: Duration::from_secs(env_parsed("RIVULET_SESSION_TTL_SECS", 1800)),
            sweep_interval: Duration::from_secs(env_parsed("RIVULET_SWEEP_INTERVAL_SECS", 60)),
            progressive: ProgressiveConfig {
                enabled: env_parsed("RIVULET_PREAMBLE_ENABLED", false),
                model: env_string("RIVULET_PREAMBLE_MODEL", DEFAULT_MODEL),
                max_tokens: env_parsed("RIVULET_PREAMBLE_MAX_TOKENS", 64),
                temperature: env_parsed("RIVULET_PREAMBLE_TEMPERATURE", 0.7),
            },
            retrieval: RetrievalConfig {
                enabled: env_parsed("RIVULET_RETRIEVAL_ENABLED", false),
                threshold: env_parsed("RIVULET_RETRIEVAL_THRESHOLD", 0.75),
                max_documents: env_parsed("RIVULET_RETRIEVAL_MAX_DOCS", 3),
            },
        }
    }

    /// Check startup requirements. A missing credential is fatal: the
    /// process must not serve requests without one.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(RivuletError::Configuration(
                "missing RIVULET_API_KEY".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_sane() {
        let config = Config::builder().build();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_messages, 10);
        assert_eq!(config.idle_expiry, Duration::from_secs(1800));
        assert!(!config.progressive.enabled);
        assert!(!config.retrieval.enabled);
    }

    #[test]
    fn validate_rejects_missing_credential() {
        let config = Config::builder().build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_credential() {
        let config = Config::builder().api_key("").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_present_credential() {
        let config = Config::builder().api_key("sk-test").build();
        assert!(config.validate().is_ok());
    }
}
