//! Configuration loading and validation for openrelay.
//!
//! Loads configuration from a TOML file (conventionally
//! `~/.openrelay/config.toml`) with an environment variable override for
//! the API key. Validates all settings at load time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable consulted when no API key is configured in the file.
pub const API_KEY_ENV: &str = "OPENRELAY_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key. Falls back to `OPENRELAY_API_KEY` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the chat-completion endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model when a request names none.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Global ordered fallback model list.
    #[serde(default)]
    pub fallback_models: Vec<String>,

    /// Maximum tool-call depth per logical call.
    #[serde(default = "default_max_tool_call_depth")]
    pub max_tool_call_depth: u32,

    /// Whether tool calls within one turn run concurrently.
    #[serde(default = "default_true")]
    pub parallel_tool_calls: bool,

    /// Transport request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// History configuration.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Pricing configuration.
    #[serde(default)]
    pub pricing: PricingConfig,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_max_tool_call_depth() -> u32 {
    8
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            fallback_models: Vec::new(),
            max_tool_call_depth: default_max_tool_call_depth(),
            parallel_tool_calls: true,
            timeout_secs: default_timeout_secs(),
            history: HistoryConfig::default(),
            pricing: PricingConfig::default(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("fallback_models", &self.fallback_models)
            .field("max_tool_call_depth", &self.max_tool_call_depth)
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .field("timeout_secs", &self.timeout_secs)
            .field("history", &self.history)
            .field("pricing", &self.pricing)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Backend name: "in_memory" or "none".
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// Idle TTL before a conversation is evicted, in seconds. 0 = keep forever.
    #[serde(default)]
    pub ttl_secs: u64,
}

fn default_history_backend() -> String {
    "in_memory".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            ttl_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Price table refresh interval, in seconds. 0 = never refresh.
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_secs() -> u64 {
    3600
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_secs(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a TOML string, apply the env-var API key
    /// override, and validate.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let mut config: ClientConfig = toml::from_str(input)?;
        if config.api_key.is_none()
            && let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            debug!("Using API key from {API_KEY_ENV}");
            config.api_key = Some(key);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if self.default_model.is_empty() {
            return Err(ConfigError::Invalid("default_model must not be empty".into()));
        }
        if self.max_tool_call_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_tool_call_depth must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        match self.history.backend.as_str() {
            "in_memory" | "none" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown history backend '{other}'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_tool_call_depth, 8);
        assert!(config.parallel_tool_calls);
    }

    #[test]
    fn parse_minimal_toml() {
        let config = ClientConfig::from_toml(
            r#"
            api_key = "sk-test"
            default_model = "openai/gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.default_model, "openai/gpt-4o-mini");
        assert!(config.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn parse_full_toml() {
        let config = ClientConfig::from_toml(
            r#"
            api_key = "sk-test"
            base_url = "https://api.example.com/v1"
            default_model = "openai/gpt-4o"
            fallback_models = ["openai/gpt-4o-mini", "deepseek/deepseek-v3"]
            max_tool_call_depth = 4
            parallel_tool_calls = false
            timeout_secs = 30

            [history]
            backend = "in_memory"
            ttl_secs = 600

            [pricing]
            refresh_interval_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.fallback_models.len(), 2);
        assert_eq!(config.max_tool_call_depth, 4);
        assert!(!config.parallel_tool_calls);
        assert_eq!(config.history.ttl_secs, 600);
        assert_eq!(config.pricing.refresh_interval_secs, 120);
    }

    #[test]
    fn zero_depth_rejected() {
        let err = ClientConfig::from_toml("max_tool_call_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_history_backend_rejected() {
        let err = ClientConfig::from_toml(
            r#"
            [history]
            backend = "redis"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ClientConfig {
            api_key: Some("sk-very-secret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"sk-file\"").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
    }
}
