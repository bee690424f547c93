mod auth;
mod logging;
mod reconnect;
mod stream;

pub use auth::*;
pub use logging::*;
pub use reconnect::*;
pub use stream::*;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a TOML file.  Missing sections and fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Render the resolved configuration (defaults filled in) as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut error = |field: &str, message: &str| {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: field.into(),
                message: message.into(),
            })
        };

        if self.stream.endpoint.trim().is_empty() {
            error("stream.endpoint", "endpoint must not be empty");
        }
        if self.stream.buffer_size == 0 {
            error("stream.buffer_size", "buffer_size must be at least 1");
        }

        let rc = &self.reconnect;
        if !(rc.backoff_multiplier > 1.0) {
            error("reconnect.backoff_multiplier", "backoff_multiplier must be greater than 1.0");
        }
        if !(0.0..=1.0).contains(&rc.jitter_factor) {
            error("reconnect.jitter_factor", "jitter_factor must be between 0.0 and 1.0");
        }
        if rc.initial_delay_ms > rc.max_delay_ms {
            error("reconnect.initial_delay_ms", "initial_delay_ms must not exceed max_delay_ms");
        }

        if !rc.enabled && (rc.max_retries > 0 || rc.max_elapsed_ms > 0) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "reconnect.enabled".into(),
                message: "retry limits are set but reconnection is disabled".into(),
            });
        }
        if self.auth.api_key.is_some() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "auth.api_key".into(),
                message: "plaintext API key in config; prefer api_key_env".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(issues: &[ConfigError], field: &str) -> bool {
        issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == field)
    }

    #[test]
    fn default_config_is_valid() {
        let issues = Config::default().validate();
        assert!(issues.iter().all(|i| i.severity != ConfigSeverity::Error));
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let mut config = Config::default();
        config.stream.buffer_size = 0;
        assert!(has_error(&config.validate(), "stream.buffer_size"));
    }

    #[test]
    fn multiplier_must_exceed_one() {
        let mut config = Config::default();
        config.reconnect.backoff_multiplier = 1.0;
        assert!(has_error(&config.validate(), "reconnect.backoff_multiplier"));
    }

    #[test]
    fn jitter_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.reconnect.jitter_factor = 1.5;
        assert!(has_error(&config.validate(), "reconnect.jitter_factor"));
    }

    #[test]
    fn plaintext_key_only_warns() {
        let mut config = Config::default();
        config.auth.api_key = Some("sk-test".into());
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Warning && i.field == "auth.api_key"));
        assert!(!has_error(&issues, "auth.api_key"));
    }

    #[test]
    fn display_tags_severity() {
        let issue = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "x".into(),
            message: "y".into(),
        };
        assert_eq!(issue.to_string(), "[WARN] x: y");
    }

    #[test]
    fn to_toml_round_trips_defaults() {
        let rendered = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.stream.buffer_size, 100);
        assert_eq!(parsed.reconnect.initial_delay_ms, 250);
    }
}
