//! Configuration types for rust-convo.
//!
//! This module defines the run configuration: matching mode, the
//! scripting-memory toggle, the container's reply timeout and logging.

pub mod env;
pub mod file;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use env::EnvConfig;

/// Default log level when neither `RUST_LOG` nor a configured level is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// How expected text is turned into a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    /// Regex metacharacters in expected text are escaped; the whole reply must match.
    #[default]
    Literal,
    /// Expected text is used verbatim as a regular expression.
    Regexp,
}

impl MatchingMode {
    /// Parse a matching mode name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "literal" => Some(Self::Literal),
            "regexp" | "regex" => Some(Self::Regexp),
            _ => None,
        }
    }

    /// Check if this mode uses expected text verbatim.
    #[must_use]
    pub const fn is_regexp(&self) -> bool {
        matches!(self, Self::Regexp)
    }
}

/// Configuration for a conversation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// How expected text is matched.
    pub matching_mode: MatchingMode,

    /// Whether scripting-memory substitution and extraction are enabled.
    pub scripting_memory: bool,

    /// Timeout configuration.
    pub timeout: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            matching_mode: MatchingMode::default(),
            scripting_memory: true,
            timeout: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Create a new run configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the matching mode.
    #[must_use]
    pub const fn matching_mode(mut self, mode: MatchingMode) -> Self {
        self.matching_mode = mode;
        self
    }

    /// Enable or disable scripting memory.
    #[must_use]
    pub const fn scripting_memory(mut self, enabled: bool) -> Self {
        self.scripting_memory = enabled;
        self
    }

    /// Set the container's reply timeout.
    #[must_use]
    pub const fn wait_reply(mut self, timeout: Duration) -> Self {
        self.timeout.wait_reply_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Configuration for timeouts.
///
/// The runner itself never times out; these values are consumed by the
/// container while it waits for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long the container waits for a bot reply, in milliseconds.
    pub wait_reply_ms: Option<u64>,
}

impl TimeoutConfig {
    /// Get the reply timeout as a duration.
    #[must_use]
    pub const fn wait_reply(&self) -> Option<Duration> {
        match self.wait_reply_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse a log format name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,

    /// Log format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directive.
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the log format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.matching_mode, MatchingMode::Literal);
        assert!(config.scripting_memory);
        assert_eq!(config.timeout.wait_reply(), None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn run_config_builder() {
        let config = RunConfig::new()
            .matching_mode(MatchingMode::Regexp)
            .scripting_memory(false)
            .wait_reply(Duration::from_secs(5));

        assert!(config.matching_mode.is_regexp());
        assert!(!config.scripting_memory);
        assert_eq!(config.timeout.wait_reply(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn matching_mode_names() {
        assert_eq!(MatchingMode::from_name("REGEXP"), Some(MatchingMode::Regexp));
        assert_eq!(MatchingMode::from_name("literal"), Some(MatchingMode::Literal));
        assert_eq!(MatchingMode::from_name("wildcard"), None);
    }

    #[test]
    fn log_format_names() {
        assert_eq!(LogFormat::from_name("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::from_name("pretty"), Some(LogFormat::Text));
        assert_eq!(LogFormat::from_name("xml"), None);
    }
}
