//! Environment-based configuration.

use std::collections::HashMap;

use super::{LogFormat, MatchingMode, RunConfig};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "CONVO";

/// Common environment variables (without prefix).
pub mod vars {
    /// Matching mode (`literal` or `regexp`).
    pub const MATCHING_MODE: &str = "MATCHING_MODE";
    /// Scripting memory toggle.
    pub const SCRIPTING_MEMORY: &str = "SCRIPTING_MEMORY";
    /// Container reply timeout in milliseconds.
    pub const WAIT_REPLY_MS: &str = "WAIT_REPLY_MS";
    /// Log filter directive.
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log format (`text` or `json`).
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Environment variable reader.
///
/// Values are read from the process environment, or from an explicit map
/// when constructed with [`EnvConfig::from_map`].
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Explicit values replacing the process environment.
    overrides: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: None,
        }
    }

    /// Create a reader over an explicit map of full variable names.
    #[must_use]
    pub fn from_map<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            overrides: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.overrides {
            Some(map) => map.get(&var_name).cloned(),
            None => std::env::var(&var_name).ok(),
        }
    }

    /// Get a parsed value.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "enabled" => Some(true),
            "0" | "false" | "no" | "off" | "disabled" => Some(false),
            _ => None,
        })
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl RunConfig {
    /// Overlay values found in the environment onto this configuration.
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn apply_env(mut self, env: &EnvConfig) -> Self {
        if let Some(raw) = env.get(vars::MATCHING_MODE) {
            match MatchingMode::from_name(&raw) {
                Some(mode) => self.matching_mode = mode,
                None => tracing::warn!(value = %raw, "ignoring unknown matching mode"),
            }
        }

        if env.is_set(vars::SCRIPTING_MEMORY) {
            match env.bool(vars::SCRIPTING_MEMORY) {
                Some(enabled) => self.scripting_memory = enabled,
                None => tracing::warn!("ignoring unparsable scripting memory toggle"),
            }
        }

        if env.is_set(vars::WAIT_REPLY_MS) {
            match env.parse::<u64>(vars::WAIT_REPLY_MS) {
                Some(ms) => self.timeout.wait_reply_ms = Some(ms),
                None => tracing::warn!("ignoring unparsable reply timeout"),
            }
        }

        if let Some(level) = env.get(vars::LOG_LEVEL) {
            self.logging.level = level;
        }

        if let Some(raw) = env.get(vars::LOG_FORMAT) {
            match LogFormat::from_name(&raw) {
                Some(format) => self.logging.format = format,
                None => tracing::warn!(value = %raw, "ignoring unknown log format"),
            }
        }

        self
    }

    /// Build a configuration from defaults overlaid with the `CONVO_*` environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env(&EnvConfig::default())
    }
}
