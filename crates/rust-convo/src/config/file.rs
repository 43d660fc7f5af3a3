//! File-based configuration loading.

use std::path::Path;

use super::RunConfig;
use crate::error::{ConvoError, Result};

impl RunConfig {
    /// Parse a configuration from TOML text.
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConvoError::config(e.to_string()))
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConvoError::Config { message } => {
                ConvoError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ConvoError::config(e.to_string()))
    }
}
