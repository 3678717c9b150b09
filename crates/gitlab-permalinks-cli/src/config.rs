// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Waddle Social

//! Configuration for the `glpermalinks` command.
//!
//! Loaded from `~/.config/gitlab-permalinks/config.toml` unless `--config`
//! names another file:
//!
//! ```toml
//! [gitlab]
//! base_url = "https://gitlab.example.com"
//! token = "glpat-..."
//!
//! [preview]
//! max_replacements = 10
//! fetch_timeout_secs = 5
//! max_preview_lines = 10
//! line_context = 3
//! fetch_concurrency = 1
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! `GITLAB_URL` and `GITLAB_TOKEN` override the `[gitlab]` section.

use gitlab_permalinks::{GitLabConfig, PermalinkConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogFormat;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid TOML in {path}: {source}")]
    InvalidToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gitlab: GitLabConfig,
    pub preview: PermalinkConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration, then apply environment overrides.
    ///
    /// An explicitly named file must exist; a missing default file means
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.gitlab = config.gitlab.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|source| ConfigError::InvalidToml {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `$XDG_CONFIG_HOME/gitlab-permalinks/config.toml` or platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gitlab-permalinks").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };

        if self.preview.fetch_timeout == Duration::ZERO {
            return Err(invalid("preview.fetch_timeout_secs", "must be at least 1"));
        }
        if self.preview.fetch_concurrency == 0 {
            return Err(invalid("preview.fetch_concurrency", "must be at least 1"));
        }
        if self.gitlab.base_url.trim().is_empty() {
            return Err(invalid("gitlab.base_url", "must not be empty"));
        }
        Ok(())
    }
}
