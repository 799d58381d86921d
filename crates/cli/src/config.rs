//! Configuration management for the CLI

use anyhow::{Context, Result};
use pulse_lib::FileSettingsStore;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Log line format on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Settings read from `PULSE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct PulseConfig {
    /// Monitoring backend base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Settings file; defaults to the user config directory
    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            settings_file: None,
            log_format: LogFormat::default(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PULSE").try_parsing(true))
            .build()
            .context("Failed to read PULSE_* environment")?;

        config
            .try_deserialize()
            .context("Invalid PULSE_* configuration")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_file {
            Some(path) => Ok(path.clone()),
            None => FileSettingsStore::default_path(),
        }
    }

    pub fn settings_store(&self) -> Result<FileSettingsStore> {
        Ok(FileSettingsStore::open(self.settings_path()?))
    }
}
