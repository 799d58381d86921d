//! Persisted dashboard settings
//!
//! Thresholds and the refresh interval live in a key-value store so they
//! survive restarts. Stored values are validated on load; anything corrupt
//! falls back to defaults instead of producing broken comparisons or a
//! zero-length timer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, warn};

use crate::error::SettingsError;
use crate::threshold::ThresholdConfig;

pub const THRESHOLDS_KEY: &str = "appThresholds";
pub const REFRESH_INTERVAL_KEY: &str = "appRefreshInterval";

/// Default dashboard refresh interval (30 seconds)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Key-value store with get/set semantics
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Volatile store, mainly for tests
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object file holding string values, rewritten on every set
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSettingsStore {
    /// Open a store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt settings file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read settings file");
                BTreeMap::new()
            }
        };

        Self { path, values }
    }

    /// Default location: `~/.config/pulse/settings.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("pulse").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content).map_err(io_err)
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Session-wide settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub thresholds: ThresholdConfig,
    pub refresh_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl Settings {
    /// Read both keys, falling back to defaults per key on bad data
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mut settings = Settings::default();

        if let Some(raw) = store.get(THRESHOLDS_KEY) {
            match serde_json::from_str::<ThresholdConfig>(&raw) {
                Ok(thresholds) if thresholds.is_finite() => settings.thresholds = thresholds,
                Ok(_) => warn!(key = THRESHOLDS_KEY, "Stored thresholds are not finite, using defaults"),
                Err(e) => warn!(key = THRESHOLDS_KEY, error = %e, "Stored thresholds are malformed, using defaults"),
            }
        }

        if let Some(raw) = store.get(REFRESH_INTERVAL_KEY) {
            match parse_interval_ms(&raw) {
                Some(interval) => settings.refresh_interval = interval,
                None => warn!(
                    key = REFRESH_INTERVAL_KEY,
                    value = %raw,
                    "Stored refresh interval is invalid, using default"
                ),
            }
        }

        debug!(
            refresh_interval_ms = settings.refresh_interval.as_millis() as u64,
            "Settings loaded"
        );
        settings
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        let thresholds = serde_json::to_string(&self.thresholds)?;
        store.set(THRESHOLDS_KEY, &thresholds)?;
        store.set(
            REFRESH_INTERVAL_KEY,
            &self.refresh_interval.as_millis().to_string(),
        )
    }

    /// Restore defaults and persist them
    pub fn reset(store: &mut dyn SettingsStore) -> Result<Self, SettingsError> {
        let settings = Settings::default();
        settings.save(store)?;
        Ok(settings)
    }

    /// Build from a dialog where the interval is entered in whole seconds
    pub fn from_dialog(thresholds: ThresholdConfig, interval_secs: u64) -> Self {
        Self {
            thresholds,
            refresh_interval: Duration::from_secs(interval_secs),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.thresholds.is_finite() && !self.refresh_interval.is_zero()
    }
}

fn parse_interval_ms(raw: &str) -> Option<Duration> {
    let ms: u64 = raw.trim().parse().ok()?;
    (ms > 0).then(|| Duration::from_millis(ms))
}
