//! Persisted settings commands

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use pulse_lib::{Settings, SettingsStore, ThresholdConfig};
use serde::Serialize;

use crate::output::{print_json, print_success, OutputFormat};

/// Changes requested by `settings set`; unset fields keep their value
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsUpdate {
    pub cpu_yellow: Option<f64>,
    pub cpu_red: Option<f64>,
    pub ram_yellow: Option<f64>,
    pub ram_red: Option<f64>,
    pub interval_secs: Option<u64>,
}

impl SettingsUpdate {
    pub fn apply(&self, current: Settings) -> Settings {
        let thresholds = ThresholdConfig {
            cpu_yellow: self.cpu_yellow.unwrap_or(current.thresholds.cpu_yellow),
            cpu_red: self.cpu_red.unwrap_or(current.thresholds.cpu_red),
            ram_yellow: self.ram_yellow.unwrap_or(current.thresholds.ram_yellow),
            ram_red: self.ram_red.unwrap_or(current.thresholds.ram_red),
        };
        match self.interval_secs {
            Some(secs) => Settings::from_dialog(thresholds, secs),
            None => Settings {
                thresholds,
                refresh_interval: current.refresh_interval,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    thresholds: ThresholdConfig,
    refresh_interval_secs: u64,
}

impl From<&Settings> for SettingsView {
    fn from(settings: &Settings) -> Self {
        Self {
            thresholds: settings.thresholds,
            refresh_interval_secs: settings.refresh_interval.as_secs(),
        }
    }
}

pub fn show_settings(store: &dyn SettingsStore, format: OutputFormat) -> Result<()> {
    print_settings(&Settings::load(store), format);
    Ok(())
}

pub fn set_settings(
    store: &mut dyn SettingsStore,
    update: SettingsUpdate,
    format: OutputFormat,
) -> Result<()> {
    let settings = update.apply(Settings::load(store));
    if !settings.is_valid() {
        anyhow::bail!("Thresholds must be numbers and the refresh interval at least 1 second");
    }
    settings.save(store).context("Failed to save settings")?;
    print_success("Settings saved");
    print_settings(&settings, format);
    Ok(())
}

pub fn reset_settings(store: &mut dyn SettingsStore, format: OutputFormat) -> Result<()> {
    let settings = Settings::reset(store).context("Failed to reset settings")?;
    print_success("Settings reset to defaults");
    print_settings(&settings, format);
    Ok(())
}

fn print_settings(settings: &Settings, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SettingsView::from(settings)),
        OutputFormat::Table => {
            let t = &settings.thresholds;
            println!("{}", "Dashboard Settings".bold());
            println!("{}", "=".repeat(40));
            println!(
                "CPU thresholds:     {} {}",
                format!("≥{}% caution", t.cpu_yellow).yellow(),
                format!("≥{}% critical", t.cpu_red).red()
            );
            println!(
                "RAM thresholds:     {} {}",
                format!("≥{}% caution", t.ram_yellow).yellow(),
                format!("≥{}% critical", t.ram_red).red()
            );
            println!(
                "Refresh interval:   {}",
                format_interval(settings.refresh_interval).cyan()
            );
        }
    }
}

fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{} seconds", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_lib::MemorySettingsStore;

    #[test]
    fn test_update_keeps_unset_fields() {
        let update = SettingsUpdate {
            cpu_red: Some(90.0),
            interval_secs: Some(15),
            ..SettingsUpdate::default()
        };
        let settings = update.apply(Settings::default());
        assert_eq!(settings.thresholds.cpu_red, 90.0);
        assert_eq!(settings.thresholds.cpu_yellow, 20.0);
        assert_eq!(settings.refresh_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_threshold_change_keeps_millisecond_interval() {
        let mut store = MemorySettingsStore::new().with("appRefreshInterval", "1500");
        let update = SettingsUpdate {
            cpu_yellow: Some(25.0),
            ..SettingsUpdate::default()
        };
        set_settings(&mut store, update, OutputFormat::Json).unwrap();

        let settings = Settings::load(&store);
        assert_eq!(settings.thresholds.cpu_yellow, 25.0);
        assert_eq!(settings.refresh_interval, Duration::from_millis(1500));
        assert_eq!(store.get("appRefreshInterval").as_deref(), Some("1500"));
    }

    #[test]
    fn test_set_rejects_zero_interval() {
        let mut store = MemorySettingsStore::new();
        let update = SettingsUpdate {
            interval_secs: Some(0),
            ..SettingsUpdate::default()
        };
        assert!(set_settings(&mut store, update, OutputFormat::Json).is_err());
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_set_then_reset() {
        let mut store = MemorySettingsStore::new();
        let update = SettingsUpdate {
            ram_yellow: Some(40.0),
            ..SettingsUpdate::default()
        };
        set_settings(&mut store, update, OutputFormat::Json).unwrap();
        assert_eq!(Settings::load(&store).thresholds.ram_yellow, 40.0);

        reset_settings(&mut store, OutputFormat::Json).unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }
}
