//! Severity classification against yellow/red cutoffs

use serde::{Deserialize, Serialize};

use crate::models::ProcessEntry;

/// Three-level severity of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Caution,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Healthy => "HEALTHY",
            Severity::Caution => "CAUTION",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify `value` against a yellow and a red cutoff.
///
/// Red wins over yellow, so degenerate configs where `yellow > red` still
/// produce a deterministic answer. NaN fails both comparisons and is healthy.
pub fn classify(value: f64, yellow: f64, red: f64) -> Severity {
    if value >= red {
        Severity::Critical
    } else if value >= yellow {
        Severity::Caution
    } else {
        Severity::Healthy
    }
}

/// User-tunable cutoffs for CPU and RAM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub cpu_yellow: f64,
    pub cpu_red: f64,
    pub ram_yellow: f64,
    pub ram_red: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_yellow: 20.0,
            cpu_red: 70.0,
            ram_yellow: 50.0,
            ram_red: 80.0,
        }
    }
}

impl ThresholdConfig {
    /// All four cutoffs are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.cpu_yellow, self.cpu_red, self.ram_yellow, self.ram_red]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn cpu(&self, cpu_percent: f64) -> Severity {
        classify(cpu_percent, self.cpu_yellow, self.cpu_red)
    }

    pub fn ram(&self, memory_mb: f64) -> Severity {
        classify(ram_percent(memory_mb), self.ram_yellow, self.ram_red)
    }

    /// Classify both metrics of an entry
    pub fn assess(&self, entry: &ProcessEntry) -> EntryHealth {
        EntryHealth {
            cpu: self.cpu(entry.cpu_percent),
            ram: self.ram(entry.memory_mb),
            cpu_bar: cpu_bar_percent(entry.cpu_percent),
            ram_bar: ram_percent(entry.memory_mb),
        }
    }
}

/// Per-entry classification used by renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryHealth {
    pub cpu: Severity,
    pub ram: Severity,
    /// Bar fill, 0..=100
    pub cpu_bar: f64,
    /// Bar fill, 0..=100
    pub ram_bar: f64,
}

impl EntryHealth {
    pub fn worst(&self) -> Severity {
        self.cpu.max(self.ram)
    }
}

/// RAM is scored on a 1 GB scale: 10 MB per percent, capped at 100.
pub fn ram_percent(memory_mb: f64) -> f64 {
    (memory_mb / 10.0).min(100.0)
}

/// CPU bars are stretched 4x so light load is still visible.
pub fn cpu_bar_percent(cpu_percent: f64) -> f64 {
    (cpu_percent * 4.0).min(100.0)
}

/// Format megabytes as `1.5GB` above 1024 MB, else rounded `512MB`
pub fn format_memory(memory_mb: f64) -> String {
    if memory_mb > 1024.0 {
        format!("{:.1}GB", memory_mb / 1024.0)
    } else {
        format!("{}MB", memory_mb.round() as i64)
    }
}
