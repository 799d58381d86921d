//! Self-monitor panel: the backend's own footprint and latest deviation

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use crate::error::ClientError;
use crate::fence::RequestFence;
use crate::models::{Deviation, SelfMonitorReport};

/// Backend CPU above this is flagged
pub const CPU_WARNING_PERCENT: f64 = 15.0;
/// Backend memory above this is flagged
pub const MEMORY_WARNING_MB: f64 = 200.0;
/// Memory bar is full at this size
pub const MEMORY_SCALE_MB: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uptime {
    pub short: String,
    pub long: String,
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

pub fn format_uptime(seconds: f64) -> Uptime {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if total < 60 {
        Uptime {
            short: format!("{}s", secs),
            long: format!("{} seconds", secs),
        }
    } else if total < 3_600 {
        Uptime {
            short: format!("{}m {}s", minutes, secs),
            long: format!("{} minutes, {} seconds", minutes, secs),
        }
    } else if total < 86_400 {
        Uptime {
            short: format!("{}h {}m", hours, minutes),
            long: format!("{}, {}", plural(hours, "hour"), plural(minutes, "minute")),
        }
    } else {
        Uptime {
            short: format!("{}d {}h", days, hours),
            long: format!("{}, {}", plural(days, "day"), plural(hours, "hour")),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// `12s ago`, `5m ago`, `3h ago`; `None` for unparseable timestamps
pub fn time_ago(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let then = parse_timestamp(timestamp)?;
    let secs = (now - then).num_seconds().max(0);
    Some(if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3_600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3_600)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviationSummary {
    pub process_name: String,
    pub metric: String,
    pub level: DeviationLevel,
    /// `Last seen: 5m ago`, or `---` when the time is unknown
    pub last_seen: String,
}

impl DeviationSummary {
    /// The backend reports "no deviation" as null or as a `None` process name
    pub fn from_deviation(deviation: Option<&Deviation>, now: DateTime<Utc>) -> Option<Self> {
        let deviation = deviation.filter(|d| d.process_name != "None")?;
        let level = if deviation.severity.eq_ignore_ascii_case("critical") {
            DeviationLevel::Critical
        } else {
            DeviationLevel::Warning
        };
        let last_seen = time_ago(&deviation.timestamp, now)
            .map(|ago| format!("Last seen: {}", ago))
            .unwrap_or_else(|| "---".to_string());

        Some(Self {
            process_name: deviation.process_name.clone(),
            metric: deviation.metric.clone(),
            level,
            last_seen,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfMonitorPanel {
    pub cpu_percent: f64,
    pub cpu_warning: bool,
    pub cpu_bar: f64,
    pub memory_mb: f64,
    pub memory_warning: bool,
    pub memory_bar: f64,
    pub uptime: Uptime,
    pub deviation: Option<DeviationSummary>,
}

impl SelfMonitorPanel {
    pub fn from_report(report: &SelfMonitorReport, now: DateTime<Utc>) -> Self {
        Self {
            cpu_percent: report.cpu_percent,
            cpu_warning: report.cpu_percent > CPU_WARNING_PERCENT,
            cpu_bar: report.cpu_percent.min(100.0),
            memory_mb: report.memory_mb,
            memory_warning: report.memory_mb > MEMORY_WARNING_MB,
            memory_bar: (report.memory_mb / MEMORY_SCALE_MB * 100.0).min(100.0),
            uptime: format_uptime(report.uptime_seconds),
            deviation: DeviationSummary::from_deviation(report.last_deviation.as_ref(), now),
        }
    }
}

/// Latest panel plus the fence for its 5-second poll
#[derive(Debug, Default)]
pub struct SelfMonitor {
    panel: Option<SelfMonitorPanel>,
    fence: RequestFence,
}

impl SelfMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self) -> Option<&SelfMonitorPanel> {
        self.panel.as_ref()
    }

    pub fn begin(&mut self) -> u64 {
        self.fence.issue()
    }

    /// Failures keep the previous panel. Returns true when the panel changed.
    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<SelfMonitorReport, ClientError>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.fence.is_current(seq) {
            return false;
        }
        match result {
            Ok(report) => {
                self.panel = Some(SelfMonitorPanel::from_report(&report, now));
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to update self-monitor");
                false
            }
        }
    }
}
