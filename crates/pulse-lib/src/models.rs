//! Wire models for the monitoring backend
//!
//! Each endpoint response has an explicit schema. Bodies are decoded and
//! validated at the client boundary so nothing downstream ever sees a
//! missing or nonsensical field.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Largest page size accepted from the dashboard endpoint
pub const MAX_ITEMS_PER_PAGE: usize = 1000;

/// One process's metrics at poll time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    #[serde(rename = "cpu", alias = "cpu_percent")]
    pub cpu_percent: f64,
    #[serde(rename = "memory", alias = "memory_mb")]
    pub memory_mb: f64,
    #[serde(rename = "incoming", alias = "incoming_connections", default)]
    pub incoming_connections: u32,
    #[serde(rename = "outgoing", alias = "outgoing_connections", default)]
    pub outgoing_connections: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// `/api/dashboard` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardPage {
    pub items: Vec<ProcessEntry>,
    pub page: u32,
    pub items_per_page: usize,
    pub total_items: usize,
}

/// Entry of the `/api/all-apps` catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub display_name: String,
    pub exe_name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

/// `/api/all-apps` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppCatalog(pub Vec<AppInfo>);

/// Most recent threshold deviation observed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub process_name: String,
    pub metric: String,
    pub severity: String,
    pub timestamp: String,
}

/// `/api/self-monitor` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfMonitorReport {
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub uptime_seconds: f64,
    #[serde(default)]
    pub last_deviation: Option<Deviation>,
}

/// `/api/snapshot` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub processes: Vec<ProcessEntry>,
    pub total: usize,
    pub filtered: usize,
}

/// Lightweight searchable process reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub pid: u32,
    pub name: String,
}

/// `/api/process-search` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSearchResponse {
    pub processes: Vec<SearchEntry>,
}

/// `/api/process-details/{pid}` response
///
/// Only `found` is guaranteed; everything else is backend-defined and kept
/// as loosely typed fields for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetails {
    pub found: bool,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ProcessDetails {
    /// Process name, when the backend included one
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(|v| v.as_str())
    }
}

/// A schema violation found after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A typed endpoint response
pub trait Schema: DeserializeOwned {
    /// Endpoint path, for error reporting
    const ENDPOINT: &'static str;

    /// Check invariants serde cannot express
    fn validate(&self) -> Result<(), FieldViolation> {
        Ok(())
    }
}

fn check_metric(field: String, value: f64) -> Result<(), FieldViolation> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FieldViolation::new(
            field,
            "must be a finite, non-negative number",
        ))
    }
}

fn check_entries(prefix: &str, entries: &[ProcessEntry]) -> Result<(), FieldViolation> {
    for (i, entry) in entries.iter().enumerate() {
        check_metric(format!("{prefix}[{i}].cpu"), entry.cpu_percent)?;
        check_metric(format!("{prefix}[{i}].memory"), entry.memory_mb)?;
    }
    Ok(())
}

impl Schema for DashboardPage {
    const ENDPOINT: &'static str = "/api/dashboard";

    fn validate(&self) -> Result<(), FieldViolation> {
        if self.page == 0 {
            return Err(FieldViolation::new("page", "pages are numbered from 1"));
        }
        if self.items_per_page == 0 || self.items_per_page > MAX_ITEMS_PER_PAGE {
            return Err(FieldViolation::new(
                "items_per_page",
                format!("must be between 1 and {}", MAX_ITEMS_PER_PAGE),
            ));
        }
        if self.items.len() > self.items_per_page {
            return Err(FieldViolation::new(
                "items",
                format!(
                    "{} items exceed the page size of {}",
                    self.items.len(),
                    self.items_per_page
                ),
            ));
        }
        check_entries("items", &self.items)
    }
}

impl Schema for AppCatalog {
    const ENDPOINT: &'static str = "/api/all-apps";
}

impl Schema for SelfMonitorReport {
    const ENDPOINT: &'static str = "/api/self-monitor";

    fn validate(&self) -> Result<(), FieldViolation> {
        check_metric("cpu_percent".to_string(), self.cpu_percent)?;
        check_metric("memory_mb".to_string(), self.memory_mb)?;
        check_metric("uptime_seconds".to_string(), self.uptime_seconds)
    }
}

impl Schema for SnapshotResponse {
    const ENDPOINT: &'static str = "/api/snapshot";

    fn validate(&self) -> Result<(), FieldViolation> {
        check_entries("processes", &self.processes)
    }
}

impl Schema for ProcessSearchResponse {
    const ENDPOINT: &'static str = "/api/process-search";
}

impl Schema for ProcessDetails {
    const ENDPOINT: &'static str = "/api/process-details";
}
