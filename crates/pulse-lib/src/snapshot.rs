//! Snapshot table: filtered, client-side sorted process listing
//!
//! Filter and sort are independent axes. A new filter result is re-sorted
//! with whatever sort the user picked last, and sorting never refetches.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClientError, ExportError};
use crate::fence::RequestFence;
use crate::models::{ProcessEntry, SnapshotResponse};

/// Header of the exported CSV, one column per sortable field
pub const CSV_HEADER: [&str; 6] = [
    "Process Name",
    "CPU %",
    "Memory MB",
    "Incoming Connections",
    "Outgoing Connections",
    "PID",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Cpu,
    Memory,
    Incoming,
    Outgoing,
    Pid,
}

impl SortKey {
    /// Names read naturally A-Z; numbers are scanned for the largest outliers
    pub fn default_order(&self) -> SortOrder {
        match self {
            SortKey::Name => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Cpu => "cpu",
            SortKey::Memory => "memory",
            SortKey::Incoming => "incoming",
            SortKey::Outgoing => "outgoing",
            SortKey::Pid => "pid",
        }
    }

    fn compare(&self, a: &ProcessEntry, b: &ProcessEntry) -> Ordering {
        match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Cpu => a.cpu_percent.total_cmp(&b.cpu_percent),
            SortKey::Memory => a.memory_mb.total_cmp(&b.memory_mb),
            SortKey::Incoming => a.incoming_connections.cmp(&b.incoming_connections),
            SortKey::Outgoing => a.outgoing_connections.cmp(&b.outgoing_connections),
            SortKey::Pid => a.pid.cmp(&b.pid),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "cpu" => Ok(SortKey::Cpu),
            "memory" | "mem" | "ram" => Ok(SortKey::Memory),
            "incoming" | "in" => Ok(SortKey::Incoming),
            "outgoing" | "out" => Ok(SortKey::Outgoing),
            "pid" => Ok(SortKey::Pid),
            other => Err(format!("unknown sort column '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Cpu,
            order: SortOrder::Desc,
        }
    }
}

impl SortState {
    /// Same key flips the order; a new key starts at its default order
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.order = self.order.flipped();
        } else {
            self.key = key;
            self.order = key.default_order();
        }
    }

    /// Stable sort, ties keep their previous relative order
    pub fn apply(&self, rows: &mut [ProcessEntry]) {
        let key = self.key;
        match self.order {
            SortOrder::Asc => rows.sort_by(|a, b| key.compare(a, b)),
            SortOrder::Desc => rows.sort_by(|a, b| key.compare(b, a)),
        }
    }
}

/// Server-side filter parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotFilter {
    pub search: String,
    pub min_cpu: f64,
    pub min_memory: f64,
}

impl SnapshotFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("min_cpu", self.min_cpu.to_string()),
            ("min_memory", self.min_memory.to_string()),
            ("search", self.search.clone()),
        ]
    }
}

/// One outstanding snapshot fetch
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRequest {
    pub seq: u64,
    pub filter: SnapshotFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Rendered { rows: usize },
    Failed,
    Stale,
}

#[derive(Debug, Default)]
pub struct SnapshotTable {
    rows: Vec<ProcessEntry>,
    sort: SortState,
    filter: SnapshotFilter,
    total: usize,
    filtered: usize,
    loaded: bool,
    fence: RequestFence,
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ProcessEntry] {
        &self.rows
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn filter(&self) -> &SnapshotFilter {
        &self.filter
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn summary(&self) -> String {
        format!("{} of {} processes", self.filtered, self.total)
    }

    /// Fresh unfiltered load with the default sort
    pub fn begin_load(&mut self) -> SnapshotRequest {
        self.filter = SnapshotFilter::default();
        self.sort = SortState::default();
        SnapshotRequest {
            seq: self.fence.issue(),
            filter: self.filter.clone(),
        }
    }

    /// Refetch with new filter parameters; the active sort is kept
    pub fn begin_filter(&mut self, filter: SnapshotFilter) -> SnapshotRequest {
        self.filter = filter;
        SnapshotRequest {
            seq: self.fence.issue(),
            filter: self.filter.clone(),
        }
    }

    pub fn complete(
        &mut self,
        request: &SnapshotRequest,
        result: Result<SnapshotResponse, ClientError>,
    ) -> SnapshotOutcome {
        if !self.fence.is_current(request.seq) {
            debug!(seq = request.seq, "Discarding stale snapshot response");
            return SnapshotOutcome::Stale;
        }

        match result {
            Ok(response) => {
                let mut rows = response.processes;
                self.sort.apply(&mut rows);
                self.rows = rows;
                self.total = response.total;
                self.filtered = response.filtered;
                self.loaded = true;
                SnapshotOutcome::Rendered {
                    rows: self.rows.len(),
                }
            }
            Err(e) => {
                warn!(error = %e, search = %request.filter.search, "Snapshot fetch failed");
                SnapshotOutcome::Failed
            }
        }
    }

    /// Sort the displayed rows by `key` and return the resulting state
    pub fn sort(&mut self, key: SortKey) -> SortState {
        self.sort.select(key);
        self.sort.apply(&mut self.rows);
        self.sort
    }

    /// Serialize the displayed (filtered and sorted) rows as CSV
    pub fn export_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(CSV_HEADER)?;

        for row in &self.rows {
            writer.write_record([
                row.name.clone(),
                format!("{:.1}", row.cpu_percent),
                format!("{:.1}", row.memory_mb),
                row.incoming_connections.to_string(),
                row.outgoing_connections.to_string(),
                row.pid.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| {
                csv::Error::from(std::io::Error::new(e.error().kind(), e.error().to_string()))
            })?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Write the CSV export into `dir`, named after `date`
    pub fn write_csv(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf, ExportError> {
        let path = dir.join(export_filename(date));
        let content = self.export_csv()?;
        std::fs::write(&path, content).map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }
}

/// `system-snapshot-2024-05-01.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("system-snapshot-{}.csv", date.format("%Y-%m-%d"))
}
