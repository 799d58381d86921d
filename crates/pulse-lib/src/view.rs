//! Active view selection

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mutually exclusive display modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    Dashboard,
    AllApps,
    Snapshot,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Dashboard, ViewMode::AllApps, ViewMode::Snapshot];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Dashboard => "dashboard",
            ViewMode::AllApps => "all-apps",
            ViewMode::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" | "dash" => Ok(ViewMode::Dashboard),
            "all-apps" | "apps" | "all" => Ok(ViewMode::AllApps),
            "snapshot" | "snap" => Ok(ViewMode::Snapshot),
            other => Err(format!("unknown view '{}'", other)),
        }
    }
}

/// Data path to run after a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    /// Reset pagination and fetch page 1
    RefreshDashboard,
    /// Render the app catalog, fetching it first when not cached
    ShowCatalog { fetch: bool },
    /// Fetch a fresh unfiltered snapshot
    LoadSnapshot,
}

/// Tracks the active view and an epoch that changes on every switch.
///
/// Completions carry the epoch they were issued under; a mismatch means the
/// user moved on and the response must not touch state.
#[derive(Debug, Clone)]
pub struct ViewController {
    active: ViewMode,
    epoch: u64,
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewController {
    pub fn new() -> Self {
        Self {
            active: ViewMode::Dashboard,
            epoch: 0,
        }
    }

    pub fn active(&self) -> ViewMode {
        self.active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Switch to `target`. Switching to the active view still re-fetches.
    pub fn switch(&mut self, target: ViewMode, catalog_cached: bool) -> ViewCommand {
        self.active = target;
        self.epoch += 1;

        match target {
            ViewMode::Dashboard => ViewCommand::RefreshDashboard,
            ViewMode::AllApps => ViewCommand::ShowCatalog {
                fetch: !catalog_cached,
            },
            ViewMode::Snapshot => ViewCommand::LoadSnapshot,
        }
    }

    /// Selector affordances: exactly the active view is highlighted
    pub fn selectors(&self) -> [(ViewMode, bool); 3] {
        ViewMode::ALL.map(|mode| (mode, mode == self.active))
    }

    /// Pagination controls only exist on the dashboard
    pub fn shows_pagination(&self) -> bool {
        self.active == ViewMode::Dashboard
    }
}
