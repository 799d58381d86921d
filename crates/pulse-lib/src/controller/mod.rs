//! Dashboard controller
//!
//! [`Controller`] owns every piece of view state and turns user commands,
//! timer ticks and fetch completions into state changes plus [`Effect`]s.
//! It never performs I/O against the backend itself: fetches are described
//! by [`Fetch`] values that the [`Runtime`](runtime::Runtime) executes and
//! feeds back as [`Completion`]s.

pub mod runtime;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::catalog::CatalogStore;
use crate::error::ClientError;
use crate::feed::{FeedAccumulator, FeedOutcome, PageRequest};
use crate::models::{
    AppCatalog, DashboardPage, ProcessDetails, ProcessSearchResponse, Schema, SearchEntry,
    SelfMonitorReport, SnapshotResponse,
};
use crate::notify::{NotificationCenter, NotificationLevel};
use crate::observability::{PulseMetrics, StructuredLogger};
use crate::scheduler::Tick;
use crate::search::{Autocomplete, DetailOutcome, DetailPanel, Key, KeyOutcome};
use crate::self_monitor::SelfMonitor;
use crate::settings::{Settings, SettingsStore};
use crate::snapshot::{
    SnapshotFilter, SnapshotOutcome, SnapshotRequest, SnapshotTable, SortKey, SortState,
};
use crate::view::{ViewCommand, ViewController, ViewMode};

const SHORT_NOTICE: Duration = Duration::from_secs(3);
const ERROR_NOTICE: Duration = Duration::from_secs(5);

/// A backend request the runtime should perform
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    DashboardPage { epoch: u64, request: PageRequest },
    Catalog { seq: u64 },
    SelfMonitor { seq: u64 },
    Snapshot { epoch: u64, request: SnapshotRequest },
    SearchIndex,
    Details { pid: u32, seq: u64 },
}

impl Fetch {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Fetch::DashboardPage { .. } => DashboardPage::ENDPOINT,
            Fetch::Catalog { .. } => AppCatalog::ENDPOINT,
            Fetch::SelfMonitor { .. } => SelfMonitorReport::ENDPOINT,
            Fetch::Snapshot { .. } => SnapshotResponse::ENDPOINT,
            Fetch::SearchIndex => ProcessSearchResponse::ENDPOINT,
            Fetch::Details { .. } => ProcessDetails::ENDPOINT,
        }
    }
}

/// A finished fetch, carrying the context it was issued under
#[derive(Debug)]
pub enum Completion {
    DashboardPage {
        epoch: u64,
        request: PageRequest,
        result: Result<DashboardPage, ClientError>,
    },
    Catalog {
        seq: u64,
        result: Result<AppCatalog, ClientError>,
    },
    SelfMonitor {
        seq: u64,
        result: Result<SelfMonitorReport, ClientError>,
    },
    Snapshot {
        epoch: u64,
        request: SnapshotRequest,
        result: Result<SnapshotResponse, ClientError>,
    },
    SearchIndex {
        result: Result<Vec<SearchEntry>, ClientError>,
    },
    Details {
        pid: u32,
        seq: u64,
        result: Result<ProcessDetails, ClientError>,
    },
}

/// Side effects requested by a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(Fetch),
    /// Reconfigure the dashboard timer
    RestartPolling(Duration),
}

/// User intents
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SwitchView(ViewMode),
    LoadMore,
    Filter(SnapshotFilter),
    Sort(SortKey),
    SearchInput(String),
    SearchKey(Key),
    SearchClickOutside,
    OpenDetails(u32),
    CloseDetails,
    SaveSettings(Settings),
    ResetSettings,
    /// Write the snapshot CSV into this directory
    Export { dir: PathBuf },
    Quit,
}

/// Everything the dashboard renders from
#[derive(Debug, Default)]
pub struct DashboardState {
    pub view: ViewController,
    pub feed: FeedAccumulator,
    pub catalog: CatalogStore,
    pub snapshot: SnapshotTable,
    pub search: Autocomplete,
    pub details: DetailPanel,
    pub monitor: SelfMonitor,
    pub settings: Settings,
    pub notifications: NotificationCenter,
    pub last_updated: Option<DateTime<Utc>>,
}

pub struct Controller {
    state: DashboardState,
    store: Box<dyn SettingsStore>,
    logger: StructuredLogger,
    metrics: PulseMetrics,
}

impl Controller {
    /// Build a controller with settings read from `store`
    pub fn new(store: Box<dyn SettingsStore>, logger: StructuredLogger) -> Self {
        let settings = Settings::load(store.as_ref());
        Self {
            state: DashboardState {
                settings,
                ..DashboardState::default()
            },
            store,
            logger,
            metrics: PulseMetrics::new(),
        }
    }

    /// Override the refresh interval for this session without persisting it
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.state.settings.refresh_interval = interval;
        }
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Initial fetches and timer setup
    pub fn startup(&mut self) -> Vec<Effect> {
        self.logger
            .log_startup(env!("CARGO_PKG_VERSION"), self.state.settings.refresh_interval);

        let mut effects = vec![Effect::RestartPolling(self.state.settings.refresh_interval)];
        effects.extend(self.refresh_dashboard());
        effects.push(Effect::Fetch(Fetch::Catalog {
            seq: self.state.catalog.begin(),
        }));
        effects.push(Effect::Fetch(Fetch::SelfMonitor {
            seq: self.state.monitor.begin(),
        }));
        effects.push(Effect::Fetch(Fetch::SearchIndex));
        effects
    }

    pub fn on_tick(&mut self, tick: Tick) -> Vec<Effect> {
        match tick {
            Tick::DashboardRefresh => {
                self.metrics.inc_poll("dashboard");
                let effects = if self.state.view.active() == ViewMode::Dashboard {
                    self.refresh_dashboard()
                } else {
                    Vec::new()
                };
                self.logger.log_poll("dashboard", effects.is_empty());
                effects
            }
            Tick::SelfMonitorRefresh => {
                self.metrics.inc_poll("self_monitor");
                vec![Effect::Fetch(Fetch::SelfMonitor {
                    seq: self.state.monitor.begin(),
                })]
            }
        }
    }

    /// Drop expired notifications; true when the visible set changed
    pub fn prune_notifications(&mut self, now: Instant) -> bool {
        self.state.notifications.prune(now)
    }

    /// Dispatch a user command. `Quit` is handled by the runtime.
    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::SwitchView(target) => self.switch_view(target),
            Command::LoadMore => self.load_more(),
            Command::Filter(filter) => self.apply_filter(filter),
            Command::Sort(key) => {
                self.sort(key);
                Vec::new()
            }
            Command::SearchInput(text) => {
                self.state.search.on_input(&text);
                Vec::new()
            }
            Command::SearchKey(key) => self.search_key(key),
            Command::SearchClickOutside => {
                self.state.search.on_click_outside();
                Vec::new()
            }
            Command::OpenDetails(pid) => self.open_details(pid),
            Command::CloseDetails => {
                self.state.details.close();
                Vec::new()
            }
            Command::SaveSettings(settings) => self.save_settings(settings),
            Command::ResetSettings => self.reset_settings(),
            Command::Export { dir } => {
                self.export_snapshot(&dir, chrono::Local::now().date_naive());
                Vec::new()
            }
            Command::Quit => Vec::new(),
        }
    }

    pub fn switch_view(&mut self, target: ViewMode) -> Vec<Effect> {
        let from = self.state.view.active();
        let command = self
            .state
            .view
            .switch(target, self.state.catalog.is_cached());
        self.logger
            .log_view_switch(from, target, self.state.view.epoch());

        match command {
            ViewCommand::RefreshDashboard => {
                self.state.feed.reset();
                self.metrics.set_displayed_items(0);
                self.refresh_dashboard()
            }
            ViewCommand::ShowCatalog { fetch: true } => vec![Effect::Fetch(Fetch::Catalog {
                seq: self.state.catalog.begin(),
            })],
            ViewCommand::ShowCatalog { fetch: false } => Vec::new(),
            ViewCommand::LoadSnapshot => {
                let request = self.state.snapshot.begin_load();
                vec![Effect::Fetch(Fetch::Snapshot {
                    epoch: self.state.view.epoch(),
                    request,
                })]
            }
        }
    }

    fn refresh_dashboard(&mut self) -> Vec<Effect> {
        match self.state.feed.begin_refresh() {
            Some(request) => vec![Effect::Fetch(Fetch::DashboardPage {
                epoch: self.state.view.epoch(),
                request,
            })],
            None => Vec::new(),
        }
    }

    /// Fetch and append the next page
    pub fn load_more(&mut self) -> Vec<Effect> {
        if self.state.view.active() != ViewMode::Dashboard
            || !self.state.feed.pagination().has_more()
        {
            debug!("Load more unavailable");
            return Vec::new();
        }

        let Some(request) = self.state.feed.begin_load_more() else {
            debug!("Load more waiting on an in-flight page fetch");
            return Vec::new();
        };

        self.state.notifications.push(
            NotificationLevel::Info,
            "Reading system processes...",
            Duration::ZERO,
        );
        vec![Effect::Fetch(Fetch::DashboardPage {
            epoch: self.state.view.epoch(),
            request,
        })]
    }

    pub fn apply_filter(&mut self, filter: SnapshotFilter) -> Vec<Effect> {
        if self.state.view.active() != ViewMode::Snapshot {
            debug!("Filter ignored outside the snapshot view");
            return Vec::new();
        }
        let request = self.state.snapshot.begin_filter(filter);
        vec![Effect::Fetch(Fetch::Snapshot {
            epoch: self.state.view.epoch(),
            request,
        })]
    }

    pub fn sort(&mut self, key: SortKey) -> Option<SortState> {
        if self.state.view.active() != ViewMode::Snapshot {
            debug!("Sort ignored outside the snapshot view");
            return None;
        }
        Some(self.state.snapshot.sort(key))
    }

    fn search_key(&mut self, key: Key) -> Vec<Effect> {
        match self.state.search.on_keydown(key) {
            KeyOutcome::Open(pid) => self.open_details(pid),
            _ => Vec::new(),
        }
    }

    pub fn open_details(&mut self, pid: u32) -> Vec<Effect> {
        let seq = self.state.details.begin(pid);
        vec![Effect::Fetch(Fetch::Details { pid, seq })]
    }

    /// Persist and apply new settings, then restart polling from page 1
    pub fn save_settings(&mut self, settings: Settings) -> Vec<Effect> {
        if !settings.is_valid() {
            self.state.notifications.push(
                NotificationLevel::Error,
                "Invalid settings",
                ERROR_NOTICE,
            );
            return Vec::new();
        }

        let persisted = match settings.save(self.store.as_mut()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to persist settings");
                false
            }
        };
        self.logger
            .log_settings_saved(settings.refresh_interval, persisted);

        self.state.settings = settings;
        if persisted {
            self.state
                .notifications
                .push(NotificationLevel::Success, "Settings saved", SHORT_NOTICE);
        } else {
            self.state.notifications.push(
                NotificationLevel::Warning,
                "Settings applied but could not be saved",
                ERROR_NOTICE,
            );
        }

        self.state.feed.reset();
        self.metrics.set_displayed_items(0);

        let mut effects = vec![Effect::RestartPolling(settings.refresh_interval)];
        if self.state.view.active() == ViewMode::Dashboard {
            effects.extend(self.refresh_dashboard());
        }
        effects
    }

    /// Restore default settings; applied the same way as a save
    pub fn reset_settings(&mut self) -> Vec<Effect> {
        self.save_settings(Settings::default())
    }

    /// Write the displayed snapshot rows as CSV into `dir`
    pub fn export_snapshot(&mut self, dir: &Path, date: NaiveDate) -> Option<PathBuf> {
        if !self.state.snapshot.is_loaded() {
            self.state.notifications.push(
                NotificationLevel::Warning,
                "No snapshot to export",
                SHORT_NOTICE,
            );
            return None;
        }

        match self.state.snapshot.write_csv(dir, date) {
            Ok(path) => {
                self.state.notifications.push(
                    NotificationLevel::Success,
                    format!("Exported {}", path.display()),
                    SHORT_NOTICE,
                );
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Snapshot export failed");
                self.state.notifications.push(
                    NotificationLevel::Error,
                    "Export failed",
                    ERROR_NOTICE,
                );
                None
            }
        }
    }

    /// Apply a finished fetch. Stale completions leave state untouched.
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::DashboardPage {
                epoch,
                request,
                result,
            } => self.apply_dashboard_page(epoch, request, result),

            Completion::Catalog { seq, result } => {
                if let Err(e) = &result {
                    self.record_failure(AppCatalog::ENDPOINT, e);
                    if self.state.view.active() == ViewMode::AllApps {
                        self.state.notifications.push(
                            NotificationLevel::Error,
                            "Failed to load applications",
                            ERROR_NOTICE,
                        );
                    }
                }
                self.state.catalog.complete(seq, result);
            }

            Completion::SelfMonitor { seq, result } => {
                if let Err(e) = &result {
                    self.record_failure(SelfMonitorReport::ENDPOINT, e);
                }
                self.state.monitor.complete(seq, result, Utc::now());
            }

            Completion::Snapshot {
                epoch,
                request,
                result,
            } => self.apply_snapshot(epoch, request, result),

            Completion::SearchIndex { result } => match result {
                Ok(entries) => {
                    debug!(entries = entries.len(), "Search cache loaded");
                    self.state.search.build_cache(entries);
                }
                Err(e) => self.record_failure(ProcessSearchResponse::ENDPOINT, &e),
            },

            Completion::Details { pid, seq, result } => {
                if let Err(e) = &result {
                    if !matches!(e, ClientError::NotFound { .. }) {
                        self.record_failure(ProcessDetails::ENDPOINT, e);
                    }
                }
                match self.state.details.complete(pid, seq, result) {
                    DetailOutcome::Shown => {}
                    DetailOutcome::Gone { pid } => {
                        self.state.notifications.push(
                            NotificationLevel::Warning,
                            format!("Process {} is no longer running", pid),
                            SHORT_NOTICE,
                        );
                    }
                    DetailOutcome::Failed => {
                        self.state.notifications.push(
                            NotificationLevel::Error,
                            "Failed to load process details",
                            ERROR_NOTICE,
                        );
                    }
                    DetailOutcome::Stale => self.record_stale(ProcessDetails::ENDPOINT, seq),
                }
            }
        }
    }

    fn apply_dashboard_page(
        &mut self,
        epoch: u64,
        request: PageRequest,
        result: Result<DashboardPage, ClientError>,
    ) {
        if !self.state.view.is_current(epoch) {
            self.state.feed.discard(&request);
            self.record_stale(DashboardPage::ENDPOINT, request.seq);
            return;
        }

        if let Err(e) = &result {
            self.record_failure(DashboardPage::ENDPOINT, e);
        }

        let outcome = self.state.feed.complete(&request, result);
        match outcome {
            FeedOutcome::Rendered { page, count } => {
                self.state.last_updated = Some(Utc::now());
                if request.user_initiated {
                    let noun = if count == 1 { "process" } else { "processes" };
                    self.state.notifications.push(
                        NotificationLevel::Success,
                        format!("Loaded {} {} (Page {})", count, noun, page),
                        SHORT_NOTICE,
                    );
                }
            }
            FeedOutcome::Empty { page } => {
                if page > 1 {
                    self.state.notifications.push(
                        NotificationLevel::Warning,
                        "No additional processes found",
                        SHORT_NOTICE,
                    );
                }
            }
            FeedOutcome::Failed { .. } => {
                if request.user_initiated {
                    self.state.notifications.push(
                        NotificationLevel::Error,
                        "Failed to load processes",
                        ERROR_NOTICE,
                    );
                }
            }
            FeedOutcome::Stale { .. } => self.record_stale(DashboardPage::ENDPOINT, request.seq),
        }

        self.metrics
            .set_displayed_items(self.state.feed.pagination().displayed_items);
    }

    fn apply_snapshot(
        &mut self,
        epoch: u64,
        request: SnapshotRequest,
        result: Result<SnapshotResponse, ClientError>,
    ) {
        if !self.state.view.is_current(epoch) {
            self.record_stale(SnapshotResponse::ENDPOINT, request.seq);
            return;
        }

        if let Err(e) = &result {
            self.record_failure(SnapshotResponse::ENDPOINT, e);
        }

        match self.state.snapshot.complete(&request, result) {
            SnapshotOutcome::Rendered { .. } => {}
            SnapshotOutcome::Failed => {
                self.state.notifications.push(
                    NotificationLevel::Error,
                    "Failed to load snapshot",
                    ERROR_NOTICE,
                );
            }
            SnapshotOutcome::Stale => self.record_stale(SnapshotResponse::ENDPOINT, request.seq),
        }
    }

    fn record_failure(&self, endpoint: &str, error: &ClientError) {
        self.metrics.inc_fetch_failure(endpoint, error.kind());
        self.logger
            .log_fetch_failure(endpoint, error.kind(), &error.to_string());
    }

    fn record_stale(&self, endpoint: &str, seq: u64) {
        self.metrics.inc_stale_discard(endpoint);
        self.logger.log_stale_discard(endpoint, seq);
    }
}
