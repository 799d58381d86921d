//! Controller scenarios: view switches, paging, settings and the event loop

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::runtime::{Renderer, Runtime};
use super::*;
use crate::api::MonitorApi;
use crate::feed::EMPTY_PLACEHOLDER;
use crate::models::{AppInfo, ProcessEntry};
use crate::settings::{FileSettingsStore, MemorySettingsStore};
use crate::snapshot::SortOrder;
use crate::threshold::ThresholdConfig;

fn logger() -> StructuredLogger {
    StructuredLogger::new("http://localhost:8000")
}

fn controller() -> Controller {
    Controller::new(Box::new(MemorySettingsStore::new()), logger())
}

fn entry(pid: u32) -> ProcessEntry {
    ProcessEntry {
        pid,
        name: format!("proc-{}", pid),
        cpu_percent: (pid % 50) as f64,
        memory_mb: (pid * 3) as f64,
        incoming_connections: 1,
        outgoing_connections: 2,
        logo: None,
    }
}

fn page(page: u32, count: usize, total: usize) -> DashboardPage {
    let start = (page - 1) * 20;
    DashboardPage {
        items: (0..count as u32).map(|i| entry(start + i + 1)).collect(),
        page,
        items_per_page: 20,
        total_items: total,
    }
}

fn network_error() -> ClientError {
    ClientError::Network {
        path: "api/dashboard".to_string(),
        message: "connection refused".to_string(),
    }
}

fn dashboard_fetch(effects: &[Effect]) -> Option<(u64, PageRequest)> {
    effects.iter().find_map(|e| match e {
        Effect::Fetch(Fetch::DashboardPage { epoch, request }) => Some((*epoch, *request)),
        _ => None,
    })
}

fn snapshot_fetch(effects: &[Effect]) -> Option<(u64, SnapshotRequest)> {
    effects.iter().find_map(|e| match e {
        Effect::Fetch(Fetch::Snapshot { epoch, request }) => Some((*epoch, request.clone())),
        _ => None,
    })
}

fn messages(controller: &Controller) -> Vec<String> {
    controller
        .state()
        .notifications
        .visible()
        .map(|n| n.message.clone())
        .collect()
}

/// Startup plus a successful first page of `total` items
fn loaded_controller(total: usize) -> Controller {
    let mut c = controller();
    let effects = c.startup();
    let (epoch, request) = dashboard_fetch(&effects).unwrap();
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(1, total.min(20), total)),
    });
    c
}

#[test]
fn test_startup_fetches_everything_once() {
    let mut c = controller();
    let effects = c.startup();

    assert_eq!(effects[0], Effect::RestartPolling(Duration::from_secs(30)));
    let endpoints: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Fetch(f) => Some(f.endpoint()),
            _ => None,
        })
        .collect();
    assert_eq!(
        endpoints,
        vec![
            "/api/dashboard",
            "/api/all-apps",
            "/api/self-monitor",
            "/api/process-search"
        ]
    );
}

#[test]
fn test_switch_to_dashboard_resets_before_fetch() {
    let mut c = loaded_controller(45);
    let (epoch, request) = dashboard_fetch(&c.load_more()).unwrap();
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(2, 20, 45)),
    });
    assert_eq!(c.state().feed.pagination().current_page, 2);
    assert_eq!(c.state().feed.pagination().displayed_items, 40);

    let effects = c.switch_view(ViewMode::Dashboard);
    let pagination = c.state().feed.pagination();
    assert_eq!(pagination.current_page, 1);
    assert_eq!(pagination.displayed_items, 0);
    assert!(c.state().feed.entries().is_empty());

    let (_, request) = dashboard_fetch(&effects).unwrap();
    assert_eq!(request.page, 1);
}

#[test]
fn test_failed_load_more_keeps_counts_and_retries_same_page() {
    let mut c = loaded_controller(45);

    let (epoch, request) = dashboard_fetch(&c.load_more()).unwrap();
    assert_eq!(request.page, 2);
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Err(network_error()),
    });

    let pagination = c.state().feed.pagination();
    assert_eq!(pagination.total_items, 45);
    assert_eq!(pagination.displayed_items, 20);
    assert_eq!(pagination.current_page, 2);
    assert_eq!(c.state().feed.entries().len(), 20);
    assert!(messages(&c).contains(&"Failed to load processes".to_string()));

    let (_, retry) = dashboard_fetch(&c.load_more()).unwrap();
    assert_eq!(retry.page, 2);
}

#[test]
fn test_more_refused_while_refresh_in_flight() {
    let mut c = loaded_controller(15);
    let (epoch, refresh) = dashboard_fetch(&c.on_tick(Tick::DashboardRefresh)).unwrap();

    assert!(c.load_more().is_empty());
    assert!(!c.state().feed.can_load_more());

    c.apply(Completion::DashboardPage {
        epoch,
        request: refresh,
        result: Ok(page(1, 15, 15)),
    });

    let pagination = c.state().feed.pagination();
    assert_eq!(pagination.current_page, 1);
    assert_eq!(pagination.displayed_items, 15);
    assert_eq!(pagination.total_items, 15);
    assert!(c.state().notifications.is_empty());
    assert!(dashboard_fetch(&c.on_tick(Tick::DashboardRefresh)).is_some());
}

#[test]
fn test_failed_refresh_restores_displayed_count() {
    let mut c = loaded_controller(45);
    let (epoch, refresh) = dashboard_fetch(&c.on_tick(Tick::DashboardRefresh)).unwrap();
    c.apply(Completion::DashboardPage {
        epoch,
        request: refresh,
        result: Err(network_error()),
    });

    let feed = &c.state().feed;
    assert_eq!(feed.pagination().displayed_items, 20);
    assert_eq!(feed.entries().len(), 20);
    assert_eq!(
        feed.pagination().summary(),
        "Showing 20 of 45 processes · 25 more available"
    );
    assert!(feed.can_load_more());
}

#[test]
fn test_empty_next_page_steps_back() {
    let mut c = loaded_controller(21);
    let (epoch, request) = dashboard_fetch(&c.load_more()).unwrap();
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(2, 0, 21)),
    });

    let pagination = c.state().feed.pagination();
    assert_eq!(pagination.current_page, 1);
    assert_eq!(pagination.displayed_items, 20);
    assert_eq!(pagination.total_items, 20);
    assert!(messages(&c).contains(&"No additional processes found".to_string()));
    assert!(c.load_more().is_empty());
    assert!(dashboard_fetch(&c.on_tick(Tick::DashboardRefresh)).is_some());
}

#[test]
fn test_load_more_notifications() {
    let mut c = loaded_controller(21);
    let (epoch, request) = dashboard_fetch(&c.load_more()).unwrap();
    assert_eq!(messages(&c), vec!["Reading system processes..."]);

    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(2, 1, 21)),
    });
    assert_eq!(
        messages(&c),
        vec!["Reading system processes...", "Loaded 1 process (Page 2)"]
    );
    assert!(!c.state().feed.pagination().has_more());
    assert!(c.load_more().is_empty());
}

#[test]
fn test_empty_first_page_shows_placeholder() {
    let c = loaded_controller(0);
    assert_eq!(c.state().feed.placeholder(), Some(EMPTY_PLACEHOLDER));
    assert!(c.state().notifications.is_empty());
}

#[test]
fn test_completion_from_old_view_is_discarded() {
    let mut c = controller();
    let effects = c.startup();
    let (epoch, request) = dashboard_fetch(&effects).unwrap();

    c.switch_view(ViewMode::Snapshot);
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(1, 20, 45)),
    });

    assert!(c.state().feed.entries().is_empty());
    assert_eq!(c.state().feed.pagination().total_items, 0);
    assert!(c.state().last_updated.is_none());
}

#[test]
fn test_snapshot_response_after_leaving_view_is_discarded() {
    let mut c = controller();
    c.startup();
    let (epoch, request) = snapshot_fetch(&c.switch_view(ViewMode::Snapshot)).unwrap();
    c.switch_view(ViewMode::AllApps);

    c.apply(Completion::Snapshot {
        epoch,
        request,
        result: Ok(SnapshotResponse {
            processes: vec![entry(1)],
            total: 1,
            filtered: 1,
        }),
    });
    assert!(!c.state().snapshot.is_loaded());
}

#[test]
fn test_auto_refresh_only_on_first_dashboard_page() {
    let mut c = loaded_controller(45);
    assert!(dashboard_fetch(&c.on_tick(Tick::DashboardRefresh)).is_some());

    let (epoch, request) = dashboard_fetch(&c.load_more()).unwrap();
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(2, 20, 45)),
    });
    assert!(c.on_tick(Tick::DashboardRefresh).is_empty());

    c.switch_view(ViewMode::AllApps);
    assert!(c.on_tick(Tick::DashboardRefresh).is_empty());
    assert!(matches!(
        c.on_tick(Tick::SelfMonitorRefresh).as_slice(),
        [Effect::Fetch(Fetch::SelfMonitor { .. })]
    ));
}

#[test]
fn test_catalog_fetched_only_when_missing() {
    let mut c = controller();
    let effects = c.startup();
    let seq = effects
        .iter()
        .find_map(|e| match e {
            Effect::Fetch(Fetch::Catalog { seq }) => Some(*seq),
            _ => None,
        })
        .unwrap();
    c.apply(Completion::Catalog {
        seq,
        result: Ok(AppCatalog(vec![AppInfo {
            display_name: "Firefox".to_string(),
            exe_name: "firefox".to_string(),
            logo: None,
        }])),
    });

    assert!(c.switch_view(ViewMode::AllApps).is_empty());
    assert!(!c.state().view.shows_pagination());
    assert_eq!(c.state().catalog.apps().unwrap().len(), 1);
}

#[test]
fn test_filter_then_sort_then_filter_keeps_sort() {
    let mut c = controller();
    c.startup();
    let (epoch, request) = snapshot_fetch(&c.switch_view(ViewMode::Snapshot)).unwrap();
    c.apply(Completion::Snapshot {
        epoch,
        request,
        result: Ok(SnapshotResponse {
            processes: vec![entry(3), entry(1), entry(2)],
            total: 3,
            filtered: 3,
        }),
    });

    let filter = SnapshotFilter {
        search: "proc".to_string(),
        min_cpu: 0.0,
        min_memory: 0.0,
    };
    c.apply_filter(filter.clone());
    let sort = c.sort(SortKey::Name).unwrap();
    assert_eq!(sort.order, SortOrder::Asc);

    let (epoch, request) = snapshot_fetch(&c.apply_filter(filter)).unwrap();
    c.apply(Completion::Snapshot {
        epoch,
        request,
        result: Ok(SnapshotResponse {
            processes: vec![entry(2), entry(3), entry(1)],
            total: 3,
            filtered: 3,
        }),
    });

    let state = c.state().snapshot.sort_state();
    assert_eq!((state.key, state.order), (SortKey::Name, SortOrder::Asc));
    let names: Vec<_> = c.state().snapshot.rows().iter().map(|r| r.pid).collect();
    assert_eq!(names, vec![1, 2, 3]);
}

#[test]
fn test_sort_and_filter_ignored_outside_snapshot() {
    let mut c = controller();
    c.startup();
    assert!(c.sort(SortKey::Cpu).is_none());
    assert!(c.apply_filter(SnapshotFilter::default()).is_empty());
}

#[test]
fn test_search_enter_opens_details_and_gone_warns() {
    let mut c = controller();
    c.startup();
    c.apply(Completion::SearchIndex {
        result: Ok(vec![SearchEntry {
            pid: 42,
            name: "redis".to_string(),
        }]),
    });

    c.handle(Command::SearchInput("red".to_string()));
    let effects = c.handle(Command::SearchKey(Key::Enter));
    let seq = match effects.as_slice() {
        [Effect::Fetch(Fetch::Details { pid: 42, seq })] => *seq,
        other => panic!("unexpected effects: {other:?}"),
    };
    assert!(!c.state().search.is_open());
    assert!(c.state().details.is_open());

    c.apply(Completion::Details {
        pid: 42,
        seq,
        result: Err(ClientError::NotFound { pid: 42 }),
    });
    assert!(!c.state().details.is_open());
    assert_eq!(messages(&c), vec!["Process 42 is no longer running"]);
}

#[test]
fn test_save_settings_persists_restarts_and_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut c = Controller::new(Box::new(FileSettingsStore::open(&path)), logger());
    let (epoch, request) = dashboard_fetch(&c.startup()).unwrap();
    c.apply(Completion::DashboardPage {
        epoch,
        request,
        result: Ok(page(1, 20, 45)),
    });
    c.load_more();

    let thresholds = ThresholdConfig {
        cpu_yellow: 10.0,
        cpu_red: 40.0,
        ram_yellow: 30.0,
        ram_red: 60.0,
    };
    let effects = c.save_settings(Settings::from_dialog(thresholds, 10));

    assert_eq!(effects[0], Effect::RestartPolling(Duration::from_secs(10)));
    let (_, request) = dashboard_fetch(&effects).unwrap();
    assert_eq!(request.page, 1);
    assert_eq!(c.state().settings.thresholds, thresholds);
    assert!(messages(&c).contains(&"Settings saved".to_string()));

    let reloaded = Settings::load(&FileSettingsStore::open(&path));
    assert_eq!(reloaded.refresh_interval, Duration::from_secs(10));
    assert_eq!(reloaded.thresholds, thresholds);
}

#[test]
fn test_invalid_settings_rejected() {
    let mut c = controller();
    c.startup();
    assert!(c.save_settings(Settings::from_dialog(ThresholdConfig::default(), 0)).is_empty());
    assert_eq!(c.state().settings, Settings::default());
    assert_eq!(messages(&c), vec!["Invalid settings"]);
}

#[test]
fn test_export_requires_loaded_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let mut c = controller();
    c.startup();
    assert!(c.export_snapshot(dir.path(), date).is_none());

    let (epoch, request) = snapshot_fetch(&c.switch_view(ViewMode::Snapshot)).unwrap();
    c.apply(Completion::Snapshot {
        epoch,
        request,
        result: Ok(SnapshotResponse {
            processes: vec![entry(7)],
            total: 1,
            filtered: 1,
        }),
    });
    let path = c.export_snapshot(dir.path(), date).unwrap();
    assert!(path.ends_with("system-snapshot-2024-05-01.csv"));
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.starts_with("Process Name,CPU %"));
}

/// Serves `total` generated processes and fails the pages listed in `failing`
struct FakeApi {
    total: usize,
    failing: Mutex<HashSet<u32>>,
}

impl FakeApi {
    fn new(total: usize) -> Self {
        Self {
            total,
            failing: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl MonitorApi for FakeApi {
    async fn dashboard_page(&self, number: u32) -> Result<DashboardPage, ClientError> {
        if self.failing.lock().unwrap().contains(&number) {
            return Err(network_error());
        }
        let remaining = self.total.saturating_sub((number as usize - 1) * 20);
        Ok(page(number, remaining.min(20), self.total))
    }

    async fn all_apps(&self) -> Result<AppCatalog, ClientError> {
        Ok(AppCatalog::default())
    }

    async fn self_monitor(&self) -> Result<SelfMonitorReport, ClientError> {
        Ok(SelfMonitorReport {
            cpu_percent: 2.0,
            memory_mb: 80.0,
            uptime_seconds: 120.0,
            last_deviation: None,
        })
    }

    async fn snapshot(&self, _filter: &SnapshotFilter) -> Result<SnapshotResponse, ClientError> {
        Ok(SnapshotResponse {
            processes: vec![entry(1), entry(2)],
            total: 2,
            filtered: 2,
        })
    }

    async fn process_search(&self) -> Result<Vec<SearchEntry>, ClientError> {
        Ok(Vec::new())
    }

    async fn process_details(&self, pid: u32) -> Result<ProcessDetails, ClientError> {
        Err(ClientError::NotFound { pid })
    }
}

/// Sends scripted commands as soon as the state allows them
struct ScriptedRenderer {
    commands: mpsc::Sender<Command>,
    step: usize,
}

impl Renderer for ScriptedRenderer {
    fn render(&mut self, state: &DashboardState) {
        let pagination = state.feed.pagination();
        let next = match self.step {
            0 if pagination.displayed_items == 20 => Some(Command::LoadMore),
            1 if pagination.displayed_items == 25 => Some(Command::Quit),
            _ => None,
        };
        if let Some(command) = next {
            self.commands.try_send(command).unwrap();
            self.step += 1;
        }
    }
}

#[tokio::test]
async fn test_runtime_pages_through_feed() {
    let api = Arc::new(FakeApi::new(25));
    let runtime = Runtime::new(api, controller(), logger());
    let (tx, rx) = mpsc::channel(8);
    let mut renderer = ScriptedRenderer {
        commands: tx,
        step: 0,
    };

    let finished = tokio::time::timeout(Duration::from_secs(5), runtime.run(rx, &mut renderer))
        .await
        .expect("runtime did not finish");

    let state = finished.state();
    assert_eq!(state.feed.entries().len(), 25);
    assert_eq!(state.feed.pagination().current_page, 2);
    assert!(!state.feed.pagination().has_more());
}

#[tokio::test]
async fn test_runtime_survives_failed_page() {
    let api = Arc::new(FakeApi::new(45));
    api.failing.lock().unwrap().insert(2);
    let runtime = Runtime::new(api.clone(), controller(), logger());
    let (tx, rx) = mpsc::channel(8);

    struct QuitAfterFailure {
        commands: mpsc::Sender<Command>,
        step: usize,
    }

    impl Renderer for QuitAfterFailure {
        fn render(&mut self, state: &DashboardState) {
            let failed = state
                .notifications
                .visible()
                .any(|n| n.message == "Failed to load processes");
            let next = match self.step {
                0 if state.feed.pagination().displayed_items == 20 => Some(Command::LoadMore),
                1 if failed => Some(Command::Quit),
                _ => None,
            };
            if let Some(command) = next {
                self.commands.try_send(command).unwrap();
                self.step += 1;
            }
        }
    }

    let mut renderer = QuitAfterFailure {
        commands: tx,
        step: 0,
    };
    let finished = tokio::time::timeout(Duration::from_secs(5), runtime.run(rx, &mut renderer))
        .await
        .expect("runtime did not finish");

    let pagination = finished.state().feed.pagination();
    assert_eq!(pagination.displayed_items, 20);
    assert_eq!(pagination.total_items, 45);
    assert_eq!(pagination.current_page, 2);
}
