//! Live dashboard: runs the controller loop and redraws on every change

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use pulse_lib::catalog::Avatar;
use pulse_lib::search::{DetailState, Key};
use pulse_lib::self_monitor::{DeviationLevel, SelfMonitorPanel};
use pulse_lib::snapshot::{SnapshotFilter, SortKey, SortOrder};
use pulse_lib::{
    Command, Controller, DashboardState, MonitorApi, PulseMetrics, Renderer, Runtime,
    SettingsStore, StructuredLogger, ViewMode,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::output::{
    format_avatar, format_notification, print_error, render_table, OutputFormat, ProcessRow,
};

const HELP: &str = "commands: more | view dashboard|apps|snapshot | sort KEY | filter [SEARCH] [MIN_CPU] [MIN_MEM] | search TEXT | down | up | enter | esc | details PID | close | export | quit";

/// Parse one line of user input. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_lowercase().as_str() {
        "more" | "m" => Command::LoadMore,
        "view" | "v" => {
            let target = rest.first().ok_or("view needs a target")?;
            Command::SwitchView(target.parse::<ViewMode>()?)
        }
        "sort" => {
            let key = rest.first().ok_or("sort needs a column")?;
            Command::Sort(key.parse::<SortKey>()?)
        }
        "filter" => Command::Filter(parse_filter(&rest)?),
        "search" | "/" => Command::SearchInput(rest.join(" ")),
        "down" | "j" => Command::SearchKey(Key::ArrowDown),
        "up" | "k" => Command::SearchKey(Key::ArrowUp),
        "enter" => Command::SearchKey(Key::Enter),
        "esc" => Command::SearchKey(Key::Escape),
        "details" => {
            let pid = rest.first().ok_or("details needs a pid")?;
            Command::OpenDetails(pid.parse().map_err(|_| format!("invalid pid '{}'", pid))?)
        }
        "close" => Command::CloseDetails,
        "export" => Command::Export {
            dir: rest
                .first()
                .map(|dir| PathBuf::from(*dir))
                .unwrap_or_else(|| PathBuf::from(".")),
        },
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Some(command))
}

fn parse_filter(args: &[&str]) -> Result<SnapshotFilter, String> {
    let number = |idx: usize, name: &str| -> Result<f64, String> {
        match args.get(idx) {
            None => Ok(0.0),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| format!("invalid {} '{}'", name, raw)),
        }
    };

    let search = match args.first() {
        Some(&"-") | None => String::new(),
        Some(s) => s.to_string(),
    };
    Ok(SnapshotFilter {
        search,
        min_cpu: number(1, "minimum CPU")?,
        min_memory: number(2, "minimum memory")?,
    })
}

/// Prints the active view whenever its rendering changes
pub struct TerminalRenderer {
    format: OutputFormat,
    last: String,
}

impl TerminalRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            last: String::new(),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, state: &DashboardState) {
        let frame = match self.format {
            OutputFormat::Table => render_frame(state),
            OutputFormat::Json => match serde_json::to_string(&JsonFrame::from(state)) {
                Ok(json) => json,
                Err(e) => {
                    debug!(error = %e, "Failed to serialize frame");
                    return;
                }
            },
        };
        if frame == self.last {
            return;
        }
        match self.format {
            // clear screen, cursor home
            OutputFormat::Table => print!("\x1b[2J\x1b[H{}", frame),
            OutputFormat::Json => println!("{}", frame),
        }
        self.last = frame;
    }
}

fn render_frame(state: &DashboardState) -> String {
    let mut out = String::new();

    let selectors: Vec<String> = state
        .view
        .selectors()
        .iter()
        .map(|(mode, active)| {
            if *active {
                format!("[{}]", mode).bold().cyan().to_string()
            } else {
                mode.to_string().dimmed().to_string()
            }
        })
        .collect();
    out.push_str(&format!("{}  {}\n", "System Pulse".bold(), selectors.join(" ")));

    if let Some(panel) = state.monitor.panel() {
        out.push_str(&render_monitor(panel));
    }

    for notification in state.notifications.visible() {
        out.push_str(&format_notification(notification));
        out.push('\n');
    }
    out.push('\n');

    match state.view.active() {
        ViewMode::Dashboard => render_dashboard(state, &mut out),
        ViewMode::AllApps => render_catalog(state, &mut out),
        ViewMode::Snapshot => render_snapshot(state, &mut out),
    }

    if state.search.is_open() {
        out.push_str(&format!("\n{} {}\n", "Search:".bold(), state.search.query()));
        if state.search.results().is_empty() {
            out.push_str(&"  no matches\n".dimmed().to_string());
        }
        for (idx, entry) in state.search.results().iter().enumerate() {
            let line = format!("{} ({})", entry.name, entry.pid);
            if state.search.selected() == Some(idx) {
                out.push_str(&format!("> {}\n", line.reversed()));
            } else {
                out.push_str(&format!("  {}\n", line));
            }
        }
    }

    match state.details.state() {
        DetailState::Closed => {}
        DetailState::Loading { pid } => {
            out.push_str(&format!("\nLoading details for pid {}...\n", pid).dimmed().to_string());
        }
        DetailState::Showing(details) => {
            out.push_str(&format!("\n{}\n", details.name().unwrap_or("process").bold()));
            for (field, value) in &details.fields {
                out.push_str(&format!("  {:<20} {}\n", field, value));
            }
        }
    }

    out.push_str(&format!("\n{}\n", HELP.dimmed()));
    out
}

fn render_monitor(panel: &SelfMonitorPanel) -> String {
    let cpu = format!("CPU {:.1}%", panel.cpu_percent);
    let cpu = if panel.cpu_warning { cpu.yellow() } else { cpu.green() };
    let mem = format!("MEM {:.0}MB", panel.memory_mb);
    let mem = if panel.memory_warning { mem.yellow() } else { mem.green() };

    let deviation = match &panel.deviation {
        None => "No deviations".green().to_string(),
        Some(d) => {
            let text = format!("{} {} ({})", d.process_name, d.metric, d.last_seen);
            match d.level {
                DeviationLevel::Critical => text.red().to_string(),
                DeviationLevel::Warning => text.yellow().to_string(),
            }
        }
    };

    format!(
        "{} {} · {} · up {} · {}\n",
        "Monitor:".dimmed(),
        cpu,
        mem,
        panel.uptime.short,
        deviation
    )
}

fn render_dashboard(state: &DashboardState, out: &mut String) {
    let feed = &state.feed;
    if let Some(placeholder) = feed.placeholder() {
        out.push_str(&format!("{}\n", placeholder.dimmed()));
    } else if !feed.entries().is_empty() {
        let rows: Vec<ProcessRow> = feed
            .entries()
            .iter()
            .map(|entry| ProcessRow::new(entry, &state.settings.thresholds))
            .collect();
        out.push_str(&render_table(&rows));
        out.push('\n');
    }

    let pagination = feed.pagination();
    out.push_str(&format!(
        "{} · {}\n",
        pagination.page_indicator(),
        pagination.summary()
    ));
    if feed.is_loading_more() {
        out.push_str(&format!("{}\n", "Loading...".dimmed()));
    } else if feed.can_load_more() {
        out.push_str(&format!("{}\n", "Type 'more' to load the next page".cyan()));
    }
    if let Some(updated) = state.last_updated {
        let local = updated.with_timezone(&chrono::Local);
        out.push_str(&format!("Last updated {}\n", local.format("%H:%M:%S")).dimmed().to_string());
    }
}

fn render_catalog(state: &DashboardState, out: &mut String) {
    let Some(apps) = state.catalog.apps() else {
        out.push_str(&format!("{}\n", "Loading applications...".dimmed()));
        return;
    };
    let rows: Vec<crate::commands::apps::AppRow> =
        apps.iter().map(crate::commands::apps::AppRow::from).collect();
    if rows.is_empty() {
        out.push_str(&format!("{}\n", "No applications detected".yellow()));
    } else {
        out.push_str(&render_table(&rows));
        out.push('\n');
    }
}

fn render_snapshot(state: &DashboardState, out: &mut String) {
    let table = &state.snapshot;
    if !table.is_loaded() {
        out.push_str(&format!("{}\n", "Loading snapshot...".dimmed()));
        return;
    }

    let sort = table.sort_state();
    let arrow = match sort.order {
        SortOrder::Asc => "↑",
        SortOrder::Desc => "↓",
    };
    let filter = table.filter();
    out.push_str(&format!(
        "{}  {}  {}\n",
        table.summary().bold(),
        format!("sorted by {} {}", sort.key.as_str(), arrow).dimmed(),
        format!(
            "filter: '{}' cpu≥{} mem≥{}",
            filter.search, filter.min_cpu, filter.min_memory
        )
        .dimmed()
    ));
    let rows: Vec<ProcessRow> = table
        .rows()
        .iter()
        .map(|entry| ProcessRow::new(entry, &state.settings.thresholds))
        .collect();
    out.push_str(&render_table(&rows));
    out.push('\n');
}

/// Machine-readable frame for `--format json`
#[derive(Serialize)]
struct JsonFrame<'a> {
    view: ViewMode,
    current_page: u32,
    displayed_items: usize,
    total_items: usize,
    summary: String,
    entries: &'a [pulse_lib::ProcessEntry],
    snapshot_rows: &'a [pulse_lib::ProcessEntry],
    apps: Vec<JsonApp<'a>>,
    search_results: &'a [pulse_lib::SearchEntry],
    selected: Option<usize>,
    notifications: Vec<&'a str>,
}

#[derive(Serialize)]
struct JsonApp<'a> {
    name: &'a str,
    icon: String,
}

impl<'a> From<&'a DashboardState> for JsonFrame<'a> {
    fn from(state: &'a DashboardState) -> Self {
        let pagination = state.feed.pagination();
        Self {
            view: state.view.active(),
            current_page: pagination.current_page,
            displayed_items: pagination.displayed_items,
            total_items: pagination.total_items,
            summary: pagination.summary(),
            entries: state.feed.entries(),
            snapshot_rows: state.snapshot.rows(),
            apps: state
                .catalog
                .apps()
                .unwrap_or_default()
                .iter()
                .map(|app| JsonApp {
                    name: &app.display_name,
                    icon: match app.avatar() {
                        Avatar::Logo(path) => path,
                        letter => format_avatar(&letter),
                    },
                })
                .collect(),
            search_results: state.search.results(),
            selected: state.search.selected(),
            notifications: state
                .notifications
                .visible()
                .map(|n| n.message.as_str())
                .collect(),
        }
    }
}

/// Run the live dashboard until `quit`, end of input or Ctrl-C
pub async fn run_watch(
    api: Arc<dyn MonitorApi>,
    store: Box<dyn SettingsStore>,
    logger: StructuredLogger,
    interval: Option<Duration>,
    format: OutputFormat,
) -> Result<()> {
    let mut controller = Controller::new(store, logger.clone());
    if let Some(interval) = interval {
        controller = controller.with_refresh_interval(interval);
    }

    let (tx, rx) = mpsc::channel(32);

    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if input_tx.send(command).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => print_error(&message),
            }
        }
        // end of input quits
        let _ = input_tx.send(Command::Quit).await;
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Command::Quit).await;
        }
    });

    let mut renderer = TerminalRenderer::new(format);
    Runtime::new(api, controller, logger)
        .run(rx, &mut renderer)
        .await;
    debug!(metrics = %PulseMetrics::new().render(), "Session metrics");
    Ok(())
}
