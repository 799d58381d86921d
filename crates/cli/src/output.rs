//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use pulse_lib::catalog::Avatar;
use pulse_lib::notify::{Notification, NotificationLevel};
use pulse_lib::threshold::{format_memory, EntryHealth};
use pulse_lib::{ProcessEntry, Severity, ThresholdConfig};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            println!("{}", render_table(items));
        }
        OutputFormat::Json => print_json(&items),
    }
}

pub fn render_table<T: Tabled>(items: &[T]) -> String {
    Table::new(items).with(Style::rounded()).to_string()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Color text by severity
pub fn color_severity(text: &str, severity: Severity) -> String {
    match severity {
        Severity::Healthy => text.green().to_string(),
        Severity::Caution => text.yellow().to_string(),
        Severity::Critical => text.red().to_string(),
    }
}

/// Ten-cell bar for a 0-100 fill
pub fn bar(percent: f64, severity: Severity) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 10.0).round()) as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));
    match severity {
        Severity::Healthy => bar.cyan().to_string(),
        Severity::Caution => bar.yellow().to_string(),
        Severity::Critical => bar.red().to_string(),
    }
}

pub fn format_notification(notification: &Notification) -> String {
    match notification.level {
        NotificationLevel::Info => format!("{} {}", "ℹ".blue().bold(), notification.message),
        NotificationLevel::Success => format!("{} {}", "✓".green().bold(), notification.message),
        NotificationLevel::Warning => format!("{} {}", "⚠".yellow().bold(), notification.message),
        NotificationLevel::Error => format!("{} {}", "✗".red().bold(), notification.message),
    }
}

pub fn format_avatar(avatar: &Avatar) -> String {
    match avatar {
        Avatar::Logo(path) => path.clone(),
        Avatar::Letter { letter, palette } => format!("[{}] palette {}", letter, palette),
    }
}

/// Row for process tables
#[derive(Tabled, Serialize)]
pub struct ProcessRow {
    #[tabled(rename = "PID")]
    pub pid: u32,
    #[tabled(rename = "Process")]
    pub name: String,
    #[tabled(rename = "CPU")]
    pub cpu: String,
    #[tabled(rename = "RAM")]
    pub memory: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "In")]
    pub incoming: u32,
    #[tabled(rename = "Out")]
    pub outgoing: u32,
}

impl ProcessRow {
    /// Bars and colours are added only when `colored` would emit them, so
    /// piped or `NO_COLOR` output stays plain
    pub fn new(entry: &ProcessEntry, thresholds: &ThresholdConfig) -> Self {
        let health: EntryHealth = thresholds.assess(entry);
        let cpu = format!("{:.1}%", entry.cpu_percent);
        let memory = format_memory(entry.memory_mb);
        let status = health.worst().label().to_string();

        let (cpu, memory, status) = if colored::control::SHOULD_COLORIZE.should_colorize() {
            (
                format!("{} {}", bar(health.cpu_bar, health.cpu), color_severity(&cpu, health.cpu)),
                format!("{} {}", bar(health.ram_bar, health.ram), color_severity(&memory, health.ram)),
                color_severity(&status, health.worst()),
            )
        } else {
            (cpu, memory, status)
        };

        Self {
            pid: entry.pid,
            name: entry.name.clone(),
            cpu,
            memory,
            status,
            incoming: entry.incoming_connections,
            outgoing: entry.outgoing_connections,
        }
    }
}
