//! System Pulse CLI
//!
//! A terminal front-end for the process dashboard: a live view driven by
//! the polling controller, plus one-shot snapshot, search and settings
//! commands.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::settings::SettingsUpdate;
use commands::{apps, search, settings, snapshot, watch};
use pulse_lib::snapshot::{SnapshotFilter, SortKey};
use pulse_lib::{HttpMonitorApi, Settings, StructuredLogger};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, PulseConfig};

/// System Pulse CLI
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author, version, about = "Live process dashboard for System Pulse", long_about = None)]
pub struct Cli {
    /// Backend URL (defaults to PULSE_API_URL, then http://localhost:8000)
    #[arg(long, env = "PULSE_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Log format on stderr (defaults to PULSE_LOG_FORMAT, then plain)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the live dashboard, reading commands from stdin
    Watch {
        /// Refresh interval in seconds for this session
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show a filtered, sorted process snapshot
    Snapshot {
        /// Name filter
        #[arg(long, default_value = "")]
        search: String,

        /// Minimum CPU percent
        #[arg(long, default_value_t = 0.0)]
        min_cpu: f64,

        /// Minimum memory in MB
        #[arg(long, default_value_t = 0.0)]
        min_memory: f64,

        /// Sort column (name, cpu, memory, incoming, outgoing, pid); repeat to toggle
        #[arg(long)]
        sort: Vec<SortKey>,

        /// Write CSV to this file or directory, or `-` for stdout
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Search processes by name or pid
    Search {
        /// Text to match
        query: String,
    },

    /// Show details for a process
    Details {
        /// Process id
        pid: u32,
    },

    /// List detected applications
    Apps,

    /// View or change persisted dashboard settings
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Change thresholds or the refresh interval
    Set {
        /// CPU percent for caution
        #[arg(long)]
        cpu_yellow: Option<f64>,

        /// CPU percent for critical
        #[arg(long)]
        cpu_red: Option<f64>,

        /// RAM percent for caution
        #[arg(long)]
        ram_yellow: Option<f64>,

        /// RAM percent for critical
        #[arg(long)]
        ram_red: Option<f64>,

        /// Refresh interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Restore default settings
    Reset,
}

fn run_settings(
    command: SettingsCommands,
    config: &PulseConfig,
    format: output::OutputFormat,
) -> Result<()> {
    let mut store = config.settings_store()?;
    match command {
        SettingsCommands::Show => settings::show_settings(&store, format),
        SettingsCommands::Set {
            cpu_yellow,
            cpu_red,
            ram_yellow,
            ram_red,
            interval,
        } => {
            let update = SettingsUpdate {
                cpu_yellow,
                cpu_red,
                ram_yellow,
                ram_red,
                interval_secs: interval,
            };
            settings::set_settings(&mut store, update, format)
        }
        SettingsCommands::Reset => settings::reset_settings(&mut store, format),
    }
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Plain => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = PulseConfig::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    init_tracing(cli.log_format.unwrap_or(config.log_format), cli.verbose);
    info!(api_url = %config.api_url, "Configuration loaded");

    // Settings commands never touch the backend
    let command = match cli.command {
        Commands::Settings(settings_cmd) => {
            return run_settings(settings_cmd, &config, cli.format);
        }
        other => other,
    };

    // Initialize client
    let api = Arc::new(HttpMonitorApi::new(&config.api_url, config.request_timeout())?);
    let logger = StructuredLogger::new(&config.api_url);

    // Execute command
    match command {
        Commands::Watch { interval } => {
            let store = config.settings_store()?;
            watch::run_watch(
                api,
                Box::new(store),
                logger,
                interval.map(Duration::from_secs),
                cli.format,
            )
            .await?;
        }
        Commands::Snapshot {
            search,
            min_cpu,
            min_memory,
            sort,
            export,
        } => {
            let thresholds = Settings::load(&config.settings_store()?).thresholds;
            let filter = SnapshotFilter {
                search,
                min_cpu,
                min_memory,
            };
            snapshot::show_snapshot(
                api.as_ref(),
                filter,
                &sort,
                export.as_deref(),
                &thresholds,
                cli.format,
            )
            .await?;
        }
        Commands::Search { query } => {
            search::search_processes(api.as_ref(), &query, cli.format).await?;
        }
        Commands::Details { pid } => {
            search::show_details(api.as_ref(), pid, cli.format).await?;
        }
        Commands::Apps => {
            apps::list_apps(api.as_ref(), cli.format).await?;
        }
        Commands::Settings(_) => {}
    }

    Ok(())
}
