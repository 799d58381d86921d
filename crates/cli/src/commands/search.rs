//! Process search and detail commands

use anyhow::Result;
use colored::Colorize;
use pulse_lib::search::{Autocomplete, MAX_SUGGESTIONS};
use pulse_lib::{ClientError, MonitorApi, SearchEntry};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_json, print_table, print_warning, render_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct MatchRow {
    #[tabled(rename = "PID")]
    pid: u32,
    #[tabled(rename = "Process")]
    name: String,
}

impl From<&SearchEntry> for MatchRow {
    fn from(entry: &SearchEntry) -> Self {
        Self {
            pid: entry.pid,
            name: entry.name.clone(),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Print up to ten processes matching `query` by name or pid
pub async fn search_processes(api: &dyn MonitorApi, query: &str, format: OutputFormat) -> Result<()> {
    let mut autocomplete = Autocomplete::new();
    autocomplete.build_cache(api.process_search().await?);
    autocomplete.on_input(query);

    let rows: Vec<MatchRow> = autocomplete.results().iter().map(MatchRow::from).collect();
    if rows.is_empty() && matches!(format, OutputFormat::Table) {
        print_warning(&format!("No processes match '{}'", query.trim()));
        return Ok(());
    }
    print_table(&rows, format);
    if rows.len() == MAX_SUGGESTIONS && matches!(format, OutputFormat::Table) {
        println!("{}", "Showing the first 10 matches; refine the query for more".dimmed());
    }
    Ok(())
}

/// Print the detail record for `pid`
pub async fn show_details(api: &dyn MonitorApi, pid: u32, format: OutputFormat) -> Result<()> {
    let details = match api.process_details(pid).await {
        Ok(details) => details,
        Err(ClientError::NotFound { pid }) => {
            print_warning(&format!("Process {} is no longer running", pid));
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&details),
        OutputFormat::Table => {
            let title = details.name().unwrap_or("process");
            println!("{} {}", title.bold(), format!("(pid {})", pid).dimmed());
            let rows: Vec<FieldRow> = details
                .fields
                .iter()
                .map(|(field, value)| FieldRow {
                    field: field.clone(),
                    value: match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                })
                .collect();
            println!("{}", render_table(&rows));
        }
    }
    Ok(())
}
