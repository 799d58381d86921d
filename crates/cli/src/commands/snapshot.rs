//! One-shot snapshot command

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use pulse_lib::snapshot::{SnapshotFilter, SnapshotOutcome, SnapshotTable, SortKey, SortOrder};
use pulse_lib::{MonitorApi, ThresholdConfig};

use crate::output::{print_success, print_table, OutputFormat, ProcessRow};

/// Fetch a filtered snapshot, apply the requested sorts and print or export it.
///
/// `export` of `-` writes the CSV to stdout; a directory receives the dated
/// file name; anything else is used as the file path.
pub async fn show_snapshot(
    api: &dyn MonitorApi,
    filter: SnapshotFilter,
    sorts: &[SortKey],
    export: Option<&Path>,
    thresholds: &ThresholdConfig,
    format: OutputFormat,
) -> Result<()> {
    let mut table = SnapshotTable::new();
    let request = table.begin_filter(filter);
    let response = api
        .snapshot(&request.filter)
        .await
        .context("Failed to load snapshot")?;
    match table.complete(&request, Ok(response)) {
        SnapshotOutcome::Rendered { .. } => {}
        other => anyhow::bail!("Snapshot response was not applied: {:?}", other),
    }

    for key in sorts {
        table.sort(*key);
    }

    if let Some(target) = export {
        return export_table(&table, target);
    }

    match format {
        OutputFormat::Json => crate::output::print_json(table.rows()),
        OutputFormat::Table => {
            let sort = table.sort_state();
            let arrow = match sort.order {
                SortOrder::Asc => "↑",
                SortOrder::Desc => "↓",
            };
            println!(
                "{}  {}",
                table.summary().bold(),
                format!("sorted by {} {}", sort.key.as_str(), arrow).dimmed()
            );
            let rows: Vec<ProcessRow> = table
                .rows()
                .iter()
                .map(|entry| ProcessRow::new(entry, thresholds))
                .collect();
            print_table(&rows, format);
        }
    }
    Ok(())
}

fn export_table(table: &SnapshotTable, target: &Path) -> Result<()> {
    if target == Path::new("-") {
        print!("{}", table.export_csv()?);
        return Ok(());
    }

    let path = if target.is_dir() {
        table.write_csv(target, chrono::Local::now().date_naive())?
    } else {
        let csv = table.export_csv()?;
        std::fs::write(target, csv)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        target.to_path_buf()
    };
    print_success(&format!("Exported {} rows to {}", table.rows().len(), path.display()));
    Ok(())
}
