//! All-apps catalog command

use anyhow::Result;
use pulse_lib::{AppInfo, MonitorApi};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_avatar, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
pub struct AppRow {
    #[tabled(rename = "Application")]
    pub name: String,
    #[tabled(rename = "Executable")]
    pub exe_name: String,
    #[tabled(rename = "Icon")]
    pub icon: String,
}

impl From<&AppInfo> for AppRow {
    fn from(app: &AppInfo) -> Self {
        Self {
            name: app.display_name.clone(),
            exe_name: app.exe_name.clone(),
            icon: format_avatar(&app.avatar()),
        }
    }
}

/// List detected applications
pub async fn list_apps(api: &dyn MonitorApi, format: OutputFormat) -> Result<()> {
    let catalog = api.all_apps().await?;
    let rows: Vec<AppRow> = catalog.0.iter().map(AppRow::from).collect();
    print_table(&rows, format);
    Ok(())
}
