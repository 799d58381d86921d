//! Backend access
//!
//! [`MonitorApi`] is the seam between the controller and the monitoring
//! backend. The HTTP implementation decodes every body through its
//! [`Schema`](crate::models::Schema) before handing it back.

mod http;

pub use http::{HttpMonitorApi, DEFAULT_TIMEOUT};

use async_trait::async_trait;

use crate::error::{ClientError, DecodeError};
use crate::models::{
    AppCatalog, DashboardPage, ProcessDetails, Schema, SearchEntry, SelfMonitorReport,
    SnapshotResponse,
};
use crate::snapshot::SnapshotFilter;

/// Endpoints consumed by the dashboard
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// One page of the activity-ordered process feed
    async fn dashboard_page(&self, page: u32) -> Result<DashboardPage, ClientError>;

    async fn all_apps(&self) -> Result<AppCatalog, ClientError>;

    async fn self_monitor(&self) -> Result<SelfMonitorReport, ClientError>;

    async fn snapshot(&self, filter: &SnapshotFilter) -> Result<SnapshotResponse, ClientError>;

    /// Full searchable `{pid, name}` list
    async fn process_search(&self) -> Result<Vec<SearchEntry>, ClientError>;

    /// Fails with [`ClientError::NotFound`] once the process has exited
    async fn process_details(&self, pid: u32) -> Result<ProcessDetails, ClientError>;
}

/// Parse and validate a response body
pub fn decode<T: Schema>(body: &str) -> Result<T, DecodeError> {
    let value: T = serde_json::from_str(body).map_err(|source| DecodeError::Json {
        endpoint: T::ENDPOINT,
        source,
    })?;

    value
        .validate()
        .map_err(|violation| DecodeError::InvalidField {
            endpoint: T::ENDPOINT,
            field: violation.field,
            reason: violation.reason,
        })?;

    Ok(value)
}
