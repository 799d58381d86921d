//! HTTP client for the monitoring backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{decode, MonitorApi};
use crate::error::ClientError;
use crate::models::{
    AppCatalog, DashboardPage, ProcessDetails, ProcessSearchResponse, Schema, SearchEntry,
    SelfMonitorReport, SnapshotResponse,
};
use crate::snapshot::SnapshotFilter;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`MonitorApi`]
#[derive(Debug, Clone)]
pub struct HttpMonitorApi {
    client: Client,
    base_url: Url,
}

impl HttpMonitorApi {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid API URL '{}': {}", base_url, e))?;
        // Relative joins replace the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET `path` with `query` and decode the body as `T`
    async fn get<T: Schema>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(pid) = path
                .strip_prefix("api/process-details/")
                .and_then(|pid| pid.parse().ok())
            {
                return Err(ClientError::NotFound { pid });
            }
        }

        let body = response.text().await.map_err(|e| ClientError::Network {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode(&body)?)
    }
}

/// Millisecond timestamp so intermediaries never serve a cached page
fn cache_buster() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[async_trait]
impl MonitorApi for HttpMonitorApi {
    async fn dashboard_page(&self, page: u32) -> Result<DashboardPage, ClientError> {
        self.get(
            "api/dashboard",
            &[("page", page.to_string()), ("t", cache_buster())],
        )
        .await
    }

    async fn all_apps(&self) -> Result<AppCatalog, ClientError> {
        self.get("api/all-apps", &[]).await
    }

    async fn self_monitor(&self) -> Result<SelfMonitorReport, ClientError> {
        self.get("api/self-monitor", &[]).await
    }

    async fn snapshot(&self, filter: &SnapshotFilter) -> Result<SnapshotResponse, ClientError> {
        self.get("api/snapshot", &filter.query_pairs()).await
    }

    async fn process_search(&self) -> Result<Vec<SearchEntry>, ClientError> {
        let response: ProcessSearchResponse = self.get("api/process-search", &[]).await?;
        Ok(response.processes)
    }

    async fn process_details(&self, pid: u32) -> Result<ProcessDetails, ClientError> {
        let details: ProcessDetails = self
            .get(&format!("api/process-details/{}", pid), &[])
            .await?;
        if !details.found {
            return Err(ClientError::NotFound { pid });
        }
        Ok(details)
    }
}
