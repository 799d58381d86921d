//! Observability for the dashboard client
//!
//! Provides:
//! - Prometheus metrics (polls, fetch failures, stale discards, fetch latency)
//! - Structured logging with tracing

use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

use crate::view::ViewMode;

/// Histogram buckets for backend round trips (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PulseMetricsInner> = OnceLock::new();

struct PulseMetricsInner {
    polls: IntCounterVec,
    fetch_failures: IntCounterVec,
    stale_discards: IntCounterVec,
    displayed_items: IntGauge,
    fetch_latency_seconds: Histogram,
}

impl PulseMetricsInner {
    fn new() -> Self {
        Self {
            polls: register_int_counter_vec!(
                "pulse_polls_total",
                "Timer-driven refreshes by target",
                &["target"]
            )
            .expect("Failed to register polls_total"),

            fetch_failures: register_int_counter_vec!(
                "pulse_fetch_failures_total",
                "Failed backend fetches by endpoint and error kind",
                &["endpoint", "kind"]
            )
            .expect("Failed to register fetch_failures_total"),

            stale_discards: register_int_counter_vec!(
                "pulse_stale_discards_total",
                "Responses dropped because a newer request or view superseded them",
                &["endpoint"]
            )
            .expect("Failed to register stale_discards_total"),

            displayed_items: register_int_gauge!(
                "pulse_displayed_items",
                "Process entries currently shown on the dashboard"
            )
            .expect("Failed to register displayed_items"),

            fetch_latency_seconds: register_histogram!(
                "pulse_fetch_latency_seconds",
                "Backend round trip time",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share them
#[derive(Clone)]
pub struct PulseMetrics {
    _private: (),
}

impl Default for PulseMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PulseMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PulseMetricsInner {
        GLOBAL_METRICS.get_or_init(PulseMetricsInner::new)
    }

    pub fn inc_poll(&self, target: &str) {
        self.inner().polls.with_label_values(&[target]).inc();
    }

    pub fn inc_fetch_failure(&self, endpoint: &str, kind: &str) {
        self.inner()
            .fetch_failures
            .with_label_values(&[endpoint, kind])
            .inc();
    }

    pub fn inc_stale_discard(&self, endpoint: &str) {
        self.inner().stale_discards.with_label_values(&[endpoint]).inc();
    }

    pub fn set_displayed_items(&self, count: usize) {
        self.inner().displayed_items.set(count as i64);
    }

    pub fn observe_fetch_latency(&self, elapsed: Duration) {
        self.inner()
            .fetch_latency_seconds
            .observe(elapsed.as_secs_f64());
    }

    /// Prometheus text exposition of everything registered so far
    pub fn render(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for dashboard events
#[derive(Clone)]
pub struct StructuredLogger {
    api_url: String,
}

impl StructuredLogger {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn log_startup(&self, version: &str, refresh_interval: Duration) {
        info!(
            event = "client_started",
            api_url = %self.api_url,
            client_version = %version,
            refresh_interval_ms = refresh_interval.as_millis() as u64,
            "System pulse client started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "client_shutdown",
            api_url = %self.api_url,
            reason = %reason,
            "System pulse client shutting down"
        );
    }

    pub fn log_poll(&self, target: &str, skipped: bool) {
        info!(
            event = "poll",
            target = %target,
            skipped = skipped,
            "Timer refresh"
        );
    }

    pub fn log_fetch_failure(&self, endpoint: &str, kind: &str, error: &str) {
        warn!(
            event = "fetch_failed",
            api_url = %self.api_url,
            endpoint = %endpoint,
            kind = %kind,
            error = %error,
            "Backend fetch failed"
        );
    }

    pub fn log_stale_discard(&self, endpoint: &str, seq: u64) {
        info!(
            event = "stale_discarded",
            endpoint = %endpoint,
            seq = seq,
            "Discarded superseded response"
        );
    }

    pub fn log_view_switch(&self, from: ViewMode, to: ViewMode, epoch: u64) {
        info!(
            event = "view_switched",
            from = %from,
            to = %to,
            epoch = epoch,
            "Switched view"
        );
    }

    pub fn log_settings_saved(&self, refresh_interval: Duration, persisted: bool) {
        if persisted {
            info!(
                event = "settings_saved",
                refresh_interval_ms = refresh_interval.as_millis() as u64,
                "Settings saved"
            );
        } else {
            warn!(
                event = "settings_save_failed",
                refresh_interval_ms = refresh_interval.as_millis() as u64,
                "Settings applied for this session but could not be persisted"
            );
        }
    }
}
