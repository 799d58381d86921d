//! Client library for the System Pulse process dashboard
//!
//! This crate provides:
//! - A typed, validating client for the monitoring backend
//! - Threshold classification of CPU and RAM usage
//! - The paginated dashboard feed, snapshot table and search autocomplete
//! - A controller and event loop tying polling, views and settings together

pub mod api;
pub mod catalog;
pub mod controller;
pub mod error;
pub mod feed;
pub mod fence;
pub mod models;
pub mod notify;
pub mod observability;
pub mod scheduler;
pub mod search;
pub mod self_monitor;
pub mod settings;
pub mod snapshot;
pub mod threshold;
pub mod view;

pub use api::{HttpMonitorApi, MonitorApi};
pub use controller::runtime::{Renderer, Runtime};
pub use controller::{Command, Controller, DashboardState};
pub use error::{ClientError, DecodeError, ExportError, SettingsError};
pub use models::*;
pub use observability::{PulseMetrics, StructuredLogger};
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};
pub use threshold::{classify, Severity, ThresholdConfig};
pub use view::ViewMode;
