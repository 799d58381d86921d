//! Polling timers for the dashboard feed and the self-monitor panel
//!
//! Each timer is a spawned task that pushes [`Tick`]s into the event loop's
//! channel. Only the dashboard timer is reconfigurable; at most one of each
//! is alive at any time.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Fixed self-monitor poll period
pub const SELF_MONITOR_INTERVAL: Duration = Duration::from_millis(5000);

/// Timer events delivered to the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    DashboardRefresh,
    SelfMonitorRefresh,
}

/// Owns the timer tasks; dropping it stops them
#[derive(Debug)]
pub struct PollingScheduler {
    tx: mpsc::Sender<Tick>,
    dashboard: Option<(Duration, JoinHandle<()>)>,
    self_monitor: Option<JoinHandle<()>>,
}

impl PollingScheduler {
    /// Create a scheduler and the receiver its ticks arrive on
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                tx,
                dashboard: None,
                self_monitor: None,
            },
            rx,
        )
    }

    /// Period of the live dashboard timer, if any
    pub fn interval(&self) -> Option<Duration> {
        self.dashboard.as_ref().map(|(period, _)| *period)
    }

    pub fn is_running(&self) -> bool {
        self.dashboard.is_some()
    }

    /// Start the dashboard timer, cancelling any existing one.
    ///
    /// The first tick fires one full period from now.
    pub fn start(&mut self, period: Duration) {
        if let Some((_, handle)) = self.dashboard.take() {
            handle.abort();
        }

        info!(
            event = "polling_started",
            interval_ms = period.as_millis() as u64,
            "Starting dashboard refresh timer"
        );
        let handle = spawn_ticker(self.tx.clone(), period, Tick::DashboardRefresh);
        self.dashboard = Some((period, handle));
    }

    /// Apply a new interval. Restarting with the running interval is a no-op.
    pub fn restart(&mut self, period: Duration) {
        if self.interval() == Some(period) {
            debug!(
                interval_ms = period.as_millis() as u64,
                "Refresh interval unchanged, keeping timer"
            );
            return;
        }
        self.start(period);
    }

    /// Start the fixed self-monitor timer if it is not already running
    pub fn start_self_monitor(&mut self) {
        if self.self_monitor.is_some() {
            return;
        }
        self.self_monitor = Some(spawn_ticker(
            self.tx.clone(),
            SELF_MONITOR_INTERVAL,
            Tick::SelfMonitorRefresh,
        ));
    }

    /// Cancel both timers
    pub fn stop(&mut self) {
        if let Some((_, handle)) = self.dashboard.take() {
            handle.abort();
        }
        if let Some(handle) = self.self_monitor.take() {
            handle.abort();
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_ticker(tx: mpsc::Sender<Tick>, period: Duration, tick: Tick) -> JoinHandle<()> {
    let start = Instant::now() + period;
    tokio::spawn(async move {
        let mut ticker = interval_at(start, period);
        // A slow loop should see one refresh, not a burst of catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if tx.send(tick).await.is_err() {
                debug!(?tick, "Tick receiver dropped, stopping timer");
                break;
            }
        }
    })
}
