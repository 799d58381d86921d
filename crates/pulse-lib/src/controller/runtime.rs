//! Single cooperative event loop driving the controller
//!
//! Timer ticks, user commands and fetch completions are multiplexed with
//! `tokio::select!`. Fetches run concurrently on a `JoinSet`; their results
//! are only applied here, one at a time.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{Command, Completion, Controller, DashboardState, Effect, Fetch};
use crate::api::MonitorApi;
use crate::observability::{PulseMetrics, StructuredLogger};
use crate::scheduler::{PollingScheduler, Tick};

/// Draws the current state after every change
pub trait Renderer: Send {
    fn render(&mut self, state: &DashboardState);
}

/// Perform a fetch against the backend
pub async fn execute(api: &dyn MonitorApi, fetch: Fetch) -> Completion {
    let metrics = PulseMetrics::new();
    let started = Instant::now();

    let completion = match fetch {
        Fetch::DashboardPage { epoch, request } => Completion::DashboardPage {
            epoch,
            request,
            result: api.dashboard_page(request.page).await,
        },
        Fetch::Catalog { seq } => Completion::Catalog {
            seq,
            result: api.all_apps().await,
        },
        Fetch::SelfMonitor { seq } => Completion::SelfMonitor {
            seq,
            result: api.self_monitor().await,
        },
        Fetch::Snapshot { epoch, request } => {
            let result = api.snapshot(&request.filter).await;
            Completion::Snapshot {
                epoch,
                request,
                result,
            }
        }
        Fetch::SearchIndex => Completion::SearchIndex {
            result: api.process_search().await,
        },
        Fetch::Details { pid, seq } => Completion::Details {
            pid,
            seq,
            result: api.process_details(pid).await,
        },
    };

    metrics.observe_fetch_latency(started.elapsed());
    completion
}

pub struct Runtime {
    api: Arc<dyn MonitorApi>,
    controller: Controller,
    scheduler: PollingScheduler,
    ticks: mpsc::Receiver<Tick>,
    in_flight: JoinSet<Completion>,
    logger: StructuredLogger,
}

impl Runtime {
    pub fn new(api: Arc<dyn MonitorApi>, controller: Controller, logger: StructuredLogger) -> Self {
        let (scheduler, ticks) = PollingScheduler::new(64);
        Self {
            api,
            controller,
            scheduler,
            ticks,
            in_flight: JoinSet::new(),
            logger,
        }
    }

    /// Run until `Quit` arrives or the command channel closes.
    ///
    /// Returns the controller so callers can inspect the final state.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        renderer: &mut dyn Renderer,
    ) -> Controller {
        let effects = self.controller.startup();
        self.dispatch(effects);
        self.scheduler.start_self_monitor();
        renderer.render(self.controller.state());

        let reason = loop {
            tokio::select! {
                Some(tick) = self.ticks.recv() => {
                    self.controller.prune_notifications(Instant::now());
                    let effects = self.controller.on_tick(tick);
                    self.dispatch(effects);
                }
                command = commands.recv() => match command {
                    Some(Command::Quit) => break "quit",
                    None => break "input closed",
                    Some(command) => {
                        debug!(?command, "Command received");
                        let effects = self.controller.handle(command);
                        self.dispatch(effects);
                    }
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok(completion) => self.controller.apply(completion),
                        Err(e) => warn!(error = %e, "Fetch task failed"),
                    }
                }
            }
            renderer.render(self.controller.state());
        };

        self.scheduler.stop();
        self.in_flight.abort_all();
        self.logger.log_shutdown(reason);
        self.controller
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch(fetch) => {
                    debug!(endpoint = fetch.endpoint(), "Spawning fetch");
                    let api = Arc::clone(&self.api);
                    self.in_flight
                        .spawn(async move { execute(api.as_ref(), fetch).await });
                }
                Effect::RestartPolling(interval) => {
                    info!(
                        interval_ms = interval.as_millis() as u64,
                        "Applying refresh interval"
                    );
                    self.scheduler.restart(interval);
                }
            }
        }
    }
}
