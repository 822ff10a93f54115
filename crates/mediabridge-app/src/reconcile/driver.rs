//! The two reconciliation timers: a short poll loop and a long maintenance loop.
//!
//! Every task runs under its own `reconcile` span and is guarded individually, so one
//! failing step never keeps the others (or the next tick) from running. Each tick runs
//! in its own spawned task; a panic is logged and counted, and the loop carries on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mediabridge_core::DiscoveryRefresher;
use mediabridge_telemetry::{ReconcileMetrics, cycle_span};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{Instrument, error, info};

use super::library::LibrarySync;
use super::movies::{MovieCycle, MovieQueueProcessor};
use super::series::{SeriesCycle, SeriesQueueProcessor};
use super::sweeper::{StuckMediaSweeper, SweepOutcome};
use super::{ReconcileDeps, ReconcileOptions};

const POLL_MOVIES: &str = "poll_movies";
const POLL_SERIES: &str = "poll_series";
const SWEEP: &str = "sweep_stuck";
const SYNC_MOVIES: &str = "sync_movies";
const SYNC_SHOWS: &str = "sync_shows";
const REFRESH_DISCOVERY: &str = "refresh_discovery";

/// Result of one poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Movie pass result, `None` when it failed.
    pub movies: Option<MovieCycle>,
    /// Series pass result, `None` when it failed.
    pub series: Option<SeriesCycle>,
    /// Sweep result, `None` when it failed.
    pub sweep: Option<SweepOutcome>,
    /// Tasks that failed this tick.
    pub failed: Vec<&'static str>,
}

/// Result of one maintenance tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Movie rows written, `None` when the sync failed.
    pub movies: Option<usize>,
    /// Show rows written, `None` when the sync failed.
    pub shows: Option<usize>,
    /// Whether the discovery cache was refreshed.
    pub discovery_refreshed: bool,
    /// Tasks that failed this tick.
    pub failed: Vec<&'static str>,
}

/// Join handles of the spawned loops.
pub struct LoopHandles {
    /// Poll loop task.
    pub poll: JoinHandle<()>,
    /// Maintenance loop task.
    pub maintenance: JoinHandle<()>,
}

impl LoopHandles {
    /// Wait for both loops to stop.
    ///
    /// # Errors
    ///
    /// Returns the loop name and join error if either task panicked or was aborted.
    pub async fn join(self) -> Result<(), (&'static str, JoinError)> {
        let (poll, maintenance) = tokio::join!(self.poll, self.maintenance);
        poll.map_err(|err| ("poll", err))?;
        maintenance.map_err(|err| ("maintenance", err))?;
        Ok(())
    }
}

/// Drives the reconciliation steps on their timers.
pub struct ReconcileEngine {
    movies: MovieQueueProcessor,
    series: SeriesQueueProcessor,
    sweeper: StuckMediaSweeper,
    library: LibrarySync,
    discovery: Option<Arc<dyn DiscoveryRefresher>>,
    metrics: ReconcileMetrics,
}

impl ReconcileEngine {
    /// Wire every step over `deps`.
    #[must_use]
    pub fn new(deps: ReconcileDeps, options: ReconcileOptions) -> Self {
        let library = LibrarySync::new(
            Arc::clone(&deps.movies),
            Arc::clone(&deps.series),
            Arc::clone(&deps.inventory),
            deps.metrics.clone(),
        );
        let movies = MovieQueueProcessor::new(&deps, library.clone(), options.stuck);
        let series = SeriesQueueProcessor::new(&deps, library.clone(), options.stuck);
        let sweeper = StuckMediaSweeper::new(
            Arc::clone(&deps.requests),
            library.clone(),
            deps.metrics.clone(),
            options.stale_after,
        );
        Self {
            movies,
            series,
            sweeper,
            library,
            discovery: deps.discovery,
            metrics: deps.metrics,
        }
    }

    /// One poll tick: movies, then series, then the sweep.
    pub async fn poll_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut failed = Vec::new();
        let movies = self
            .guarded(POLL_MOVIES, &mut failed, self.movies.run(now))
            .await;
        let series = self
            .guarded(POLL_SERIES, &mut failed, self.series.run(now))
            .await;
        let sweep = self
            .guarded(SWEEP, &mut failed, self.sweeper.sweep(now))
            .await;
        CycleReport {
            movies,
            series,
            sweep,
            failed,
        }
    }

    /// One maintenance tick: both inventory syncs, then the discovery refresh.
    pub async fn maintenance_cycle(&self) -> MaintenanceReport {
        let mut failed = Vec::new();
        let movies = self
            .guarded(SYNC_MOVIES, &mut failed, self.library.sync_movies())
            .await;
        let shows = self
            .guarded(SYNC_SHOWS, &mut failed, self.library.sync_shows())
            .await;
        let mut discovery_refreshed = false;
        if let Some(discovery) = &self.discovery {
            discovery_refreshed = self
                .guarded(REFRESH_DISCOVERY, &mut failed, discovery.refresh())
                .await
                .is_some();
        }
        MaintenanceReport {
            movies,
            shows,
            discovery_refreshed,
            failed,
        }
    }

    /// Start both loops on the current runtime.
    pub fn spawn(
        self: &Arc<Self>,
        poll_interval: Duration,
        maintenance_interval: Duration,
        shutdown: &watch::Receiver<bool>,
    ) -> LoopHandles {
        LoopHandles {
            poll: tokio::spawn(Arc::clone(self).run_poll_loop(poll_interval, shutdown.clone())),
            maintenance: tokio::spawn(
                Arc::clone(self).run_maintenance_loop(maintenance_interval, shutdown.clone()),
            ),
        }
    }

    /// Run [`Self::poll_cycle`] every `period` until `shutdown` flips to `true`.
    pub async fn run_poll_loop(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "poll loop started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }
            let engine = Arc::clone(&self);
            let cycle = tokio::spawn(async move {
                engine.poll_cycle(Utc::now()).await;
            });
            self.settle("poll", cycle).await;
        }
        info!("poll loop stopped");
    }

    /// Run [`Self::maintenance_cycle`] at start-up and every `period` after, until
    /// `shutdown` flips to `true`.
    pub async fn run_maintenance_loop(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "maintenance loop started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }
            let engine = Arc::clone(&self);
            let cycle = tokio::spawn(async move {
                engine.maintenance_cycle().await;
            });
            self.settle("maintenance", cycle).await;
        }
        info!("maintenance loop stopped");
    }

    async fn settle(&self, cycle: &'static str, handle: JoinHandle<()>) {
        if let Err(err) = handle.await {
            self.metrics.inc_failure(cycle);
            error!(cycle, error = %err, "reconcile cycle did not finish");
        }
    }

    async fn guarded<T, E>(
        &self,
        task: &'static str,
        failed: &mut Vec<&'static str>,
        step: impl Future<Output = Result<T, E>>,
    ) -> Option<T>
    where
        E: Into<anyhow::Error>,
    {
        self.metrics.inc_cycle(task);
        let span = cycle_span(task);
        match step.instrument(span.clone()).await {
            Ok(value) => Some(value),
            Err(err) => {
                let err: anyhow::Error = err.into();
                self.metrics.inc_failure(task);
                span.in_scope(|| error!(task, error = %format!("{err:#}"), "reconcile task failed"));
                failed.push(task);
                None
            }
        }
    }
}
