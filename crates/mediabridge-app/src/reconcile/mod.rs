//! Reconciliation of tool queues against the durable request records.
//!
//! Each step is an independent unit: [`MovieQueueProcessor`], [`SeriesQueueProcessor`],
//! [`StuckMediaSweeper`] and [`LibrarySync`]. [`ReconcileEngine`] drives them on two
//! timers.
//!
//! Steps classify failures with [`CycleError`]: an external failure ends the step for
//! this cycle and is logged there, a persistence failure propagates to the loop guard.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use mediabridge_core::{
    DiscoveryRefresher, InventoryStore, MovieAcquisition, RequestStore, SeriesAcquisition,
    StuckPolicy, TorrentHealthSource,
};
use mediabridge_telemetry::ReconcileMetrics;

mod driver;
mod library;
mod movies;
mod remediation;
mod series;
mod sweeper;

pub use driver::{CycleReport, LoopHandles, MaintenanceReport, ReconcileEngine};
pub use library::LibrarySync;
pub use movies::{MovieCycle, MovieQueueProcessor};
pub use series::{SeriesCycle, SeriesQueueProcessor};
pub use sweeper::{StuckMediaSweeper, SweepOutcome};

/// Collaborators shared by every reconciliation step.
#[derive(Clone)]
pub struct ReconcileDeps {
    /// Movie acquisition tool.
    pub movies: Arc<dyn MovieAcquisition>,
    /// Series acquisition tool.
    pub series: Arc<dyn SeriesAcquisition>,
    /// Torrent client health source.
    pub torrents: Arc<dyn TorrentHealthSource>,
    /// Download request store.
    pub requests: Arc<dyn RequestStore>,
    /// Inventory snapshot store.
    pub inventory: Arc<dyn InventoryStore>,
    /// Optional discovery cache refresher run on the maintenance timer.
    pub discovery: Option<Arc<dyn DiscoveryRefresher>>,
    /// Metrics registry.
    pub metrics: ReconcileMetrics,
}

/// Tunables for the reconciliation steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOptions {
    /// Thresholds for stuck transfer detection.
    pub stuck: StuckPolicy,
    /// Age after which a `downloading` request is force-completed.
    pub stale_after: chrono::Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            stuck: StuckPolicy::default(),
            stale_after: chrono::Duration::minutes(2),
        }
    }
}

/// Failure of one reconciliation step.
#[derive(Debug)]
pub enum CycleError {
    /// An acquisition tool or the torrent client failed, or a setting was missing.
    External {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying error.
        source: anyhow::Error,
    },
    /// Reading or writing the request store failed.
    Persistence {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying error.
        source: anyhow::Error,
    },
}

impl CycleError {
    /// Operation that failed.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::External { operation, .. } | Self::Persistence { operation, .. } => *operation,
        }
    }
}

impl Display for CycleError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::External { .. } => formatter.write_str("external call failed"),
            Self::Persistence { .. } => formatter.write_str("persistence failed"),
        }
    }
}

impl Error for CycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::External { source, .. } | Self::Persistence { source, .. } => {
                Some(source.as_ref())
            }
        }
    }
}

pub(crate) fn external(operation: &'static str) -> impl FnOnce(anyhow::Error) -> CycleError {
    move |source| CycleError::External { operation, source }
}

pub(crate) fn persistence(operation: &'static str) -> impl FnOnce(anyhow::Error) -> CycleError {
    move |source| CycleError::Persistence { operation, source }
}

/// End a step quietly on external failure; persistence failures still propagate.
pub(crate) fn absorb_external<T: Default>(
    step: &'static str,
    result: Result<T, CycleError>,
) -> Result<T, CycleError> {
    match result {
        Err(CycleError::External { operation, source }) => {
            tracing::warn!(step, operation, error = %format!("{source:#}"), "step ended early");
            Ok(T::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn external_failures_are_absorbed() {
        let result: Result<usize, _> = Err(external("radarr.fetch_queue")(anyhow!("timeout")));
        assert_eq!(absorb_external("poll_movies", result).expect("absorbed"), 0);
    }

    #[test]
    fn persistence_failures_propagate() {
        let result: Result<usize, _> =
            Err(persistence("requests.save_batch")(anyhow!("connection reset")));
        let err = absorb_external("poll_movies", result).expect_err("propagated");
        assert_eq!(err.operation(), "requests.save_batch");
        assert_eq!(err.to_string(), "persistence failed");
        assert!(err.source().is_some());
    }
}
