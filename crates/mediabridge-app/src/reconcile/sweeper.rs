//! Force-completion of requests the tools stopped reporting on.
//!
//! A transfer that finishes between two polls leaves the queue without the processors
//! ever observing `completed`, so its request stays `downloading` forever. Once such a
//! request has not been touched for `stale_after` it is treated as done.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mediabridge_core::{MediaKind, RequestBatch, RequestStatus, RequestStore};
use mediabridge_telemetry::ReconcileMetrics;
use tracing::{debug, info, warn};

use super::library::LibrarySync;
use super::{CycleError, persistence};

/// Requests force-completed by one sweep, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Movie requests.
    pub movies: usize,
    /// Episode requests.
    pub episodes: usize,
    /// Series requests whose episodes are all complete.
    pub series: usize,
}

/// Sweeps stale `downloading` requests to `completed`.
#[derive(Clone)]
pub struct StuckMediaSweeper {
    requests: Arc<dyn RequestStore>,
    library: LibrarySync,
    metrics: ReconcileMetrics,
    stale_after: Duration,
}

impl StuckMediaSweeper {
    /// Sweeper completing requests idle for longer than `stale_after`.
    #[must_use]
    pub fn new(
        requests: Arc<dyn RequestStore>,
        library: LibrarySync,
        metrics: ReconcileMetrics,
        stale_after: Duration,
    ) -> Self {
        Self {
            requests,
            library,
            metrics,
            stale_after,
        }
    }

    /// Run one sweep at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Persistence`] when the request store fails. Inventory
    /// resync failures are logged and do not fail the sweep.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepOutcome, CycleError> {
        let cutoff = now - self.stale_after;
        let mut batch = RequestBatch::default();
        let movies = self.sweep_kind(MediaKind::Movie, cutoff, now, &mut batch).await?;
        let episodes = self
            .sweep_kind(MediaKind::Episode, cutoff, now, &mut batch)
            .await?;
        self.requests
            .save_batch(&batch)
            .await
            .map_err(persistence("requests.save_batch"))?;

        if movies > 0
            && let Err(err) = self.library.sync_movies().await
        {
            warn!(error = %format!("{err:#}"), "movie inventory resync failed");
        }
        if episodes > 0
            && let Err(err) = self.library.sync_shows().await
        {
            warn!(error = %format!("{err:#}"), "show inventory resync failed");
        }

        // Runs against the saved state so episodes swept above count as complete.
        let series = self.finalize_series(now).await?;

        let outcome = SweepOutcome {
            movies,
            episodes,
            series,
        };
        if outcome == SweepOutcome::default() {
            debug!("no stale requests");
        } else {
            info!(movies, episodes, series, "stale requests completed");
        }
        Ok(outcome)
    }

    async fn sweep_kind(
        &self,
        kind: MediaKind,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        batch: &mut RequestBatch,
    ) -> Result<usize, CycleError> {
        let downloading = self
            .requests
            .list_by_status(kind, RequestStatus::Downloading)
            .await
            .map_err(persistence("requests.list_by_status"))?;
        let mut swept = 0;
        for mut request in downloading {
            if request.updated_at > cutoff {
                continue;
            }
            request.force_complete(now);
            debug!(request_id = request.id, %kind, "stale request completed");
            batch.upsert(request);
            swept += 1;
        }
        self.metrics.add_swept(kind.as_str(), swept);
        Ok(swept)
    }

    async fn finalize_series(&self, now: DateTime<Utc>) -> Result<usize, CycleError> {
        let downloading = self
            .requests
            .list_by_status(MediaKind::Series, RequestStatus::Downloading)
            .await
            .map_err(persistence("requests.list_by_status"))?;
        let mut batch = RequestBatch::default();
        for mut series in downloading {
            let Some(series_id) = series.identity.series_id() else {
                continue;
            };
            let episodes = self
                .requests
                .episodes_for_series(series_id)
                .await
                .map_err(persistence("requests.episodes_for_series"))?;
            let finished = !episodes.is_empty()
                && episodes
                    .iter()
                    .all(|episode| episode.progress.status == RequestStatus::Completed);
            if finished {
                series.force_complete(now);
                debug!(request_id = series.id, series_id, "series finalized");
                batch.upsert(series);
            }
        }
        let finalized = batch.updated.len();
        self.requests
            .save_batch(&batch)
            .await
            .map_err(persistence("requests.save_batch"))?;
        self.metrics.add_swept(MediaKind::Series.as_str(), finalized);
        Ok(finalized)
    }
}
