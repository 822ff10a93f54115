//! One reconciliation pass over the movie tool's queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mediabridge_core::{
    MediaKind, MovieAcquisition, MovieQueueRecord, RequestBatch, RequestProgress, RequestStatus,
    RequestStore, StuckPolicy, TorrentHealthSource, map_status, parse_minutes, percent,
};
use mediabridge_telemetry::ReconcileMetrics;
use tracing::{debug, info, warn};

use super::library::LibrarySync;
use super::remediation::{QueueTransfer, cull_stuck};
use super::{CycleError, ReconcileDeps, absorb_external, external, persistence};

const ACTIVE_STATUSES: [RequestStatus; 3] = [
    RequestStatus::Queued,
    RequestStatus::Downloading,
    RequestStatus::Warning,
];

/// What one movie pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovieCycle {
    /// Requests written.
    pub updated: usize,
    /// Queue entries removed as stuck.
    pub culled: usize,
    /// Requests that reached `completed` for the first time.
    pub completed: usize,
}

/// Reconciles movie requests against the movie tool's queue.
#[derive(Clone)]
pub struct MovieQueueProcessor {
    movies: Arc<dyn MovieAcquisition>,
    torrents: Arc<dyn TorrentHealthSource>,
    requests: Arc<dyn RequestStore>,
    library: LibrarySync,
    policy: StuckPolicy,
    metrics: ReconcileMetrics,
}

impl MovieQueueProcessor {
    /// Processor over the shared collaborators.
    #[must_use]
    pub fn new(deps: &ReconcileDeps, library: LibrarySync, policy: StuckPolicy) -> Self {
        Self {
            movies: Arc::clone(&deps.movies),
            torrents: Arc::clone(&deps.torrents),
            requests: Arc::clone(&deps.requests),
            library,
            policy,
            metrics: deps.metrics.clone(),
        }
    }

    /// Run one pass at `now`.
    ///
    /// Tool and torrent client failures end the pass and are logged here; the result
    /// is then an empty [`MovieCycle`].
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Persistence`] when the request store fails.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<MovieCycle, CycleError> {
        absorb_external("poll_movies", self.reconcile(now).await)
    }

    async fn reconcile(&self, now: DateTime<Utc>) -> Result<MovieCycle, CycleError> {
        self.movies
            .poke_refresh()
            .await
            .map_err(external("radarr.poke_refresh"))?;

        let active = self
            .requests
            .has_active(&[MediaKind::Movie], &ACTIVE_STATUSES)
            .await
            .map_err(persistence("requests.has_active"))?;
        if !active {
            debug!("no active movie requests");
            return Ok(MovieCycle::default());
        }

        let queue = self
            .movies
            .fetch_queue()
            .await
            .map_err(external("radarr.fetch_queue"))?;
        if queue.is_empty() {
            info!("movie queue is empty");
            return Ok(MovieCycle::default());
        }

        let transfers: Vec<QueueTransfer> = queue
            .iter()
            .map(|record| QueueTransfer {
                queue_id: record.queue_id,
                search_id: record.tool_movie_id,
                torrent_id: record.torrent_id.clone(),
            })
            .collect();
        let culled = cull_stuck(
            self.movies.as_ref(),
            self.torrents.as_ref(),
            &self.policy,
            &transfers,
            now,
            &self.metrics,
        )
        .await
        .map_err(external("movies.cull_stuck"))?;

        let mut batch = RequestBatch::default();
        let mut completed = 0;
        for record in queue.iter().filter(|record| !culled.contains(&record.queue_id)) {
            if self.apply(record, &mut batch, now).await? {
                completed += 1;
            }
        }

        let cycle = MovieCycle {
            updated: batch.updated.len(),
            culled: culled.len(),
            completed,
        };
        self.requests
            .save_batch(&batch)
            .await
            .map_err(persistence("requests.save_batch"))?;
        debug!(
            updated = cycle.updated,
            culled = cycle.culled,
            completed = cycle.completed,
            "movie queue reconciled"
        );

        if completed > 0
            && let Err(err) = self.library.sync_movies().await
        {
            warn!(error = %format!("{err:#}"), "movie inventory resync failed");
        }
        Ok(cycle)
    }

    /// Fold one queue record into the batch; returns whether it completed a request.
    async fn apply(
        &self,
        record: &MovieQueueRecord,
        batch: &mut RequestBatch,
        now: DateTime<Utc>,
    ) -> Result<bool, CycleError> {
        let movie_id = self
            .movies
            .catalog_id(record.tool_movie_id)
            .await
            .map_err(external("radarr.catalog_id"))?;
        let stored = self
            .requests
            .find_movie(movie_id)
            .await
            .map_err(persistence("requests.find_movie"))?;
        let Some(stored) = stored else {
            warn!(
                movie_id,
                tool_movie_id = record.tool_movie_id,
                "no movie request matches queue entry"
            );
            return Ok(false);
        };
        // A movie can sit in the queue more than once; build on the pending copy.
        let mut request = batch
            .updated
            .iter()
            .find(|pending| pending.id == stored.id)
            .cloned()
            .unwrap_or(stored);

        let progress = RequestProgress {
            status: map_status(record.status.as_deref()),
            percent: percent(record.size, record.size_left),
            minutes_left: parse_minutes(record.time_left.as_deref()),
        };
        request.record_tool_movie_id(record.tool_movie_id);
        let first_completion = request.observe(progress, now);
        if first_completion {
            info!(request_id = request.id, movie_id, "movie request completed");
        }
        batch.upsert(request);
        Ok(first_completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabridge_core::{MediaIdentity, MovieSnapshot};
    use mediabridge_test_support::fakes::{
        FakeMovieTool, FakeSeriesTool, FakeTorrentClient, MemoryInventory, MemoryRequestStore,
        ToolFailures,
    };
    use mediabridge_test_support::fixtures::{
        fixed_now, movie_queue_record, movie_request, stuck_health, with_progress,
    };

    struct Harness {
        tool: Arc<FakeMovieTool>,
        torrents: Arc<FakeTorrentClient>,
        store: Arc<MemoryRequestStore>,
        inventory: Arc<MemoryInventory>,
        processor: MovieQueueProcessor,
    }

    fn harness(store: MemoryRequestStore) -> Harness {
        let tool = Arc::new(FakeMovieTool::default());
        let torrents = Arc::new(FakeTorrentClient::default());
        let store = Arc::new(store);
        let inventory = Arc::new(MemoryInventory::default());
        let deps = ReconcileDeps {
            movies: tool.clone(),
            series: Arc::new(FakeSeriesTool::default()),
            torrents: torrents.clone(),
            requests: store.clone(),
            inventory: inventory.clone(),
            discovery: None,
            metrics: ReconcileMetrics::new().expect("metrics"),
        };
        let library = LibrarySync::new(
            deps.movies.clone(),
            deps.series.clone(),
            deps.inventory.clone(),
            deps.metrics.clone(),
        );
        let processor = MovieQueueProcessor::new(&deps, library, StuckPolicy::default());
        Harness {
            tool,
            torrents,
            store,
            inventory,
            processor,
        }
    }

    #[tokio::test]
    async fn queue_progress_is_recorded() {
        let now = fixed_now();
        let h = harness(MemoryRequestStore::with_requests([movie_request(1, 603, now)]));
        h.tool.map_catalog(12, 603).await;
        h.tool
            .set_queue(vec![movie_queue_record(12, 101, "Downloading", 1000, 250)])
            .await;

        let cycle = h.processor.run(now).await.expect("cycle");

        assert_eq!(cycle.updated, 1);
        let stored = h.store.get(1).await.expect("request");
        assert_eq!(stored.progress.status, RequestStatus::Downloading);
        assert_eq!(stored.progress.percent, 75);
        assert_eq!(stored.updated_at, now);
        assert_eq!(
            stored.identity,
            MediaIdentity::Movie {
                movie_id: 603,
                tool_movie_id: Some(12)
            }
        );
    }

    #[tokio::test]
    async fn no_active_requests_skips_the_queue() {
        let now = fixed_now();
        let done = with_progress(movie_request(1, 603, now), RequestStatus::Completed, 100, Some(0));
        let h = harness(MemoryRequestStore::with_requests([done]));

        assert_eq!(h.processor.run(now).await.expect("cycle"), MovieCycle::default());
        let calls = h.tool.calls().await;
        assert_eq!(calls.pokes, 1);
        assert_eq!(calls.queue_fetches, 0);
    }

    #[tokio::test]
    async fn unmatched_queue_entries_are_skipped() {
        let now = fixed_now();
        let h = harness(MemoryRequestStore::with_requests([movie_request(1, 603, now)]));
        h.tool.map_catalog(13, 999).await;
        h.tool
            .set_queue(vec![movie_queue_record(13, 102, "downloading", 1000, 0)])
            .await;

        let cycle = h.processor.run(now).await.expect("cycle");
        assert_eq!(cycle.updated, 0);
        assert_eq!(h.store.all().await.len(), 1);
        assert_eq!(h.store.get(1).await.expect("request").updated_at, now - chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn first_completion_refreshes_the_movie_inventory() {
        let now = fixed_now();
        let h = harness(MemoryRequestStore::with_requests([movie_request(1, 603, now)]));
        h.tool.map_catalog(12, 603).await;
        h.tool
            .set_queue(vec![movie_queue_record(12, 101, "completed", 1000, 0)])
            .await;
        h.tool
            .set_library(vec![MovieSnapshot {
                tool_movie_id: 12,
                title: "The Matrix".into(),
                has_file: true,
                tmdb_id: Some(603),
                ..MovieSnapshot::default()
            }])
            .await;

        let cycle = h.processor.run(now).await.expect("cycle");
        assert_eq!(cycle.completed, 1);
        assert_eq!(h.store.get(1).await.expect("request").completed_at, Some(now));
        assert_eq!(h.inventory.movies().await.len(), 1);

        // Already completed: no second resync.
        h.processor
            .run(now + chrono::Duration::seconds(15))
            .await
            .expect("cycle");
        assert_eq!(h.inventory.replacements().await, (1, 0));
        assert_eq!(h.store.get(1).await.expect("request").completed_at, Some(now));
    }

    #[tokio::test]
    async fn stuck_entries_are_culled_and_not_updated() {
        let now = fixed_now();
        let h = harness(MemoryRequestStore::with_requests([movie_request(1, 603, now)]));
        h.tool.map_catalog(12, 603).await;
        h.tool
            .set_queue(vec![movie_queue_record(12, 101, "downloading", 1000, 900)])
            .await;
        h.torrents.set_records(vec![stuck_health("hash101", now)]).await;

        let cycle = h.processor.run(now).await.expect("cycle");
        assert_eq!(cycle.culled, 1);
        assert_eq!(cycle.updated, 0);
        let calls = h.tool.calls().await;
        assert_eq!(calls.removed, vec![101]);
        assert_eq!(calls.searches, vec![vec![12]]);
        assert_eq!(calls.lookups, 0);
    }

    #[tokio::test]
    async fn tool_failures_end_the_pass_without_error() {
        let now = fixed_now();
        let h = harness(MemoryRequestStore::with_requests([movie_request(1, 603, now)]));
        h.tool
            .set_failures(ToolFailures {
                queue: true,
                ..ToolFailures::default()
            })
            .await;

        assert_eq!(h.processor.run(now).await.expect("absorbed"), MovieCycle::default());
        assert_eq!(h.store.saved_batches().await, 0);
    }

    #[tokio::test]
    async fn save_failures_propagate() {
        let now = fixed_now();
        let h = harness(MemoryRequestStore::with_requests([movie_request(1, 603, now)]));
        h.tool.map_catalog(12, 603).await;
        h.tool
            .set_queue(vec![movie_queue_record(12, 101, "downloading", 1000, 500)])
            .await;
        h.store.fail_saves(true).await;

        let err = h.processor.run(now).await.expect_err("persistence");
        assert!(matches!(err, CycleError::Persistence { operation: "requests.save_batch", .. }));
    }
}
