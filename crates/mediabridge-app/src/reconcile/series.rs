//! One reconciliation pass over the series tool's queue, including creation of episode
//! requests the tool is downloading but the store has not seen yet.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use mediabridge_core::{
    DownloadRequest, EpisodeInfo, MediaDetails, MediaIdentity, MediaKind, NewDownloadRequest,
    RequestBatch, RequestProgress, RequestStatus, RequestStore, SeriesAcquisition,
    SeriesQueueRecord, StuckPolicy, TorrentHealthSource, aggregate_series, map_status,
    minutes_left_weighted, parse_minutes, percent,
};
use mediabridge_telemetry::ReconcileMetrics;
use tracing::{debug, info, warn};

use super::library::LibrarySync;
use super::remediation::{QueueTransfer, cull_stuck};
use super::{CycleError, ReconcileDeps, absorb_external, external, persistence};

const ACTIVE_KINDS: [MediaKind; 2] = [MediaKind::Series, MediaKind::Episode];
const ACTIVE_STATUSES: [RequestStatus; 2] = [RequestStatus::Queued, RequestStatus::Downloading];

/// What one series pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesCycle {
    /// Existing episode and series requests written.
    pub updated: usize,
    /// Episode requests created.
    pub inserted: usize,
    /// Queue entries removed as stuck.
    pub culled: usize,
    /// Episodes that reached `completed` for the first time.
    pub completed: usize,
}

/// Per-pass working state.
#[derive(Default)]
struct Pass {
    batch: RequestBatch,
    /// Series ids whose aggregate must be recomputed.
    touched: BTreeSet<i32>,
    /// Parent requests already loaded this pass, by series id.
    parents: HashMap<i32, DownloadRequest>,
    completed: usize,
}

/// Reconciles episode and series requests against the series tool's queue.
#[derive(Clone)]
pub struct SeriesQueueProcessor {
    series: Arc<dyn SeriesAcquisition>,
    torrents: Arc<dyn TorrentHealthSource>,
    requests: Arc<dyn RequestStore>,
    library: LibrarySync,
    policy: StuckPolicy,
    metrics: ReconcileMetrics,
}

impl SeriesQueueProcessor {
    /// Processor over the shared collaborators.
    #[must_use]
    pub fn new(deps: &ReconcileDeps, library: LibrarySync, policy: StuckPolicy) -> Self {
        Self {
            series: Arc::clone(&deps.series),
            torrents: Arc::clone(&deps.torrents),
            requests: Arc::clone(&deps.requests),
            library,
            policy,
            metrics: deps.metrics.clone(),
        }
    }

    /// Run one pass at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Persistence`] when the request store fails. Tool and
    /// torrent client failures end the pass with an empty [`SeriesCycle`].
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SeriesCycle, CycleError> {
        absorb_external("poll_series", self.reconcile(now).await)
    }

    async fn reconcile(&self, now: DateTime<Utc>) -> Result<SeriesCycle, CycleError> {
        self.series
            .poke_refresh()
            .await
            .map_err(external("sonarr.poke_refresh"))?;

        let active = self
            .requests
            .has_active(&ACTIVE_KINDS, &ACTIVE_STATUSES)
            .await
            .map_err(persistence("requests.has_active"))?;
        if !active {
            debug!("no active series requests");
            return Ok(SeriesCycle::default());
        }

        let queue = self
            .series
            .fetch_queue()
            .await
            .map_err(external("sonarr.fetch_queue"))?;
        if queue.is_empty() {
            info!("series queue is empty");
            return Ok(SeriesCycle::default());
        }

        let transfers: Vec<QueueTransfer> = queue
            .iter()
            .map(|record| QueueTransfer {
                queue_id: record.queue_id,
                search_id: record.episode_id,
                torrent_id: record.torrent_id.clone(),
            })
            .collect();
        let culled = cull_stuck(
            self.series.as_ref(),
            self.torrents.as_ref(),
            &self.policy,
            &transfers,
            now,
            &self.metrics,
        )
        .await
        .map_err(external("series.cull_stuck"))?;

        let mut groups: BTreeMap<i32, Vec<&SeriesQueueRecord>> = BTreeMap::new();
        for record in queue.iter().filter(|record| !culled.contains(&record.queue_id)) {
            groups.entry(record.tool_series_id).or_default().push(record);
        }

        let episode_ids: Vec<i32> = groups.values().flatten().map(|r| r.episode_id).collect();
        let stored: HashMap<i32, DownloadRequest> = self
            .requests
            .find_episodes(&episode_ids)
            .await
            .map_err(persistence("requests.find_episodes"))?
            .into_iter()
            .filter_map(|request| request.identity.episode_id().map(|id| (id, request)))
            .collect();

        let mut pass = Pass::default();
        for (tool_series_id, records) in &groups {
            Self::update_existing(records, &stored, &mut pass, now);
            self.create_missing(*tool_series_id, records, &stored, &mut pass, now)
                .await?;
        }
        self.aggregate_parents(&mut pass, now).await?;

        let cycle = SeriesCycle {
            updated: pass.batch.updated.len(),
            inserted: pass.batch.inserted.len(),
            culled: culled.len(),
            completed: pass.completed,
        };
        self.requests
            .save_batch(&pass.batch)
            .await
            .map_err(persistence("requests.save_batch"))?;
        debug!(
            updated = cycle.updated,
            inserted = cycle.inserted,
            culled = cycle.culled,
            completed = cycle.completed,
            "series queue reconciled"
        );

        if cycle.completed > 0
            && let Err(err) = self.library.sync_shows().await
        {
            warn!(error = %format!("{err:#}"), "show inventory resync failed");
        }
        Ok(cycle)
    }

    fn update_existing(
        records: &[&SeriesQueueRecord],
        stored: &HashMap<i32, DownloadRequest>,
        pass: &mut Pass,
        now: DateTime<Utc>,
    ) {
        for record in records {
            let Some(stored) = stored.get(&record.episode_id) else {
                continue;
            };
            let mut request = pass
                .batch
                .updated
                .iter()
                .find(|pending| pending.id == stored.id)
                .unwrap_or(stored)
                .clone();
            let progress = RequestProgress {
                status: map_status(record.status.as_deref()),
                percent: percent(record.size, record.size_left),
                minutes_left: minutes_left_weighted(
                    record.size,
                    record.size_left,
                    record.time_left.as_deref(),
                ),
            };
            if request.observe(progress, now) {
                info!(
                    request_id = request.id,
                    episode_id = record.episode_id,
                    "episode request completed"
                );
                pass.completed += 1;
            }
            if let Some(series_id) = request.identity.series_id() {
                pass.touched.insert(series_id);
            }
            pass.batch.upsert(request);
        }
    }

    async fn create_missing(
        &self,
        tool_series_id: i32,
        records: &[&SeriesQueueRecord],
        stored: &HashMap<i32, DownloadRequest>,
        pass: &mut Pass,
        now: DateTime<Utc>,
    ) -> Result<(), CycleError> {
        let mut seen = BTreeSet::new();
        let missing: Vec<&SeriesQueueRecord> = records
            .iter()
            .copied()
            .filter(|record| !stored.contains_key(&record.episode_id))
            .filter(|record| seen.insert(record.episode_id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let series_id = self
            .series
            .series(tool_series_id)
            .await
            .map_err(external("sonarr.series"))?
            .series_id;
        let Some(parent) = self.load_parent(series_id, pass).await? else {
            warn!(
                series_id,
                tool_series_id,
                episodes = missing.len(),
                "no series request for queued episodes; skipping group"
            );
            return Ok(());
        };
        let listing: HashMap<i32, EpisodeInfo> = self
            .series
            .episodes(tool_series_id)
            .await
            .map_err(external("sonarr.episodes"))?
            .into_iter()
            .map(|episode| (episode.id, episode))
            .collect();

        for record in missing {
            let Some(episode) = listing.get(&record.episode_id) else {
                warn!(
                    series_id,
                    episode_id = record.episode_id,
                    "queued episode missing from the series listing"
                );
                continue;
            };
            let progress = RequestProgress {
                status: map_status(record.status.as_deref()),
                percent: percent(record.size, record.size_left),
                minutes_left: parse_minutes(record.time_left.as_deref()),
            };
            if progress.status == RequestStatus::Completed {
                pass.completed += 1;
            }
            info!(series_id, episode_id = episode.id, "tracking new episode request");
            pass.batch
                .inserted
                .push(new_episode(&parent, series_id, tool_series_id, episode, progress, now));
            pass.touched.insert(series_id);
        }
        Ok(())
    }

    async fn load_parent(
        &self,
        series_id: i32,
        pass: &mut Pass,
    ) -> Result<Option<DownloadRequest>, CycleError> {
        if let Some(parent) = pass.parents.get(&series_id) {
            return Ok(Some(parent.clone()));
        }
        let parent = self
            .requests
            .find_series(series_id)
            .await
            .map_err(persistence("requests.find_series"))?;
        if let Some(parent) = &parent {
            pass.parents.insert(series_id, parent.clone());
        }
        Ok(parent)
    }

    /// Recompute each touched series from its stored episodes overlaid with this pass's
    /// pending writes.
    async fn aggregate_parents(
        &self,
        pass: &mut Pass,
        now: DateTime<Utc>,
    ) -> Result<(), CycleError> {
        let touched: Vec<i32> = pass.touched.iter().copied().collect();
        for series_id in touched {
            let Some(mut parent) = self.load_parent(series_id, pass).await? else {
                debug!(series_id, "episodes tracked without a series request");
                continue;
            };

            let mut children: BTreeMap<i32, RequestProgress> = self
                .requests
                .episodes_for_series(series_id)
                .await
                .map_err(persistence("requests.episodes_for_series"))?
                .into_iter()
                .filter_map(|request| Some((request.identity.episode_id()?, request.progress)))
                .collect();
            let pending = pass
                .batch
                .updated
                .iter()
                .map(|request| (&request.identity, request.progress))
                .chain(
                    pass.batch
                        .inserted
                        .iter()
                        .map(|request| (&request.identity, request.progress)),
                );
            for (identity, progress) in pending {
                if identity.series_id() == Some(series_id)
                    && let Some(episode_id) = identity.episode_id()
                {
                    children.insert(episode_id, progress);
                }
            }

            let Some(aggregate) = aggregate_series(children.values()) else {
                continue;
            };
            if parent.observe(aggregate.progress, now) {
                info!(request_id = parent.id, series_id, "series request completed");
            }
            debug!(
                series_id,
                episodes = aggregate.episodes,
                percent = aggregate.progress.percent,
                "series progress aggregated"
            );
            pass.parents.insert(series_id, parent.clone());
            pass.batch.upsert(parent);
        }
        Ok(())
    }
}

fn new_episode(
    parent: &DownloadRequest,
    series_id: i32,
    tool_series_id: i32,
    episode: &EpisodeInfo,
    progress: RequestProgress,
    now: DateTime<Utc>,
) -> NewDownloadRequest {
    let title = episode.title.clone().unwrap_or_else(|| {
        format!("S{:02}E{:02}", episode.season_number, episode.episode_number)
    });
    NewDownloadRequest {
        identity: MediaIdentity::Episode {
            series_id,
            episode_id: episode.id,
            tool_series_id,
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            air_date: episode.air_date,
        },
        details: MediaDetails {
            title,
            description: parent.details.description.clone(),
            poster_url: parent.details.poster_url.clone(),
            release_year: episode.air_date.map(|aired| aired.year()),
        },
        progress,
        user_id: parent.user_id,
        requested_at: now,
    }
}
