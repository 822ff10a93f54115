//! In-memory implementations of the collaborator traits with call recording and
//! failure injection.

use std::collections::{BTreeMap, HashMap};

use anyhow::bail;
use async_trait::async_trait;
use mediabridge_core::{
    DiscoveryRefresher, DownloadRequest, DownloadedMovie, DownloadedShow, EpisodeInfo,
    HealthRecord, InventoryStore, MediaIdentity, MediaKind, MovieAcquisition, MovieQueueRecord,
    MovieSnapshot, RequestBatch, RequestStatus, RequestStore, SeriesAcquisition, SeriesInfo,
    SeriesQueueRecord, SeriesSnapshot, TorrentHealthSource,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct StoreState {
    requests: BTreeMap<i64, DownloadRequest>,
    saved_batches: usize,
    fail_saves: bool,
    fail_reads: bool,
}

/// Request store backed by a map, mirroring the Postgres store's semantics.
#[derive(Default)]
pub struct MemoryRequestStore {
    state: Mutex<StoreState>,
}

impl MemoryRequestStore {
    /// Store seeded with `requests`.
    #[must_use]
    pub fn with_requests(requests: impl IntoIterator<Item = DownloadRequest>) -> Self {
        let requests = requests
            .into_iter()
            .map(|request| (request.id, request))
            .collect();
        Self {
            state: Mutex::new(StoreState {
                requests,
                ..StoreState::default()
            }),
        }
    }

    /// Request by id.
    pub async fn get(&self, id: i64) -> Option<DownloadRequest> {
        self.state.lock().await.requests.get(&id).cloned()
    }

    /// Every stored request ordered by id.
    pub async fn all(&self) -> Vec<DownloadRequest> {
        self.state.lock().await.requests.values().cloned().collect()
    }

    /// Number of successful `save_batch` calls with content.
    pub async fn saved_batches(&self) -> usize {
        self.state.lock().await.saved_batches
    }

    /// Make subsequent saves fail.
    pub async fn fail_saves(&self, fail: bool) {
        self.state.lock().await.fail_saves = fail;
    }

    /// Make subsequent reads fail.
    pub async fn fail_reads(&self, fail: bool) {
        self.state.lock().await.fail_reads = fail;
    }

    async fn select(
        &self,
        predicate: impl Fn(&DownloadRequest) -> bool + Send,
    ) -> anyhow::Result<Vec<DownloadRequest>> {
        let state = self.state.lock().await;
        if state.fail_reads {
            bail!("request store unavailable");
        }
        Ok(state
            .requests
            .values()
            .filter(|request| predicate(request))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn has_active(
        &self,
        kinds: &[MediaKind],
        statuses: &[RequestStatus],
    ) -> anyhow::Result<bool> {
        let found = self
            .select(|request| {
                kinds.contains(&request.kind()) && statuses.contains(&request.progress.status)
            })
            .await?;
        Ok(!found.is_empty())
    }

    async fn find_movie(&self, movie_id: i32) -> anyhow::Result<Option<DownloadRequest>> {
        let found = self
            .select(|request| request.identity.movie_id() == Some(movie_id))
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_series(&self, series_id: i32) -> anyhow::Result<Option<DownloadRequest>> {
        let found = self
            .select(|request| request.identity == MediaIdentity::Series { series_id })
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_episodes(&self, episode_ids: &[i32]) -> anyhow::Result<Vec<DownloadRequest>> {
        self.select(|request| {
            request
                .identity
                .episode_id()
                .is_some_and(|id| episode_ids.contains(&id))
        })
        .await
    }

    async fn episodes_for_series(
        &self,
        series_id: i32,
    ) -> anyhow::Result<Vec<DownloadRequest>> {
        self.select(|request| {
            request.kind() == MediaKind::Episode && request.identity.series_id() == Some(series_id)
        })
        .await
    }

    async fn list_by_status(
        &self,
        kind: MediaKind,
        status: RequestStatus,
    ) -> anyhow::Result<Vec<DownloadRequest>> {
        self.select(|request| request.kind() == kind && request.progress.status == status)
            .await
    }

    async fn save_batch(&self, batch: &RequestBatch) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_saves {
            bail!("request store rejected the batch");
        }
        if batch.is_empty() {
            return Ok(());
        }
        for request in &batch.updated {
            let mut next = request.clone();
            if let Some(existing) = state.requests.get(&request.id) {
                next.completed_at = existing.completed_at.or(request.completed_at);
            }
            state.requests.insert(next.id, next);
        }
        let mut next_id = state.requests.keys().max().copied().unwrap_or(0) + 1;
        for new in &batch.inserted {
            let completed_at = (new.progress.status == RequestStatus::Completed)
                .then_some(new.requested_at);
            state.requests.insert(
                next_id,
                DownloadRequest {
                    id: next_id,
                    identity: new.identity.clone(),
                    details: new.details.clone(),
                    progress: new.progress,
                    user_id: new.user_id,
                    requested_at: new.requested_at,
                    updated_at: new.requested_at,
                    completed_at,
                },
            );
            next_id += 1;
        }
        state.saved_batches += 1;
        Ok(())
    }
}

#[derive(Default)]
struct InventoryState {
    movies: Vec<DownloadedMovie>,
    shows: Vec<DownloadedShow>,
    movie_replacements: usize,
    show_replacements: usize,
    fail: bool,
}

/// Inventory store keeping the latest snapshot in memory.
#[derive(Default)]
pub struct MemoryInventory {
    state: Mutex<InventoryState>,
}

impl MemoryInventory {
    /// Current movie rows.
    pub async fn movies(&self) -> Vec<DownloadedMovie> {
        self.state.lock().await.movies.clone()
    }

    /// Current show rows.
    pub async fn shows(&self) -> Vec<DownloadedShow> {
        self.state.lock().await.shows.clone()
    }

    /// How many times each table was replaced, as `(movies, shows)`.
    pub async fn replacements(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.movie_replacements, state.show_replacements)
    }

    /// Make subsequent replacements fail.
    pub async fn fail(&self, fail: bool) {
        self.state.lock().await.fail = fail;
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn replace_movies(&self, movies: &[DownloadedMovie]) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.fail {
            bail!("inventory unavailable");
        }
        state.movies = movies.to_vec();
        state.movie_replacements += 1;
        Ok(())
    }

    async fn replace_shows(&self, shows: &[DownloadedShow]) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.fail {
            bail!("inventory unavailable");
        }
        state.shows = shows.to_vec();
        state.show_replacements += 1;
        Ok(())
    }
}

/// Injected failures for the fake acquisition tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolFailures {
    /// `poke_refresh` fails.
    pub poke: bool,
    /// `fetch_queue` fails.
    pub queue: bool,
    /// Per-item lookups (`catalog_id`, `series`, `episodes`) fail.
    pub lookup: bool,
    /// `list_library` fails.
    pub library: bool,
    /// `remove_queue_item` reports `false`.
    pub refuse_removal: bool,
}

/// Calls recorded by the fake acquisition tools.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToolCalls {
    /// `poke_refresh` invocations.
    pub pokes: usize,
    /// `fetch_queue` invocations.
    pub queue_fetches: usize,
    /// Per-item lookups.
    pub lookups: usize,
    /// `list_library` invocations.
    pub library_listings: usize,
    /// Queue ids passed to `remove_queue_item`.
    pub removed: Vec<i64>,
    /// Id lists passed to `trigger_search`.
    pub searches: Vec<Vec<i32>>,
}

#[derive(Default)]
struct MovieToolState {
    queue: Vec<MovieQueueRecord>,
    catalog: HashMap<i32, i32>,
    library: Vec<MovieSnapshot>,
    failures: ToolFailures,
    calls: ToolCalls,
}

/// Scriptable movie acquisition tool.
#[derive(Default)]
pub struct FakeMovieTool {
    state: Mutex<MovieToolState>,
}

impl FakeMovieTool {
    /// Replace the queue snapshot.
    pub async fn set_queue(&self, queue: Vec<MovieQueueRecord>) {
        self.state.lock().await.queue = queue;
    }

    /// Map the tool's movie id onto a catalog id.
    pub async fn map_catalog(&self, tool_movie_id: i32, movie_id: i32) {
        self.state
            .lock()
            .await
            .catalog
            .insert(tool_movie_id, movie_id);
    }

    /// Replace the library listing.
    pub async fn set_library(&self, library: Vec<MovieSnapshot>) {
        self.state.lock().await.library = library;
    }

    /// Replace the injected failures.
    pub async fn set_failures(&self, failures: ToolFailures) {
        self.state.lock().await.failures = failures;
    }

    /// Calls recorded so far.
    pub async fn calls(&self) -> ToolCalls {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl MovieAcquisition for FakeMovieTool {
    async fn poke_refresh(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.calls.pokes += 1;
        if state.failures.poke {
            bail!("movie tool refused the refresh command");
        }
        Ok(())
    }

    async fn fetch_queue(&self) -> anyhow::Result<Vec<MovieQueueRecord>> {
        let mut state = self.state.lock().await;
        state.calls.queue_fetches += 1;
        if state.failures.queue {
            bail!("movie queue unavailable");
        }
        Ok(state.queue.clone())
    }

    async fn catalog_id(&self, tool_movie_id: i32) -> anyhow::Result<i32> {
        let mut state = self.state.lock().await;
        state.calls.lookups += 1;
        if state.failures.lookup {
            bail!("movie lookup failed");
        }
        match state.catalog.get(&tool_movie_id) {
            Some(id) => Ok(*id),
            None => bail!("movie {tool_movie_id} not found"),
        }
    }

    async fn remove_queue_item(&self, queue_id: i64) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        state.calls.removed.push(queue_id);
        if state.failures.refuse_removal {
            return Ok(false);
        }
        state.queue.retain(|record| record.queue_id != queue_id);
        Ok(true)
    }

    async fn trigger_search(&self, tool_movie_ids: &[i32]) -> anyhow::Result<()> {
        self.state
            .lock()
            .await
            .calls
            .searches
            .push(tool_movie_ids.to_vec());
        Ok(())
    }

    async fn list_library(&self) -> anyhow::Result<Vec<MovieSnapshot>> {
        let mut state = self.state.lock().await;
        state.calls.library_listings += 1;
        if state.failures.library {
            bail!("movie library unavailable");
        }
        Ok(state.library.clone())
    }
}

#[derive(Default)]
struct SeriesToolState {
    queue: Vec<SeriesQueueRecord>,
    series: HashMap<i32, SeriesInfo>,
    episodes: HashMap<i32, Vec<EpisodeInfo>>,
    library: Vec<SeriesSnapshot>,
    failures: ToolFailures,
    calls: ToolCalls,
}

/// Scriptable series acquisition tool.
#[derive(Default)]
pub struct FakeSeriesTool {
    state: Mutex<SeriesToolState>,
}

impl FakeSeriesTool {
    /// Replace the queue snapshot.
    pub async fn set_queue(&self, queue: Vec<SeriesQueueRecord>) {
        self.state.lock().await.queue = queue;
    }

    /// Register a series and its episode listing under the tool's series id.
    pub async fn add_series(&self, tool_series_id: i32, series_id: i32, episodes: Vec<EpisodeInfo>) {
        let mut state = self.state.lock().await;
        state
            .series
            .insert(tool_series_id, SeriesInfo { series_id });
        state.episodes.insert(tool_series_id, episodes);
    }

    /// Replace the library listing.
    pub async fn set_library(&self, library: Vec<SeriesSnapshot>) {
        self.state.lock().await.library = library;
    }

    /// Replace the injected failures.
    pub async fn set_failures(&self, failures: ToolFailures) {
        self.state.lock().await.failures = failures;
    }

    /// Calls recorded so far.
    pub async fn calls(&self) -> ToolCalls {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl SeriesAcquisition for FakeSeriesTool {
    async fn poke_refresh(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.calls.pokes += 1;
        if state.failures.poke {
            bail!("series tool refused the refresh command");
        }
        Ok(())
    }

    async fn fetch_queue(&self) -> anyhow::Result<Vec<SeriesQueueRecord>> {
        let mut state = self.state.lock().await;
        state.calls.queue_fetches += 1;
        if state.failures.queue {
            bail!("series queue unavailable");
        }
        Ok(state.queue.clone())
    }

    async fn series(&self, tool_series_id: i32) -> anyhow::Result<SeriesInfo> {
        let mut state = self.state.lock().await;
        state.calls.lookups += 1;
        if state.failures.lookup {
            bail!("series lookup failed");
        }
        match state.series.get(&tool_series_id) {
            Some(info) => Ok(*info),
            None => bail!("series {tool_series_id} not found"),
        }
    }

    async fn episodes(&self, tool_series_id: i32) -> anyhow::Result<Vec<EpisodeInfo>> {
        let mut state = self.state.lock().await;
        state.calls.lookups += 1;
        if state.failures.lookup {
            bail!("episode lookup failed");
        }
        Ok(state
            .episodes
            .get(&tool_series_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_queue_item(&self, queue_id: i64) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        state.calls.removed.push(queue_id);
        if state.failures.refuse_removal {
            return Ok(false);
        }
        state.queue.retain(|record| record.queue_id != queue_id);
        Ok(true)
    }

    async fn trigger_search(&self, episode_ids: &[i32]) -> anyhow::Result<()> {
        self.state
            .lock()
            .await
            .calls
            .searches
            .push(episode_ids.to_vec());
        Ok(())
    }

    async fn list_library(&self) -> anyhow::Result<Vec<SeriesSnapshot>> {
        let mut state = self.state.lock().await;
        state.calls.library_listings += 1;
        if state.failures.library {
            bail!("series library unavailable");
        }
        Ok(state.library.clone())
    }
}

#[derive(Default)]
struct TorrentState {
    records: Vec<HealthRecord>,
    requests: Vec<Vec<String>>,
    fail: bool,
}

/// Torrent client returning scripted health records.
#[derive(Default)]
pub struct FakeTorrentClient {
    state: Mutex<TorrentState>,
}

impl FakeTorrentClient {
    /// Replace the known health records.
    pub async fn set_records(&self, records: Vec<HealthRecord>) {
        self.state.lock().await.records = records;
    }

    /// Make subsequent lookups fail.
    pub async fn fail(&self, fail: bool) {
        self.state.lock().await.fail = fail;
    }

    /// Hash lists requested so far.
    pub async fn requests(&self) -> Vec<Vec<String>> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl TorrentHealthSource for FakeTorrentClient {
    async fn fetch_health(&self, torrent_ids: &[String]) -> anyhow::Result<Vec<HealthRecord>> {
        let mut state = self.state.lock().await;
        state.requests.push(torrent_ids.to_vec());
        if state.fail {
            bail!("torrent client unavailable");
        }
        Ok(state
            .records
            .iter()
            .filter(|record| {
                torrent_ids
                    .iter()
                    .any(|id| id.eq_ignore_ascii_case(&record.torrent_id))
            })
            .cloned()
            .collect())
    }
}

/// Discovery refresher counting its invocations.
#[derive(Default)]
pub struct FakeDiscovery {
    state: Mutex<(usize, bool)>,
}

impl FakeDiscovery {
    /// Number of refresh attempts.
    pub async fn refreshes(&self) -> usize {
        self.state.lock().await.0
    }

    /// Make subsequent refreshes fail.
    pub async fn fail(&self, fail: bool) {
        self.state.lock().await.1 = fail;
    }
}

#[async_trait]
impl DiscoveryRefresher for FakeDiscovery {
    async fn refresh(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.0 += 1;
        if state.1 {
            bail!("discovery cache refresh failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{episode_request, fixed_now, movie_request};
    use mediabridge_core::{NewDownloadRequest, RequestProgress};

    #[tokio::test]
    async fn memory_store_keeps_first_completion_and_assigns_ids() -> anyhow::Result<()> {
        let now = fixed_now();
        let mut movie = movie_request(1, 603, now);
        movie.completed_at = Some(now);
        let store = MemoryRequestStore::with_requests([movie.clone()]);

        movie.completed_at = None;
        movie.progress = RequestProgress::queued();
        let template = episode_request(0, 5, 6, 7, now);
        store
            .save_batch(&RequestBatch {
                updated: vec![movie],
                inserted: vec![NewDownloadRequest {
                    identity: template.identity,
                    details: template.details,
                    progress: RequestProgress::completed(),
                    user_id: 1,
                    requested_at: now,
                }],
            })
            .await?;

        assert_eq!(store.get(1).await.and_then(|r| r.completed_at), Some(now));
        let inserted = store.get(2).await.expect("inserted episode");
        assert_eq!(inserted.completed_at, Some(now));
        assert_eq!(store.find_episodes(&[7]).await?.len(), 1);
        assert_eq!(store.saved_batches().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn torrent_fake_matches_hashes_case_insensitively() -> anyhow::Result<()> {
        let client = FakeTorrentClient::default();
        client
            .set_records(vec![crate::fixtures::stuck_health("abcd", fixed_now())])
            .await;
        let found = client.fetch_health(&["ABCD".to_string()]).await?;
        assert_eq!(found.len(), 1);
        Ok(())
    }
}
