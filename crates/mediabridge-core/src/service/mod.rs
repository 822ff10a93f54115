//! Collaborator traits implemented by the wire clients and the persistent store.

use async_trait::async_trait;

use crate::model::{
    DownloadRequest, DownloadedMovie, DownloadedShow, EpisodeInfo, HealthRecord, MediaKind,
    MovieQueueRecord, MovieSnapshot, RequestBatch, RequestStatus, SeriesInfo, SeriesQueueRecord,
    SeriesSnapshot,
};

/// Movie acquisition tool.
#[async_trait]
pub trait MovieAcquisition: Send + Sync {
    /// Ask the tool to refresh its view of monitored downloads.
    async fn poke_refresh(&self) -> anyhow::Result<()>;

    /// Current download queue.
    async fn fetch_queue(&self) -> anyhow::Result<Vec<MovieQueueRecord>>;

    /// Resolve the catalog (TMDb) id for the tool's internal movie id.
    async fn catalog_id(&self, tool_movie_id: i32) -> anyhow::Result<i32>;

    /// Remove a queue entry; `false` when the tool refused.
    async fn remove_queue_item(&self, queue_id: i64) -> anyhow::Result<bool>;

    /// Ask the tool to search for new sources for the given movies.
    async fn trigger_search(&self, tool_movie_ids: &[i32]) -> anyhow::Result<()>;

    /// Every movie in the tool's library.
    async fn list_library(&self) -> anyhow::Result<Vec<MovieSnapshot>>;
}

/// Series acquisition tool.
#[async_trait]
pub trait SeriesAcquisition: Send + Sync {
    /// Ask the tool to refresh its view of monitored downloads.
    async fn poke_refresh(&self) -> anyhow::Result<()>;

    /// Current download queue.
    async fn fetch_queue(&self) -> anyhow::Result<Vec<SeriesQueueRecord>>;

    /// Catalog metadata for the tool's internal series id.
    async fn series(&self, tool_series_id: i32) -> anyhow::Result<SeriesInfo>;

    /// Every episode the tool knows for a series.
    async fn episodes(&self, tool_series_id: i32) -> anyhow::Result<Vec<EpisodeInfo>>;

    /// Remove a queue entry; `false` when the tool refused.
    async fn remove_queue_item(&self, queue_id: i64) -> anyhow::Result<bool>;

    /// Ask the tool to search for new sources for the given episodes.
    async fn trigger_search(&self, episode_ids: &[i32]) -> anyhow::Result<()>;

    /// Every series in the tool's library, with season statistics.
    async fn list_library(&self) -> anyhow::Result<Vec<SeriesSnapshot>>;
}

/// Torrent client telemetry.
#[async_trait]
pub trait TorrentHealthSource: Send + Sync {
    /// Health records for the given info hashes. Unknown hashes are omitted.
    async fn fetch_health(&self, torrent_ids: &[String]) -> anyhow::Result<Vec<HealthRecord>>;
}

/// Durable store of download requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Whether any request of the given kinds is in one of the given statuses.
    async fn has_active(
        &self,
        kinds: &[MediaKind],
        statuses: &[RequestStatus],
    ) -> anyhow::Result<bool>;

    /// The movie request for a catalog movie id.
    async fn find_movie(&self, movie_id: i32) -> anyhow::Result<Option<DownloadRequest>>;

    /// The series request for a catalog series id.
    async fn find_series(&self, series_id: i32) -> anyhow::Result<Option<DownloadRequest>>;

    /// Episode requests whose tool episode id is in `episode_ids`.
    async fn find_episodes(&self, episode_ids: &[i32]) -> anyhow::Result<Vec<DownloadRequest>>;

    /// Every episode request belonging to a catalog series id.
    async fn episodes_for_series(&self, series_id: i32)
    -> anyhow::Result<Vec<DownloadRequest>>;

    /// Requests of one kind in one status.
    async fn list_by_status(
        &self,
        kind: MediaKind,
        status: RequestStatus,
    ) -> anyhow::Result<Vec<DownloadRequest>>;

    /// Persist a batch of updates and inserts atomically.
    async fn save_batch(&self, batch: &RequestBatch) -> anyhow::Result<()>;
}

/// Inventory snapshot tables.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Replace the movie inventory wholesale.
    async fn replace_movies(&self, movies: &[DownloadedMovie]) -> anyhow::Result<()>;

    /// Replace the show inventory wholesale.
    async fn replace_shows(&self, shows: &[DownloadedShow]) -> anyhow::Result<()>;
}

/// Refreshes cached discovery content on the maintenance timer.
#[async_trait]
pub trait DiscoveryRefresher: Send + Sync {
    /// Rebuild the cache.
    async fn refresh(&self) -> anyhow::Result<()>;
}
