//! Series acquisition tool client.

use std::sync::Arc;

use async_trait::async_trait;
use mediabridge_config::{ConfigProvider, keys};
use mediabridge_core::{EpisodeInfo, SeriesAcquisition, SeriesInfo, SeriesQueueRecord, SeriesSnapshot};
use serde_json::json;
use tracing::debug;

use crate::error::ArrResult;
use crate::http::{ArrHttp, resolve_endpoint};
use crate::wire::{EpisodeEntry, LibrarySeries, QueuePage, SeriesLookup, SeriesQueueEntry};

/// HTTP client for the series acquisition tool.
#[derive(Clone)]
pub struct SonarrClient {
    http: ArrHttp,
    config: Arc<dyn ConfigProvider>,
}

impl SonarrClient {
    /// Build a client resolving its endpoints through `config`.
    #[must_use]
    pub fn new(http: ArrHttp, config: Arc<dyn ConfigProvider>) -> Self {
        Self { http, config }
    }

    async fn endpoint(
        &self,
        operation: &'static str,
        key: &str,
        ids: &[(&str, i64)],
    ) -> ArrResult<String> {
        resolve_endpoint(self.config.as_ref(), operation, key, keys::SONARR_API_KEY, ids).await
    }

    async fn command(&self, operation: &'static str, body: serde_json::Value) -> ArrResult<()> {
        let url = self
            .endpoint(operation, keys::SONARR_COMMAND_ENDPOINT, &[])
            .await?;
        self.http.post_json(operation, &url, &body).await
    }
}

#[async_trait]
impl SeriesAcquisition for SonarrClient {
    async fn poke_refresh(&self) -> anyhow::Result<()> {
        self.command(
            "sonarr.poke_refresh",
            json!({ "name": "RefreshMonitoredDownloads" }),
        )
        .await?;
        Ok(())
    }

    async fn fetch_queue(&self) -> anyhow::Result<Vec<SeriesQueueRecord>> {
        const OP: &str = "sonarr.fetch_queue";
        let url = self.endpoint(OP, keys::SONARR_QUEUE_ENDPOINT, &[]).await?;
        let page: QueuePage<SeriesQueueEntry> = self.http.get_json(OP, &url).await?;
        let records: Vec<_> = page
            .records
            .into_iter()
            .filter_map(SeriesQueueEntry::into_record)
            .collect();
        debug!(records = records.len(), "fetched series queue");
        Ok(records)
    }

    async fn series(&self, tool_series_id: i32) -> anyhow::Result<SeriesInfo> {
        const OP: &str = "sonarr.series";
        let url = self
            .endpoint(
                OP,
                keys::SONARR_SERIES_ENDPOINT,
                &[("seriesId", i64::from(tool_series_id))],
            )
            .await?;
        let series: SeriesLookup = self.http.get_json(OP, &url).await?;
        Ok(SeriesInfo {
            series_id: series.tvdb_id,
        })
    }

    async fn episodes(&self, tool_series_id: i32) -> anyhow::Result<Vec<EpisodeInfo>> {
        const OP: &str = "sonarr.episodes";
        let url = self
            .endpoint(
                OP,
                keys::SONARR_EPISODES_ENDPOINT,
                &[("seriesId", i64::from(tool_series_id))],
            )
            .await?;
        let episodes: Vec<EpisodeEntry> = self.http.get_json(OP, &url).await?;
        Ok(episodes.into_iter().map(EpisodeInfo::from).collect())
    }

    async fn remove_queue_item(&self, queue_id: i64) -> anyhow::Result<bool> {
        const OP: &str = "sonarr.remove_queue_item";
        let url = self
            .endpoint(OP, keys::SONARR_REMOVE_QUEUE_ENDPOINT, &[("id", queue_id)])
            .await?;
        Ok(self.http.delete(OP, &url).await?)
    }

    async fn trigger_search(&self, episode_ids: &[i32]) -> anyhow::Result<()> {
        self.command(
            "sonarr.trigger_search",
            json!({ "name": "EpisodeSearch", "episodeIds": episode_ids }),
        )
        .await?;
        Ok(())
    }

    async fn list_library(&self) -> anyhow::Result<Vec<SeriesSnapshot>> {
        const OP: &str = "sonarr.list_library";
        let url = self.endpoint(OP, keys::SONARR_LIBRARY_ENDPOINT, &[]).await?;
        let shows: Vec<LibrarySeries> = self.http.get_json(OP, &url).await?;
        Ok(shows.into_iter().map(SeriesSnapshot::from).collect())
    }
}
