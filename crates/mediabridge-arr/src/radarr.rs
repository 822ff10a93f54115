//! Movie acquisition tool client.

use std::sync::Arc;

use async_trait::async_trait;
use mediabridge_config::{ConfigProvider, keys};
use mediabridge_core::{MovieAcquisition, MovieQueueRecord, MovieSnapshot};
use serde_json::json;
use tracing::debug;

use crate::error::ArrResult;
use crate::http::{ArrHttp, resolve_endpoint};
use crate::wire::{LibraryMovie, MovieLookup, MovieQueueEntry, QueuePage};

/// HTTP client for the movie acquisition tool.
#[derive(Clone)]
pub struct RadarrClient {
    http: ArrHttp,
    config: Arc<dyn ConfigProvider>,
}

impl RadarrClient {
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
        resolve_endpoint(self.config.as_ref(), operation, key, keys::RADARR_API_KEY, ids).await
    }

    async fn command(&self, operation: &'static str, body: serde_json::Value) -> ArrResult<()> {
        let url = self
            .endpoint(operation, keys::RADARR_COMMAND_ENDPOINT, &[])
            .await?;
        self.http.post_json(operation, &url, &body).await
    }
}

#[async_trait]
impl MovieAcquisition for RadarrClient {
    async fn poke_refresh(&self) -> anyhow::Result<()> {
        self.command(
            "radarr.poke_refresh",
            json!({ "name": "RefreshMonitoredDownloads" }),
        )
        .await?;
        Ok(())
    }

    async fn fetch_queue(&self) -> anyhow::Result<Vec<MovieQueueRecord>> {
        const OP: &str = "radarr.fetch_queue";
        let url = self.endpoint(OP, keys::RADARR_QUEUE_ENDPOINT, &[]).await?;
        let page: QueuePage<MovieQueueEntry> = self.http.get_json(OP, &url).await?;
        let records: Vec<_> = page
            .records
            .into_iter()
            .filter_map(MovieQueueEntry::into_record)
            .collect();
        debug!(records = records.len(), "fetched movie queue");
        Ok(records)
    }

    async fn catalog_id(&self, tool_movie_id: i32) -> anyhow::Result<i32> {
        const OP: &str = "radarr.catalog_id";
        let url = self
            .endpoint(
                OP,
                keys::RADARR_MOVIE_ENDPOINT,
                &[("movieId", i64::from(tool_movie_id))],
            )
            .await?;
        let movie: MovieLookup = self.http.get_json(OP, &url).await?;
        Ok(movie.tmdb_id)
    }

    async fn remove_queue_item(&self, queue_id: i64) -> anyhow::Result<bool> {
        const OP: &str = "radarr.remove_queue_item";
        let url = self
            .endpoint(OP, keys::RADARR_REMOVE_QUEUE_ENDPOINT, &[("id", queue_id)])
            .await?;
        Ok(self.http.delete(OP, &url).await?)
    }

    async fn trigger_search(&self, tool_movie_ids: &[i32]) -> anyhow::Result<()> {
        self.command(
            "radarr.trigger_search",
            json!({ "name": "MoviesSearch", "movieIds": tool_movie_ids }),
        )
        .await?;
        Ok(())
    }

    async fn list_library(&self) -> anyhow::Result<Vec<MovieSnapshot>> {
        const OP: &str = "radarr.list_library";
        let url = self.endpoint(OP, keys::RADARR_LIBRARY_ENDPOINT, &[]).await?;
        let movies: Vec<LibraryMovie> = self.http.get_json(OP, &url).await?;
        Ok(movies.into_iter().map(MovieSnapshot::from).collect())
    }
}
