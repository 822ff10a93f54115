//! Wholesale replacement of the inventory snapshot tables.

use std::sync::Arc;

use mediabridge_core::{
    DownloadedMovie, DownloadedShow, InventoryStore, MovieAcquisition, SeriesAcquisition,
};
use mediabridge_telemetry::ReconcileMetrics;
use tracing::info;

/// Rebuilds the inventory tables from the acquisition tools' libraries.
///
/// The tables are a cache of the tools' state, so each sync deletes every row and
/// inserts the fresh listing in one store operation.
#[derive(Clone)]
pub struct LibrarySync {
    movies: Arc<dyn MovieAcquisition>,
    series: Arc<dyn SeriesAcquisition>,
    inventory: Arc<dyn InventoryStore>,
    metrics: ReconcileMetrics,
}

impl LibrarySync {
    /// Sync over the given tools and store.
    #[must_use]
    pub fn new(
        movies: Arc<dyn MovieAcquisition>,
        series: Arc<dyn SeriesAcquisition>,
        inventory: Arc<dyn InventoryStore>,
        metrics: ReconcileMetrics,
    ) -> Self {
        Self {
            movies,
            series,
            inventory,
            metrics,
        }
    }

    /// Replace the movie inventory; returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the library listing or the replace fails. The table is left
    /// untouched when the listing fails.
    pub async fn sync_movies(&self) -> anyhow::Result<usize> {
        let library = self.movies.list_library().await?;
        let rows: Vec<DownloadedMovie> = library.iter().map(DownloadedMovie::from).collect();
        self.inventory.replace_movies(&rows).await?;
        self.metrics
            .set_inventory_rows("downloaded_movies", rows.len());
        info!(rows = rows.len(), "movie inventory replaced");
        Ok(rows.len())
    }

    /// Replace the show inventory; returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the library listing or the replace fails.
    pub async fn sync_shows(&self) -> anyhow::Result<usize> {
        let library = self.series.list_library().await?;
        let rows: Vec<DownloadedShow> = library.iter().flat_map(DownloadedShow::rows_for).collect();
        self.inventory.replace_shows(&rows).await?;
        self.metrics.set_inventory_rows("downloaded_shows", rows.len());
        info!(rows = rows.len(), "show inventory replaced");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabridge_core::{MovieSnapshot, SeasonSnapshot, SeriesSnapshot, ShowEntry};
    use mediabridge_test_support::fakes::{
        FakeMovieTool, FakeSeriesTool, MemoryInventory, ToolFailures,
    };

    fn season(season_number: i32, files: i32, total: i32) -> SeasonSnapshot {
        SeasonSnapshot {
            season_number,
            monitored: true,
            episode_file_count: files,
            episode_count: total,
            total_episode_count: total,
            size_on_disk: i64::from(files) * 1_000_000,
        }
    }

    fn show() -> SeriesSnapshot {
        SeriesSnapshot {
            tool_series_id: 4,
            title: "Show".into(),
            overview: None,
            poster_url: None,
            year: Some(2008),
            path: Some("/tv/Show".into()),
            monitored: true,
            imdb_id: None,
            tvdb_id: Some(81189),
            first_aired: None,
            added: None,
            size_on_disk: 10_000_000,
            seasons: vec![season(0, 1, 3), season(1, 7, 7), season(2, 3, 13)],
        }
    }

    fn movie() -> MovieSnapshot {
        MovieSnapshot {
            tool_movie_id: 1,
            title: "The Matrix".into(),
            overview: None,
            size_on_disk: 2_147_483_648,
            poster_url: None,
            year: Some(1999),
            has_file: true,
            path: None,
            monitored: true,
            runtime: Some(136),
            imdb_id: None,
            tmdb_id: Some(603),
            added: None,
        }
    }

    struct Harness {
        movies: Arc<FakeMovieTool>,
        series: Arc<FakeSeriesTool>,
        inventory: Arc<MemoryInventory>,
        metrics: ReconcileMetrics,
        sync: LibrarySync,
    }

    fn harness() -> Harness {
        let movies = Arc::new(FakeMovieTool::default());
        let series = Arc::new(FakeSeriesTool::default());
        let inventory = Arc::new(MemoryInventory::default());
        let metrics = ReconcileMetrics::new().expect("metrics");
        let sync = LibrarySync::new(
            movies.clone(),
            series.clone(),
            inventory.clone(),
            metrics.clone(),
        );
        Harness {
            movies,
            series,
            inventory,
            metrics,
            sync,
        }
    }

    #[tokio::test]
    async fn show_sync_writes_show_and_non_special_seasons() {
        let h = harness();
        h.series.set_library(vec![show()]).await;

        assert_eq!(h.sync.sync_shows().await.expect("sync"), 3);
        let rows = h.inventory.shows().await;
        assert_eq!(rows[0].entry_key, "show/81189");
        assert!(!rows[0].has_file);
        assert!(matches!(rows[1].entry, ShowEntry::Season { season_number: 1, .. }));
        assert!(rows[1].has_file);
        assert!(!rows[2].has_file);
        assert!(
            h.metrics
                .render()
                .expect("render")
                .contains("inventory_rows{table=\"downloaded_shows\"} 3")
        );
    }

    #[tokio::test]
    async fn repeated_syncs_leave_identical_tables() {
        let h = harness();
        h.movies.set_library(vec![movie()]).await;
        h.series.set_library(vec![show()]).await;

        h.sync.sync_movies().await.expect("first movies");
        h.sync.sync_shows().await.expect("first shows");
        let (movies, shows) = (h.inventory.movies().await, h.inventory.shows().await);
        h.sync.sync_movies().await.expect("second movies");
        h.sync.sync_shows().await.expect("second shows");

        assert_eq!(h.inventory.movies().await, movies);
        assert_eq!(h.inventory.shows().await, shows);
        assert_eq!(h.inventory.replacements().await, (2, 2));
        assert!((movies[0].size_gib - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_listing_keeps_the_previous_snapshot() {
        let h = harness();
        h.movies.set_library(vec![movie()]).await;
        h.sync.sync_movies().await.expect("sync");

        h.movies
            .set_failures(ToolFailures {
                library: true,
                ..ToolFailures::default()
            })
            .await;
        assert!(h.sync.sync_movies().await.is_err());
        assert_eq!(h.inventory.movies().await.len(), 1);
        assert_eq!(h.inventory.replacements().await, (1, 0));
    }
}
