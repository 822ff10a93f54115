//! Inventory snapshot tables, replaced wholesale on every library sync.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mediabridge_core::{DownloadedMovie, DownloadedShow, InventoryStore, ShowEntry};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::config::run_migrations;
use crate::error::{DataError, Result, map_query_err};

const INSERT_MOVIE: &str = r"
    INSERT INTO downloaded_movies (
        tool_movie_id, title, overview, has_file, added, release_year, imdb_id, tmdb_id,
        poster_url, size_gib, path, monitored, runtime
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
";

const INSERT_SHOW: &str = r"
    INSERT INTO downloaded_shows (
        entry_key, entry_type, tool_series_id, title, overview, has_file, added, imdb_id,
        tvdb_id, poster_url, size_gib, path, monitored, amount_of_seasons, release_date,
        season_number, episodes_in_season, episodes_downloaded
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
";

const SELECT_MOVIES: &str = r"
    SELECT tool_movie_id, title, overview, has_file, added, release_year, imdb_id, tmdb_id,
           poster_url, size_gib, path, monitored, runtime
    FROM downloaded_movies
    ORDER BY tool_movie_id
";

const SELECT_SHOWS: &str = r"
    SELECT entry_key, entry_type, tool_series_id, title, overview, has_file, added, imdb_id,
           tvdb_id, poster_url, size_gib, path, monitored, amount_of_seasons, release_date,
           season_number, episodes_in_season, episodes_downloaded
    FROM downloaded_shows
    ORDER BY entry_key
";

#[derive(Debug, FromRow)]
struct MovieRow {
    tool_movie_id: i32,
    title: String,
    overview: Option<String>,
    has_file: bool,
    added: Option<DateTime<Utc>>,
    release_year: Option<i32>,
    imdb_id: Option<String>,
    tmdb_id: Option<i32>,
    poster_url: Option<String>,
    size_gib: f64,
    path: Option<String>,
    monitored: bool,
    runtime: Option<i32>,
}

impl From<MovieRow> for DownloadedMovie {
    fn from(row: MovieRow) -> Self {
        Self {
            tool_movie_id: row.tool_movie_id,
            title: row.title,
            overview: row.overview,
            has_file: row.has_file,
            added: row.added,
            year: row.release_year,
            imdb_id: row.imdb_id,
            tmdb_id: row.tmdb_id,
            poster_url: row.poster_url,
            size_gib: row.size_gib,
            path: row.path,
            monitored: row.monitored,
            runtime: row.runtime,
        }
    }
}

#[derive(Debug, FromRow)]
struct ShowRow {
    entry_key: String,
    entry_type: String,
    tool_series_id: i32,
    title: String,
    overview: Option<String>,
    has_file: bool,
    added: Option<DateTime<Utc>>,
    imdb_id: Option<String>,
    tvdb_id: Option<i32>,
    poster_url: Option<String>,
    size_gib: f64,
    path: Option<String>,
    monitored: bool,
    amount_of_seasons: Option<i32>,
    release_date: Option<NaiveDate>,
    season_number: Option<i32>,
    episodes_in_season: Option<i32>,
    episodes_downloaded: Option<i32>,
}

impl TryFrom<ShowRow> for DownloadedShow {
    type Error = DataError;

    fn try_from(row: ShowRow) -> Result<Self> {
        let invalid = |reason: &'static str| DataError::InvalidRow {
            table: "downloaded_shows",
            id: i64::from(row.tool_series_id),
            reason,
            source: None,
        };
        let entry = match row.entry_type.as_str() {
            "show" => ShowEntry::Show {
                amount_of_seasons: row.amount_of_seasons.unwrap_or_default(),
                release_date: row.release_date,
            },
            "season" => ShowEntry::Season {
                season_number: row
                    .season_number
                    .ok_or_else(|| invalid("missing season_number"))?,
                episodes_in_season: row.episodes_in_season.unwrap_or_default(),
                episodes_downloaded: row.episodes_downloaded.unwrap_or_default(),
            },
            _ => return Err(invalid("unknown entry_type")),
        };
        Ok(Self {
            entry_key: row.entry_key,
            tool_series_id: row.tool_series_id,
            title: row.title,
            overview: row.overview,
            has_file: row.has_file,
            added: row.added,
            imdb_id: row.imdb_id,
            tvdb_id: row.tvdb_id,
            poster_url: row.poster_url,
            size_gib: row.size_gib,
            path: row.path,
            monitored: row.monitored,
            entry,
        })
    }
}

/// Database-backed repository for the inventory snapshot tables.
#[derive(Clone)]
pub struct InventorySnapshotStore {
    pool: PgPool,
}

impl InventorySnapshotStore {
    /// Initialise the store, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail or the database is unreachable.
    pub async fn new(pool: PgPool) -> Result<Self> {
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Current movie inventory ordered by tool id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn movies(&self) -> Result<Vec<DownloadedMovie>> {
        let rows = sqlx::query_as::<_, MovieRow>(SELECT_MOVIES)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("list downloaded movies"))?;
        Ok(rows.into_iter().map(DownloadedMovie::from).collect())
    }

    /// Current show inventory ordered by entry key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub async fn shows(&self) -> Result<Vec<DownloadedShow>> {
        let rows = sqlx::query_as::<_, ShowRow>(SELECT_SHOWS)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("list downloaded shows"))?;
        rows.into_iter().map(DownloadedShow::try_from).collect()
    }

    async fn write_movies(&self, movies: &[DownloadedMovie]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_query_err("begin movie inventory replace"))?;
        sqlx::query("DELETE FROM downloaded_movies")
            .execute(tx.as_mut())
            .await
            .map_err(map_query_err("clear downloaded movies"))?;
        for movie in movies {
            sqlx::query(INSERT_MOVIE)
                .bind(movie.tool_movie_id)
                .bind(&movie.title)
                .bind(&movie.overview)
                .bind(movie.has_file)
                .bind(movie.added)
                .bind(movie.year)
                .bind(&movie.imdb_id)
                .bind(movie.tmdb_id)
                .bind(&movie.poster_url)
                .bind(movie.size_gib)
                .bind(&movie.path)
                .bind(movie.monitored)
                .bind(movie.runtime)
                .execute(tx.as_mut())
                .await
                .map_err(map_query_err("insert downloaded movie"))?;
        }
        tx.commit()
            .await
            .map_err(map_query_err("commit movie inventory replace"))?;
        debug!(rows = movies.len(), "movie inventory replaced");
        Ok(())
    }

    async fn write_shows(&self, shows: &[DownloadedShow]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_query_err("begin show inventory replace"))?;
        sqlx::query("DELETE FROM downloaded_shows")
            .execute(tx.as_mut())
            .await
            .map_err(map_query_err("clear downloaded shows"))?;
        for show in shows {
            let (amount_of_seasons, release_date, season_number, in_season, downloaded) =
                match show.entry {
                    ShowEntry::Show {
                        amount_of_seasons,
                        release_date,
                    } => (Some(amount_of_seasons), release_date, None, None, None),
                    ShowEntry::Season {
                        season_number,
                        episodes_in_season,
                        episodes_downloaded,
                    } => (
                        None,
                        None,
                        Some(season_number),
                        Some(episodes_in_season),
                        Some(episodes_downloaded),
                    ),
                };
            sqlx::query(INSERT_SHOW)
                .bind(&show.entry_key)
                .bind(show.entry.label())
                .bind(show.tool_series_id)
                .bind(&show.title)
                .bind(&show.overview)
                .bind(show.has_file)
                .bind(show.added)
                .bind(&show.imdb_id)
                .bind(show.tvdb_id)
                .bind(&show.poster_url)
                .bind(show.size_gib)
                .bind(&show.path)
                .bind(show.monitored)
                .bind(amount_of_seasons)
                .bind(release_date)
                .bind(season_number)
                .bind(in_season)
                .bind(downloaded)
                .execute(tx.as_mut())
                .await
                .map_err(map_query_err("insert downloaded show"))?;
        }
        tx.commit()
            .await
            .map_err(map_query_err("commit show inventory replace"))?;
        debug!(rows = shows.len(), "show inventory replaced");
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for InventorySnapshotStore {
    async fn replace_movies(&self, movies: &[DownloadedMovie]) -> anyhow::Result<()> {
        self.write_movies(movies)
            .await
            .context("failed to replace movie inventory")
    }

    async fn replace_shows(&self, shows: &[DownloadedShow]) -> anyhow::Result<()> {
        self.write_shows(shows)
            .await
            .context("failed to replace show inventory")
    }
}
