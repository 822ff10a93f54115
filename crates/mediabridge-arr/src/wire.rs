//! JSON shapes returned by the external tools and their conversion into core types.

use chrono::{DateTime, NaiveDate, Utc};
use mediabridge_core::{
    EpisodeInfo, HealthRecord, MovieQueueRecord, MovieSnapshot, SeasonSnapshot,
    SeriesQueueRecord, SeriesSnapshot,
};
use serde::Deserialize;

/// Paged queue payload; only the records are used.
#[derive(Debug, Deserialize)]
pub(crate) struct QueuePage<T> {
    #[serde(default = "Vec::new")]
    pub(crate) records: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MovieQueueEntry {
    movie_id: Option<i32>,
    status: Option<String>,
    size: Option<f64>,
    #[serde(rename = "sizeleft")]
    size_left: Option<f64>,
    #[serde(rename = "timeleft")]
    time_left: Option<String>,
    download_id: Option<String>,
    id: i64,
}

impl MovieQueueEntry {
    /// Entries without a movie id cannot be correlated and are dropped.
    pub(crate) fn into_record(self) -> Option<MovieQueueRecord> {
        Some(MovieQueueRecord {
            tool_movie_id: self.movie_id?,
            status: self.status,
            size: bytes(self.size),
            size_left: bytes(self.size_left),
            time_left: self.time_left,
            torrent_id: self.download_id,
            queue_id: self.id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesQueueEntry {
    series_id: Option<i32>,
    episode_id: Option<i32>,
    status: Option<String>,
    size: Option<f64>,
    #[serde(rename = "sizeleft")]
    size_left: Option<f64>,
    #[serde(rename = "timeleft")]
    time_left: Option<String>,
    download_id: Option<String>,
    id: i64,
}

impl SeriesQueueEntry {
    /// Entries missing either id cannot be grouped and are dropped.
    pub(crate) fn into_record(self) -> Option<SeriesQueueRecord> {
        Some(SeriesQueueRecord {
            tool_series_id: self.series_id?,
            episode_id: self.episode_id?,
            status: self.status,
            size: bytes(self.size),
            size_left: bytes(self.size_left),
            time_left: self.time_left,
            torrent_id: self.download_id,
            queue_id: self.id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MovieLookup {
    pub(crate) tmdb_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesLookup {
    pub(crate) tvdb_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpisodeEntry {
    id: i32,
    season_number: i32,
    episode_number: i32,
    title: Option<String>,
    air_date: Option<String>,
}

impl From<EpisodeEntry> for EpisodeInfo {
    fn from(entry: EpisodeEntry) -> Self {
        Self {
            id: entry.id,
            season_number: entry.season_number,
            episode_number: entry.episode_number,
            title: entry.title,
            air_date: entry.air_date.as_deref().and_then(parse_air_date),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Image {
    url: Option<String>,
    remote_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LibraryMovie {
    id: i32,
    title: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    size_on_disk: i64,
    #[serde(default)]
    images: Vec<Image>,
    year: Option<i32>,
    #[serde(default)]
    has_file: bool,
    path: Option<String>,
    #[serde(default)]
    monitored: bool,
    runtime: Option<i32>,
    imdb_id: Option<String>,
    tmdb_id: Option<i32>,
    added: Option<DateTime<Utc>>,
}

impl From<LibraryMovie> for MovieSnapshot {
    fn from(movie: LibraryMovie) -> Self {
        Self {
            tool_movie_id: movie.id,
            title: movie.title.unwrap_or_default(),
            overview: movie.overview,
            size_on_disk: movie.size_on_disk,
            poster_url: first_image(&movie.images),
            year: movie.year.filter(|year| *year > 0),
            has_file: movie.has_file,
            path: movie.path,
            monitored: movie.monitored,
            runtime: movie.runtime,
            imdb_id: movie.imdb_id,
            tmdb_id: movie.tmdb_id,
            added: movie.added,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesStatistics {
    #[serde(default)]
    size_on_disk: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeasonStatistics {
    #[serde(default)]
    episode_file_count: i32,
    #[serde(default)]
    episode_count: i32,
    #[serde(default)]
    total_episode_count: i32,
    #[serde(default)]
    size_on_disk: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LibrarySeason {
    season_number: i32,
    #[serde(default)]
    monitored: bool,
    statistics: Option<SeasonStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LibrarySeries {
    id: i32,
    title: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    seasons: Vec<LibrarySeason>,
    year: Option<i32>,
    path: Option<String>,
    #[serde(default)]
    monitored: bool,
    imdb_id: Option<String>,
    tvdb_id: Option<i32>,
    first_aired: Option<String>,
    added: Option<DateTime<Utc>>,
    statistics: Option<SeriesStatistics>,
}

impl From<LibrarySeries> for SeriesSnapshot {
    fn from(series: LibrarySeries) -> Self {
        let seasons = series
            .seasons
            .into_iter()
            .map(|season| {
                let stats = season.statistics.unwrap_or_default();
                SeasonSnapshot {
                    season_number: season.season_number,
                    monitored: season.monitored,
                    episode_file_count: stats.episode_file_count,
                    episode_count: stats.episode_count,
                    total_episode_count: stats.total_episode_count,
                    size_on_disk: stats.size_on_disk,
                }
            })
            .collect();
        Self {
            tool_series_id: series.id,
            title: series.title.unwrap_or_default(),
            overview: series.overview,
            poster_url: first_image(&series.images),
            year: series.year.filter(|year| *year > 0),
            path: series.path,
            monitored: series.monitored,
            imdb_id: series.imdb_id,
            tvdb_id: series.tvdb_id.filter(|id| *id > 0),
            first_aired: series
                .first_aired
                .as_deref()
                .and_then(parse_air_date)
                .map(|aired| aired.date_naive()),
            added: series.added,
            size_on_disk: series.statistics.unwrap_or_default().size_on_disk,
            seasons,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TorrentInfo {
    hash: String,
    name: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    availability: f64,
    #[serde(default)]
    num_seeds: i64,
    #[serde(default)]
    dlspeed: i64,
    #[serde(default)]
    upspeed: i64,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    last_activity: i64,
    #[serde(default)]
    progress: f64,
}

impl TorrentInfo {
    pub(crate) fn hash(&self) -> &str {
        &self.hash
    }
}

impl From<TorrentInfo> for HealthRecord {
    fn from(info: TorrentInfo) -> Self {
        Self {
            torrent_id: info.hash,
            name: info.name,
            state: info.state,
            availability: info.availability,
            num_seeds: info.num_seeds,
            download_speed: info.dlspeed,
            upload_speed: info.upspeed,
            added_on: info.added_on,
            last_activity: info.last_activity,
            progress: info.progress,
        }
    }
}

fn first_image(images: &[Image]) -> Option<String> {
    images
        .first()
        .and_then(|image| image.remote_url.clone().or_else(|| image.url.clone()))
}

/// Accepts a full RFC 3339 stamp or a bare `YYYY-MM-DD` date (taken as midnight UTC).
fn parse_air_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        })
}

/// Queue sizes arrive as JSON numbers that may carry a fractional part.
#[allow(clippy::cast_possible_truncation)]
fn bytes(value: Option<f64>) -> Option<i64> {
    value
        .filter(|bytes| bytes.is_finite())
        .map(|bytes| bytes.round() as i64)
}
