//! Download request domain types and the DTOs exchanged with acquisition tools.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

mod inventory;

pub use inventory::{DownloadedMovie, DownloadedShow, ShowEntry, size_in_gib};

/// Kind of media a download request tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A single feature film.
    Movie,
    /// A whole series; its progress is derived from its episodes.
    Series,
    /// One episode belonging to a tracked series.
    Episode,
}

impl MediaKind {
    /// Stable label used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Episode => "episode",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            "episode" => Ok(Self::Episode),
            other => Err(CoreError::UnknownMediaKind {
                value: other.to_string(),
            }),
        }
    }
}

/// Canonical lifecycle status of a download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for the acquisition tool to pick it up.
    #[default]
    Queued,
    /// Transfer in progress.
    Downloading,
    /// Transfer paused by the tool or the user.
    Paused,
    /// Transfer finished, files being imported.
    Importing,
    /// The tool flagged a problem that may resolve itself.
    Warning,
    /// The tool gave up on the transfer.
    Failed,
    /// Media is available.
    Completed,
}

impl RequestStatus {
    /// Stable label used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Importing => "importing",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "queued" => Ok(Self::Queued),
            "downloading" => Ok(Self::Downloading),
            "paused" => Ok(Self::Paused),
            "importing" => Ok(Self::Importing),
            "warning" => Ok(Self::Warning),
            "failed" => Ok(Self::Failed),
            "completed" => Ok(Self::Completed),
            other => Err(CoreError::UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// External identifiers of the media a request tracks, one shape per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaIdentity {
    /// A movie, keyed by its catalog id.
    Movie {
        /// Catalog (TMDb) identifier.
        movie_id: i32,
        /// Movie tool's internal identifier once the queue has reported it.
        tool_movie_id: Option<i32>,
    },
    /// A series, keyed by its externally stable id.
    Series {
        /// Catalog (TVDB) identifier.
        series_id: i32,
    },
    /// An episode of a tracked series.
    Episode {
        /// Catalog (TVDB) identifier of the parent series.
        series_id: i32,
        /// Series tool's episode identifier.
        episode_id: i32,
        /// Series tool's internal identifier for the parent series.
        tool_series_id: i32,
        /// Season number.
        season_number: i32,
        /// Episode number within the season.
        episode_number: i32,
        /// Original air date when the tool knows it.
        air_date: Option<DateTime<Utc>>,
    },
}

impl MediaIdentity {
    /// Kind implied by the identity.
    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        match self {
            Self::Movie { .. } => MediaKind::Movie,
            Self::Series { .. } => MediaKind::Series,
            Self::Episode { .. } => MediaKind::Episode,
        }
    }

    /// Catalog movie id, for movies.
    #[must_use]
    pub const fn movie_id(&self) -> Option<i32> {
        match self {
            Self::Movie { movie_id, .. } => Some(*movie_id),
            _ => None,
        }
    }

    /// Series catalog id, for series and episodes.
    #[must_use]
    pub const fn series_id(&self) -> Option<i32> {
        match self {
            Self::Series { series_id } | Self::Episode { series_id, .. } => Some(*series_id),
            Self::Movie { .. } => None,
        }
    }

    /// Series tool episode id, for episodes.
    #[must_use]
    pub const fn episode_id(&self) -> Option<i32> {
        match self {
            Self::Episode { episode_id, .. } => Some(*episode_id),
            _ => None,
        }
    }
}

/// Display metadata captured when the request was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MediaDetails {
    /// Human readable title.
    pub title: String,
    /// Synopsis, if any.
    pub description: Option<String>,
    /// Poster image URL.
    pub poster_url: Option<String>,
    /// Release year.
    pub release_year: Option<i32>,
}

/// Mutable progress fields of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestProgress {
    /// Canonical status.
    pub status: RequestStatus,
    /// Completion percentage, 0 through 100.
    pub percent: u8,
    /// Estimated minutes remaining, when known.
    pub minutes_left: Option<u32>,
}

impl RequestProgress {
    /// Progress of a request that has just been submitted.
    #[must_use]
    pub const fn queued() -> Self {
        Self {
            status: RequestStatus::Queued,
            percent: 0,
            minutes_left: None,
        }
    }

    /// Progress of a finished request.
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            status: RequestStatus::Completed,
            percent: 100,
            minutes_left: Some(0),
        }
    }
}

/// A tracked acquisition unit and its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Store-assigned identifier.
    pub id: i64,
    /// What is being acquired.
    pub identity: MediaIdentity,
    /// Display metadata.
    pub details: MediaDetails,
    /// Latest observed progress.
    pub progress: RequestProgress,
    /// Owning user.
    pub user_id: i64,
    /// When the request was submitted.
    pub requested_at: DateTime<Utc>,
    /// When progress was last written.
    pub updated_at: DateTime<Utc>,
    /// When the request first reached `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl DownloadRequest {
    /// Kind of media this request tracks.
    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        self.identity.kind()
    }

    /// Apply an observed progress value.
    ///
    /// Returns `true` when this observation is the request's first transition into
    /// `completed`. `completed_at` is stamped at most once and never cleared.
    pub fn observe(&mut self, progress: RequestProgress, now: DateTime<Utc>) -> bool {
        self.progress = progress;
        self.updated_at = now;
        if progress.status == RequestStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
            return true;
        }
        false
    }

    /// Mark the request finished regardless of what the tools report.
    pub fn force_complete(&mut self, now: DateTime<Utc>) -> bool {
        self.observe(RequestProgress::completed(), now)
    }

    /// Record the movie tool's internal id on a movie request.
    pub fn record_tool_movie_id(&mut self, id: i32) {
        if let MediaIdentity::Movie { tool_movie_id, .. } = &mut self.identity {
            *tool_movie_id = Some(id);
        }
    }
}

/// An episode request discovered in a queue that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDownloadRequest {
    /// Episode identity.
    pub identity: MediaIdentity,
    /// Display metadata.
    pub details: MediaDetails,
    /// Initial progress.
    pub progress: RequestProgress,
    /// Owner inherited from the parent series request.
    pub user_id: i64,
    /// Creation time, also used as the first update time.
    pub requested_at: DateTime<Utc>,
}

/// Mutations collected during one processor pass, persisted together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBatch {
    /// Existing requests to overwrite.
    pub updated: Vec<DownloadRequest>,
    /// Requests to insert.
    pub inserted: Vec<NewDownloadRequest>,
}

impl RequestBatch {
    /// Whether there is nothing to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.inserted.is_empty()
    }

    /// Queue an updated request, replacing an earlier copy with the same id.
    pub fn upsert(&mut self, request: DownloadRequest) {
        if let Some(existing) = self.updated.iter_mut().find(|item| item.id == request.id) {
            *existing = request;
        } else {
            self.updated.push(request);
        }
    }
}

/// One entry of the movie tool's download queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieQueueRecord {
    /// Movie tool's internal movie id.
    pub tool_movie_id: i32,
    /// Raw status label.
    pub status: Option<String>,
    /// Total size in bytes.
    pub size: Option<i64>,
    /// Remaining bytes.
    pub size_left: Option<i64>,
    /// Remaining time as `HH:MM:SS` or `MM:SS`.
    pub time_left: Option<String>,
    /// Torrent info hash.
    pub torrent_id: Option<String>,
    /// Queue entry id used for removal.
    pub queue_id: i64,
}

/// One entry of the series tool's download queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesQueueRecord {
    /// Series tool's internal series id.
    pub tool_series_id: i32,
    /// Series tool's episode id.
    pub episode_id: i32,
    /// Raw status label.
    pub status: Option<String>,
    /// Total size in bytes.
    pub size: Option<i64>,
    /// Remaining bytes.
    pub size_left: Option<i64>,
    /// Remaining time as `HH:MM:SS` or `MM:SS`.
    pub time_left: Option<String>,
    /// Torrent info hash.
    pub torrent_id: Option<String>,
    /// Queue entry id used for removal.
    pub queue_id: i64,
}

/// Series metadata needed to correlate queue entries with requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Catalog (TVDB) identifier.
    pub series_id: i32,
}

/// Episode listing entry from the series tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    /// Series tool's episode id.
    pub id: i32,
    /// Season number.
    pub season_number: i32,
    /// Episode number within the season.
    pub episode_number: i32,
    /// Episode title.
    pub title: Option<String>,
    /// Air date, if known.
    pub air_date: Option<DateTime<Utc>>,
}

/// Torrent client telemetry for a single transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Info hash.
    pub torrent_id: String,
    /// Torrent name.
    pub name: Option<String>,
    /// Raw client state label.
    pub state: String,
    /// Distributed copies available in the swarm.
    pub availability: f64,
    /// Connected seeds.
    pub num_seeds: i64,
    /// Download speed in bytes per second.
    pub download_speed: i64,
    /// Upload speed in bytes per second.
    pub upload_speed: i64,
    /// Unix timestamp the torrent was added.
    pub added_on: i64,
    /// Unix timestamp of the last piece exchange.
    pub last_activity: i64,
    /// Completion fraction, 0.0 through 1.0.
    pub progress: f64,
}

/// Movie listing entry from the movie tool's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MovieSnapshot {
    /// Movie tool's internal id.
    pub tool_movie_id: i32,
    /// Title.
    pub title: String,
    /// Synopsis.
    pub overview: Option<String>,
    /// Bytes on disk.
    pub size_on_disk: i64,
    /// First poster URL.
    pub poster_url: Option<String>,
    /// Release year.
    pub year: Option<i32>,
    /// Whether the movie file is present.
    pub has_file: bool,
    /// Library path.
    pub path: Option<String>,
    /// Whether the tool monitors the movie.
    pub monitored: bool,
    /// Runtime in minutes.
    pub runtime: Option<i32>,
    /// IMDb id.
    pub imdb_id: Option<String>,
    /// TMDb id.
    pub tmdb_id: Option<i32>,
    /// When the tool added the movie.
    pub added: Option<DateTime<Utc>>,
}

/// Series listing entry from the series tool's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SeriesSnapshot {
    /// Series tool's internal id.
    pub tool_series_id: i32,
    /// Title.
    pub title: String,
    /// Synopsis.
    pub overview: Option<String>,
    /// First poster URL.
    pub poster_url: Option<String>,
    /// Premiere year.
    pub year: Option<i32>,
    /// Library path.
    pub path: Option<String>,
    /// Whether the tool monitors the series.
    pub monitored: bool,
    /// IMDb id.
    pub imdb_id: Option<String>,
    /// TVDB id.
    pub tvdb_id: Option<i32>,
    /// First air date.
    pub first_aired: Option<NaiveDate>,
    /// When the tool added the series.
    pub added: Option<DateTime<Utc>>,
    /// Bytes on disk for the whole series.
    pub size_on_disk: i64,
    /// Per-season statistics.
    pub seasons: Vec<SeasonSnapshot>,
}

/// Per-season statistics inside a [`SeriesSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeasonSnapshot {
    /// Season number; 0 holds specials.
    pub season_number: i32,
    /// Whether the tool monitors the season.
    pub monitored: bool,
    /// Episodes with a file on disk.
    pub episode_file_count: i32,
    /// Episodes that have aired.
    pub episode_count: i32,
    /// All episodes, aired or not.
    pub total_episode_count: i32,
    /// Bytes on disk.
    pub size_on_disk: i64,
}
