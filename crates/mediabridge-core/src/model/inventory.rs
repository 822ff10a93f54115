//! Inventory snapshot rows derived from the acquisition tools' libraries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{MovieSnapshot, SeasonSnapshot, SeriesSnapshot};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a byte count to GiB rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn size_in_gib(bytes: i64) -> f64 {
    if bytes <= 0 {
        return 0.0;
    }
    ((bytes as f64 / BYTES_PER_GIB) * 100.0).round() / 100.0
}

/// A row of the downloaded-movies inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedMovie {
    /// Movie tool's internal id; primary key of the inventory.
    pub tool_movie_id: i32,
    /// Title.
    pub title: String,
    /// Synopsis.
    pub overview: Option<String>,
    /// Whether the movie file is on disk.
    pub has_file: bool,
    /// When the tool added the movie.
    pub added: Option<DateTime<Utc>>,
    /// Release year.
    pub year: Option<i32>,
    /// IMDb id.
    pub imdb_id: Option<String>,
    /// TMDb id.
    pub tmdb_id: Option<i32>,
    /// Poster URL.
    pub poster_url: Option<String>,
    /// Size on disk in GiB.
    pub size_gib: f64,
    /// Library path.
    pub path: Option<String>,
    /// Whether the tool monitors the movie.
    pub monitored: bool,
    /// Runtime in minutes.
    pub runtime: Option<i32>,
}

impl From<&MovieSnapshot> for DownloadedMovie {
    fn from(movie: &MovieSnapshot) -> Self {
        Self {
            tool_movie_id: movie.tool_movie_id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            has_file: movie.has_file,
            added: movie.added,
            year: movie.year,
            imdb_id: movie.imdb_id.clone(),
            tmdb_id: movie.tmdb_id,
            poster_url: movie.poster_url.clone(),
            size_gib: size_in_gib(movie.size_on_disk),
            path: movie.path.clone(),
            monitored: movie.monitored,
            runtime: movie.runtime,
        }
    }
}

/// Row-type specific fields of a [`DownloadedShow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShowEntry {
    /// The show itself.
    Show {
        /// Number of regular (non-special) seasons.
        amount_of_seasons: i32,
        /// First air date.
        release_date: Option<NaiveDate>,
    },
    /// One season of a show.
    Season {
        /// Season number.
        season_number: i32,
        /// All episodes in the season.
        episodes_in_season: i32,
        /// Episodes with files on disk.
        episodes_downloaded: i32,
    },
}

impl ShowEntry {
    /// Storage label for the row type.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Show { .. } => "show",
            Self::Season { .. } => "season",
        }
    }
}

/// A row of the downloaded-shows inventory: either a show or one of its seasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedShow {
    /// Deterministic primary key, `show/{tvdb}` or `season/{tvdb}/{n}`.
    ///
    /// Series without a TVDB id use `tool-{id}` in place of the TVDB id so the two id
    /// spaces never collide.
    pub entry_key: String,
    /// Series tool's internal id.
    pub tool_series_id: i32,
    /// Title; seasons use `"{show} S{n}"`.
    pub title: String,
    /// Synopsis (shows only).
    pub overview: Option<String>,
    /// Whether the show or season is fully on disk.
    pub has_file: bool,
    /// When the tool added the show.
    pub added: Option<DateTime<Utc>>,
    /// IMDb id.
    pub imdb_id: Option<String>,
    /// TVDB id.
    pub tvdb_id: Option<i32>,
    /// Poster URL (shows only).
    pub poster_url: Option<String>,
    /// Size on disk in GiB.
    pub size_gib: f64,
    /// Library path (shows only).
    pub path: Option<String>,
    /// Whether the tool monitors the show or season.
    pub monitored: bool,
    /// Show or season specific fields.
    pub entry: ShowEntry,
}

impl DownloadedShow {
    /// Expand one library series into its show row followed by its season rows.
    ///
    /// Specials (season 0) are skipped.
    #[must_use]
    pub fn rows_for(series: &SeriesSnapshot) -> Vec<Self> {
        let key_id = series.tvdb_id.map_or_else(
            || format!("tool-{}", series.tool_series_id),
            |tvdb| tvdb.to_string(),
        );
        let seasons: Vec<Self> = series
            .seasons
            .iter()
            .filter(|season| season.season_number != 0)
            .map(|season| season_row(series, season, &key_id))
            .collect();

        let show = Self {
            entry_key: format!("show/{key_id}"),
            tool_series_id: series.tool_series_id,
            title: series.title.clone(),
            overview: series.overview.clone(),
            has_file: !seasons.is_empty() && seasons.iter().all(|season| season.has_file),
            added: series.added,
            imdb_id: series.imdb_id.clone(),
            tvdb_id: series.tvdb_id,
            poster_url: series.poster_url.clone(),
            size_gib: size_in_gib(series.size_on_disk),
            path: series.path.clone(),
            monitored: series.monitored,
            entry: ShowEntry::Show {
                amount_of_seasons: i32::try_from(seasons.len()).unwrap_or(i32::MAX),
                release_date: series.first_aired,
            },
        };

        let mut rows = Vec::with_capacity(seasons.len() + 1);
        rows.push(show);
        rows.extend(seasons);
        rows
    }
}

fn season_row(series: &SeriesSnapshot, season: &SeasonSnapshot, key_id: &str) -> DownloadedShow {
    let downloaded = if season.size_on_disk > 0 {
        season.episode_file_count
    } else {
        0
    };
    let total = season.total_episode_count;
    DownloadedShow {
        entry_key: format!("season/{key_id}/{}", season.season_number),
        tool_series_id: series.tool_series_id,
        title: format!("{} S{}", series.title, season.season_number),
        overview: None,
        has_file: total > 0 && downloaded == total,
        added: series.added,
        imdb_id: series.imdb_id.clone(),
        tvdb_id: series.tvdb_id,
        poster_url: None,
        size_gib: size_in_gib(season.size_on_disk),
        path: None,
        monitored: season.monitored,
        entry: ShowEntry::Season {
            season_number: season.season_number,
            episodes_in_season: total,
            episodes_downloaded: downloaded,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(number: i32, files: i32, total: i32, size: i64) -> SeasonSnapshot {
        SeasonSnapshot {
            season_number: number,
            monitored: true,
            episode_file_count: files,
            episode_count: total,
            total_episode_count: total,
            size_on_disk: size,
        }
    }

    fn series(seasons: Vec<SeasonSnapshot>) -> SeriesSnapshot {
        SeriesSnapshot {
            tool_series_id: 4,
            title: "Dark".into(),
            tvdb_id: Some(334_824),
            size_on_disk: 3 * 1024 * 1024 * 1024,
            seasons,
            ..SeriesSnapshot::default()
        }
    }

    #[test]
    fn gib_is_rounded_to_two_decimals() {
        assert!((size_in_gib(0) - 0.0).abs() < f64::EPSILON);
        assert!((size_in_gib(-5) - 0.0).abs() < f64::EPSILON);
        assert!((size_in_gib(1_610_612_736) - 1.5).abs() < f64::EPSILON);
        assert!((size_in_gib(1_000_000_000) - 0.93).abs() < f64::EPSILON);
    }

    #[test]
    fn season_has_file_requires_every_episode() {
        let rows = DownloadedShow::rows_for(&series(vec![
            season(0, 2, 2, 10),
            season(1, 8, 8, 100),
            season(2, 3, 8, 100),
            season(3, 0, 0, 0),
        ]));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].entry_key, "show/334824");
        assert_eq!(
            rows[0].entry,
            ShowEntry::Show {
                amount_of_seasons: 3,
                release_date: None
            }
        );
        assert!(!rows[0].has_file);

        assert_eq!(rows[1].entry_key, "season/334824/1");
        assert_eq!(rows[1].title, "Dark S1");
        assert!(rows[1].has_file);
        assert!(!rows[2].has_file);
        assert!(!rows[3].has_file, "empty season is never complete");
    }

    #[test]
    fn downloaded_count_ignores_files_without_size() {
        let rows = DownloadedShow::rows_for(&series(vec![season(1, 6, 6, 0)]));
        assert_eq!(
            rows[1].entry,
            ShowEntry::Season {
                season_number: 1,
                episodes_in_season: 6,
                episodes_downloaded: 0
            }
        );
        assert!(!rows[1].has_file);
        assert!(!rows[0].has_file);
    }

    #[test]
    fn show_is_complete_when_all_seasons_are() {
        let rows = DownloadedShow::rows_for(&series(vec![season(1, 2, 2, 5), season(2, 4, 4, 5)]));
        assert!(rows.iter().all(|row| row.has_file));
        assert_eq!(rows[0].entry.label(), "show");
        assert_eq!(rows[2].entry.label(), "season");
    }

    #[test]
    fn series_without_tvdb_id_get_their_own_keys() {
        let tracked = series(vec![season(1, 1, 1, 5)]);
        let mut untracked = series(vec![season(1, 1, 1, 5)]);
        untracked.tool_series_id = 334_824;
        untracked.tvdb_id = None;

        let rows = DownloadedShow::rows_for(&untracked);
        assert_eq!(rows[0].entry_key, "show/tool-334824");
        assert_eq!(rows[1].entry_key, "season/tool-334824/1");

        let mut keys: Vec<String> = DownloadedShow::rows_for(&tracked)
            .into_iter()
            .chain(rows)
            .map(|row| row.entry_key)
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn show_without_seasons_is_not_complete() {
        let rows = DownloadedShow::rows_for(&series(Vec::new()));
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].has_file);
    }
}
