//! Builders for domain values used across test suites.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mediabridge_core::{
    DownloadRequest, EpisodeInfo, HealthRecord, MediaDetails, MediaIdentity, MovieQueueRecord,
    RequestProgress, RequestStatus, SeriesQueueRecord,
};

/// Fixed reference instant so tests do not depend on the wall clock.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn request(id: i64, identity: MediaIdentity, title: &str, now: DateTime<Utc>) -> DownloadRequest {
    DownloadRequest {
        id,
        identity,
        details: MediaDetails {
            title: title.to_string(),
            ..MediaDetails::default()
        },
        progress: RequestProgress::queued(),
        user_id: 1,
        requested_at: now - Duration::hours(1),
        updated_at: now - Duration::hours(1),
        completed_at: None,
    }
}

/// A queued movie request for catalog id `movie_id`.
#[must_use]
pub fn movie_request(id: i64, movie_id: i32, now: DateTime<Utc>) -> DownloadRequest {
    request(
        id,
        MediaIdentity::Movie {
            movie_id,
            tool_movie_id: None,
        },
        &format!("Movie {movie_id}"),
        now,
    )
}

/// A queued series request for catalog id `series_id`.
#[must_use]
pub fn series_request(id: i64, series_id: i32, now: DateTime<Utc>) -> DownloadRequest {
    request(
        id,
        MediaIdentity::Series { series_id },
        &format!("Series {series_id}"),
        now,
    )
}

/// An episode request in season 1 of `series_id`.
#[must_use]
pub fn episode_request(
    id: i64,
    series_id: i32,
    tool_series_id: i32,
    episode_id: i32,
    now: DateTime<Utc>,
) -> DownloadRequest {
    request(
        id,
        MediaIdentity::Episode {
            series_id,
            episode_id,
            tool_series_id,
            season_number: 1,
            episode_number: episode_id,
            air_date: None,
        },
        &format!("Episode {episode_id}"),
        now,
    )
}

/// Set a request's progress in place and return it.
#[must_use]
pub fn with_progress(
    mut request: DownloadRequest,
    status: RequestStatus,
    percent: u8,
    minutes_left: Option<u32>,
) -> DownloadRequest {
    request.progress = RequestProgress {
        status,
        percent,
        minutes_left,
    };
    request
}

/// A movie queue entry with the given size figures.
#[must_use]
pub fn movie_queue_record(
    tool_movie_id: i32,
    queue_id: i64,
    status: &str,
    size: i64,
    size_left: i64,
) -> MovieQueueRecord {
    MovieQueueRecord {
        tool_movie_id,
        status: Some(status.to_string()),
        size: Some(size),
        size_left: Some(size_left),
        time_left: None,
        torrent_id: Some(format!("HASH{queue_id}")),
        queue_id,
    }
}

/// A series queue entry with the given size figures.
#[must_use]
pub fn series_queue_record(
    tool_series_id: i32,
    episode_id: i32,
    queue_id: i64,
    status: &str,
    size: i64,
    size_left: i64,
) -> SeriesQueueRecord {
    SeriesQueueRecord {
        tool_series_id,
        episode_id,
        status: Some(status.to_string()),
        size: Some(size),
        size_left: Some(size_left),
        time_left: None,
        torrent_id: Some(format!("HASH{queue_id}")),
        queue_id,
    }
}

/// An episode listing entry in season 1.
#[must_use]
pub fn episode_info(id: i32, episode_number: i32, title: &str) -> EpisodeInfo {
    EpisodeInfo {
        id,
        season_number: 1,
        episode_number,
        title: Some(title.to_string()),
        air_date: Utc.with_ymd_and_hms(2008, 1, 20, 0, 0, 0).single(),
    }
}

/// A transfer that satisfies every stuck condition at `now`.
#[must_use]
pub fn stuck_health(torrent_id: &str, now: DateTime<Utc>) -> HealthRecord {
    let epoch = now.timestamp();
    HealthRecord {
        torrent_id: torrent_id.to_string(),
        name: None,
        state: "stalledDL".to_string(),
        availability: 0.0,
        num_seeds: 0,
        download_speed: 0,
        upload_speed: 0,
        added_on: epoch - 7200,
        last_activity: epoch - 1800,
        progress: 0.4,
    }
}

/// A transfer that is making progress at `now`.
#[must_use]
pub fn healthy_health(torrent_id: &str, now: DateTime<Utc>) -> HealthRecord {
    HealthRecord {
        download_speed: 1_048_576,
        num_seeds: 12,
        availability: 4.0,
        state: "downloading".to_string(),
        last_activity: now.timestamp(),
        ..stuck_health(torrent_id, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabridge_core::should_cull;

    #[test]
    fn health_fixtures_match_their_names() {
        let now = fixed_now();
        assert!(should_cull(&stuck_health("A", now), now.timestamp()));
        assert!(!should_cull(&healthy_health("A", now), now.timestamp()));
    }

    #[test]
    fn request_fixtures_carry_expected_identities() {
        let now = fixed_now();
        assert_eq!(movie_request(1, 603, now).identity.movie_id(), Some(603));
        assert_eq!(series_request(2, 81189, now).identity.series_id(), Some(81189));
        let episode = episode_request(3, 81189, 4, 55, now);
        assert_eq!(episode.identity.episode_id(), Some(55));
        assert!(episode.updated_at < now);
    }
}
