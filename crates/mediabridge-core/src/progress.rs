//! Progress math: percentages, remaining-time estimates and series aggregation.

use crate::model::{RequestProgress, RequestStatus};

/// Percentage complete from total and remaining bytes, truncated.
///
/// Absent or non-positive sizes yield 0. A missing remaining size counts as nothing
/// left. The result is clamped to 0..=100.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn percent(size: Option<i64>, size_left: Option<i64>) -> u8 {
    fraction_done(size, size_left).map_or(0, |fraction| {
        (fraction * 100.0).floor().clamp(0.0, 100.0) as u8
    })
}

/// Parse a `HH:MM:SS` or `MM:SS` duration into whole minutes.
///
/// Trailing seconds above 30 add one minute. Anything unparsable is unknown.
#[must_use]
pub fn parse_minutes(time_left: Option<&str>) -> Option<u32> {
    let time_left = time_left?.trim();
    if time_left.is_empty() {
        return None;
    }
    let fields = time_left
        .split(':')
        .map(|field| field.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    let (hours, minutes, seconds) = match fields.as_slice() {
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        [minutes, seconds] => (0, *minutes, *seconds),
        _ => return None,
    };
    let round_up = u32::from(seconds > 30);
    hours.checked_mul(60)?.checked_add(minutes)?.checked_add(round_up)
}

/// Remaining minutes projected against the progress made so far.
///
/// Divides the parsed remaining minutes by the completed fraction; unknown when no
/// progress has been made or the time cannot be parsed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn minutes_left_weighted(
    size: Option<i64>,
    size_left: Option<i64>,
    time_left: Option<&str>,
) -> Option<u32> {
    let fraction = fraction_done(size, size_left).filter(|fraction| *fraction > 0.0)?;
    let minutes = parse_minutes(time_left)?;
    let projected = (f64::from(minutes) / fraction).floor();
    Some(projected.min(f64::from(u32::MAX)) as u32)
}

#[allow(clippy::cast_precision_loss)]
fn fraction_done(size: Option<i64>, size_left: Option<i64>) -> Option<f64> {
    let size = size.filter(|size| *size > 0)?;
    let done = size - size_left.unwrap_or(0);
    Some(done as f64 / size as f64)
}

/// Derived progress of a series computed from its episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesAggregate {
    /// Progress to store on the series request.
    pub progress: RequestProgress,
    /// Number of episodes that contributed.
    pub episodes: usize,
}

/// Aggregate episode progress into the parent series' progress.
///
/// Returns `None` when there are no episodes. The series is `completed` only when every
/// episode is; otherwise any downloading episode wins over any queued one, and
/// `downloading` is the fallback. Minutes left is the mean over episodes reporting it,
/// rounded half to even.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn aggregate_series<'a, I>(episodes: I) -> Option<SeriesAggregate>
where
    I: IntoIterator<Item = &'a RequestProgress>,
{
    let mut count: u64 = 0;
    let mut percent_sum: u64 = 0;
    let mut minutes_sum: u64 = 0;
    let mut minutes_count: u64 = 0;
    let mut all_completed = true;
    let mut any_downloading = false;
    let mut any_queued = false;

    for episode in episodes {
        count += 1;
        percent_sum += u64::from(episode.percent);
        match episode.status {
            RequestStatus::Completed => {}
            status => {
                all_completed = false;
                any_downloading |= status == RequestStatus::Downloading;
                any_queued |= status == RequestStatus::Queued;
                if let Some(minutes) = episode.minutes_left {
                    minutes_sum += u64::from(minutes);
                    minutes_count += 1;
                }
            }
        }
    }

    if count == 0 {
        return None;
    }

    let percent = (percent_sum / count).min(100) as u8;
    let minutes_left = (minutes_count > 0).then(|| {
        let mean = (minutes_sum as f64) / (minutes_count as f64);
        mean.round_ties_even() as u32
    });
    let status = if all_completed {
        RequestStatus::Completed
    } else if any_downloading {
        RequestStatus::Downloading
    } else if any_queued {
        RequestStatus::Queued
    } else {
        RequestStatus::Downloading
    };

    Some(SeriesAggregate {
        progress: RequestProgress {
            status,
            percent,
            minutes_left,
        },
        episodes: usize::try_from(count).unwrap_or(usize::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(status: RequestStatus, percent: u8, minutes_left: Option<u32>) -> RequestProgress {
        RequestProgress {
            status,
            percent,
            minutes_left,
        }
    }

    #[test]
    fn percent_handles_edges() {
        assert_eq!(percent(Some(100), Some(100)), 0);
        assert_eq!(percent(Some(100), Some(0)), 100);
        assert_eq!(percent(Some(0), Some(50)), 0);
        assert_eq!(percent(None, Some(50)), 0);
        assert_eq!(percent(Some(1000), Some(250)), 75);
        assert_eq!(percent(Some(3), Some(2)), 33);
        assert_eq!(percent(Some(100), None), 100);
        assert_eq!(percent(Some(100), Some(150)), 0);
    }

    #[test]
    fn percent_is_monotonic_as_remaining_shrinks() {
        let size = 997;
        let mut last = 0;
        for left in (0..=size).rev() {
            let value = percent(Some(size), Some(left));
            assert!(value >= last);
            last = value;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn parse_minutes_follows_rounding_rule() {
        assert_eq!(parse_minutes(Some("01:02:03")), Some(62));
        assert_eq!(parse_minutes(Some("00:01:45")), Some(2));
        assert_eq!(parse_minutes(Some("00:01:30")), Some(1));
        assert_eq!(parse_minutes(Some("12:31")), Some(13));
        assert_eq!(parse_minutes(Some("")), None);
        assert_eq!(parse_minutes(None), None);
        assert_eq!(parse_minutes(Some("soon")), None);
        assert_eq!(parse_minutes(Some("1:2:3:4")), None);
        assert_eq!(parse_minutes(Some("-1:00")), None);
    }

    #[test]
    fn weighted_minutes_scale_by_progress() {
        assert_eq!(minutes_left_weighted(Some(100), Some(50), Some("00:10:00")), Some(20));
        assert_eq!(minutes_left_weighted(Some(100), Some(100), Some("00:10:00")), None);
        assert_eq!(minutes_left_weighted(None, None, Some("00:10:00")), None);
        assert_eq!(minutes_left_weighted(Some(100), Some(50), Some("bad")), None);
    }

    #[test]
    fn aggregate_truncates_mean_percent() {
        let episodes = [
            episode(RequestStatus::Completed, 100, Some(0)),
            episode(RequestStatus::Completed, 100, Some(0)),
            episode(RequestStatus::Downloading, 0, Some(30)),
        ];
        let aggregate = aggregate_series(&episodes).expect("aggregate");
        assert_eq!(aggregate.progress.percent, 66);
        assert_eq!(aggregate.progress.status, RequestStatus::Downloading);
        assert_eq!(aggregate.progress.minutes_left, Some(30));
        assert_eq!(aggregate.episodes, 3);

        let again = aggregate_series(&episodes).expect("aggregate");
        assert_eq!(again, aggregate);
    }

    #[test]
    fn aggregate_status_precedence() {
        let done = [
            episode(RequestStatus::Completed, 100, Some(0)),
            episode(RequestStatus::Completed, 100, None),
        ];
        let aggregate = aggregate_series(&done).expect("aggregate");
        assert_eq!(aggregate.progress.status, RequestStatus::Completed);
        assert_eq!(aggregate.progress.minutes_left, None);

        let queued = [
            episode(RequestStatus::Queued, 0, None),
            episode(RequestStatus::Paused, 10, Some(5)),
        ];
        let aggregate = aggregate_series(&queued).expect("aggregate");
        assert_eq!(aggregate.progress.status, RequestStatus::Queued);
        assert_eq!(aggregate.progress.minutes_left, Some(5));

        let stalled = [
            episode(RequestStatus::Paused, 10, Some(3)),
            episode(RequestStatus::Warning, 20, Some(6)),
        ];
        let aggregate = aggregate_series(&stalled).expect("aggregate");
        assert_eq!(aggregate.progress.status, RequestStatus::Downloading);
        assert_eq!(aggregate.progress.percent, 15);
        assert_eq!(aggregate.progress.minutes_left, Some(4));
    }

    #[test]
    fn aggregate_minutes_round_half_to_even() {
        let episodes = [
            episode(RequestStatus::Downloading, 40, Some(2)),
            episode(RequestStatus::Downloading, 60, Some(3)),
        ];
        let aggregate = aggregate_series(&episodes).expect("aggregate");
        assert_eq!(aggregate.progress.minutes_left, Some(2));

        let odd = [
            episode(RequestStatus::Downloading, 40, Some(3)),
            episode(RequestStatus::Downloading, 60, Some(4)),
        ];
        let aggregate = aggregate_series(&odd).expect("aggregate");
        assert_eq!(aggregate.progress.minutes_left, Some(4));
    }

    #[test]
    fn aggregate_of_nothing_is_none() {
        assert_eq!(aggregate_series(Vec::<RequestProgress>::new().iter()), None);
    }
}
