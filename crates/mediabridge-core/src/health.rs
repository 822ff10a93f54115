//! Heuristics for spotting transfers that will never finish.

use crate::model::HealthRecord;

/// Torrent client state relevant to stuck detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Actively fetching data.
    Downloading,
    /// Wants data but no peer is sending any.
    StalledDownload,
    /// Waiting for a download slot.
    QueuedDownload,
    /// Fetching metadata.
    MetaDownload,
    /// Any other state (seeding, paused, checking, errored...).
    Other,
}

impl TransferState {
    /// Parse the client's state label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "downloading" => Self::Downloading,
            "stalledDL" => Self::StalledDownload,
            "queuedDL" => Self::QueuedDownload,
            "metaDL" => Self::MetaDownload,
            _ => Self::Other,
        }
    }

    /// Whether the transfer still wants data.
    #[must_use]
    pub const fn is_downloading(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Thresholds used to decide whether a transfer is stuck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StuckPolicy {
    /// Transfers younger than this (seconds) are never culled.
    pub min_age_secs: i64,
    /// Idle time (seconds) required before culling a transfer.
    pub idle_secs: i64,
    /// Idle time (seconds) required when the transfer is nearly done.
    pub near_complete_idle_secs: i64,
    /// Progress fraction at which a transfer counts as nearly done.
    pub near_complete_progress: f64,
    /// Transfers with availability above this are left alone.
    pub max_availability: f64,
}

impl Default for StuckPolicy {
    fn default() -> Self {
        Self {
            min_age_secs: 180,
            idle_secs: 600,
            near_complete_idle_secs: 3600,
            near_complete_progress: 0.99,
            max_availability: 0.3,
        }
    }
}

impl StuckPolicy {
    /// Decide whether `record` should be removed and searched for again.
    ///
    /// Every condition must hold: old enough, in a downloading state, no download
    /// speed, idle long enough, no seeds, and low availability.
    #[must_use]
    pub fn should_cull(&self, record: &HealthRecord, now_epoch: i64) -> bool {
        if now_epoch - record.added_on < self.min_age_secs {
            return false;
        }
        if !TransferState::from_label(&record.state).is_downloading() {
            return false;
        }
        if record.download_speed > 0 {
            return false;
        }
        let idle_threshold = if record.progress >= self.near_complete_progress {
            self.near_complete_idle_secs
        } else {
            self.idle_secs
        };
        if now_epoch - record.last_activity < idle_threshold {
            return false;
        }
        if record.num_seeds > 0 {
            return false;
        }
        record.availability <= self.max_availability
    }
}

/// [`StuckPolicy::should_cull`] with the default thresholds.
#[must_use]
pub fn should_cull(record: &HealthRecord, now_epoch: i64) -> bool {
    StuckPolicy::default().should_cull(record, now_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn stuck() -> HealthRecord {
        HealthRecord {
            torrent_id: "ABCDEF".into(),
            name: Some("Some.Movie.2019".into()),
            state: "downloading".into(),
            availability: 0.2,
            num_seeds: 0,
            download_speed: 0,
            upload_speed: 0,
            added_on: NOW - 200,
            last_activity: NOW - 700,
            progress: 0.5,
        }
    }

    #[test]
    fn idle_low_availability_transfer_is_culled() {
        assert!(should_cull(&stuck(), NOW));
    }

    #[test]
    fn young_transfers_are_never_culled() {
        let mut record = stuck();
        record.added_on = NOW - 179;
        record.last_activity = NOW - 10_000;
        assert!(!should_cull(&record, NOW));
        record.added_on = NOW - 180;
        assert!(should_cull(&record, NOW));
    }

    #[test]
    fn non_downloading_states_are_left_alone() {
        for state in ["uploading", "stalledUP", "pausedDL", "error"] {
            let mut record = stuck();
            record.state = state.into();
            assert!(!should_cull(&record, NOW), "{state}");
        }
        for state in ["stalledDL", "queuedDL", "metaDL"] {
            let mut record = stuck();
            record.state = state.into();
            assert!(should_cull(&record, NOW), "{state}");
        }
    }

    #[test]
    fn any_activity_signal_prevents_culling() {
        let mut speed = stuck();
        speed.download_speed = 1;
        assert!(!should_cull(&speed, NOW));

        let mut seeds = stuck();
        seeds.num_seeds = 1;
        assert!(!should_cull(&seeds, NOW));

        let mut available = stuck();
        available.availability = 0.31;
        assert!(!should_cull(&available, NOW));

        let mut boundary = stuck();
        boundary.availability = 0.3;
        assert!(should_cull(&boundary, NOW));
    }

    #[test]
    fn near_complete_transfers_get_a_longer_grace_period() {
        let mut record = stuck();
        record.progress = 0.995;
        assert!(!should_cull(&record, NOW));
        record.last_activity = NOW - 3600;
        assert!(should_cull(&record, NOW));
    }
}
