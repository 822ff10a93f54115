//! Mapping of acquisition tool status labels onto [`RequestStatus`].

use crate::model::RequestStatus;

/// Map an external status label onto the canonical status.
///
/// Matching is case-insensitive. Missing or unrecognised labels map to
/// [`RequestStatus::Queued`] so the item keeps being tracked.
#[must_use]
pub fn map_status(label: Option<&str>) -> RequestStatus {
    let Some(label) = label else {
        return RequestStatus::Queued;
    };
    match label.trim().to_ascii_lowercase().as_str() {
        "downloading" => RequestStatus::Downloading,
        "paused" => RequestStatus::Paused,
        "completed" => RequestStatus::Completed,
        "failed" => RequestStatus::Failed,
        "importpending" => RequestStatus::Importing,
        "warning" => RequestStatus::Warning,
        _ => RequestStatus::Queued,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_labels_map_case_insensitively() {
        assert_eq!(map_status(Some("Downloading")), RequestStatus::Downloading);
        assert_eq!(map_status(Some("queued")), RequestStatus::Queued);
        assert_eq!(map_status(Some("PAUSED")), RequestStatus::Paused);
        assert_eq!(map_status(Some("completed")), RequestStatus::Completed);
        assert_eq!(map_status(Some("failed")), RequestStatus::Failed);
        assert_eq!(map_status(Some("importPending")), RequestStatus::Importing);
        assert_eq!(map_status(Some("warning")), RequestStatus::Warning);
    }

    #[test]
    fn unknown_or_missing_labels_stay_queued() {
        assert_eq!(map_status(None), RequestStatus::Queued);
        assert_eq!(map_status(Some("")), RequestStatus::Queued);
        assert_eq!(map_status(Some("delay")), RequestStatus::Queued);
    }
}
