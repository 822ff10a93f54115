//! Removal and re-search of transfers the torrent client reports as stuck.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediabridge_core::{
    MediaKind, MovieAcquisition, SeriesAcquisition, StuckPolicy, TorrentHealthSource,
};
use mediabridge_telemetry::ReconcileMetrics;
use tracing::{info, warn};

/// A queue entry as seen by remediation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueTransfer {
    pub(crate) queue_id: i64,
    /// Id passed to the tool's search command (movie id or episode id).
    pub(crate) search_id: i32,
    pub(crate) torrent_id: Option<String>,
}

/// Queue operations remediation needs from an acquisition tool.
#[async_trait]
pub(crate) trait QueueRemediation: Send + Sync {
    fn kind(&self) -> MediaKind;

    async fn remove(&self, queue_id: i64) -> anyhow::Result<bool>;

    async fn search_again(&self, search_id: i32) -> anyhow::Result<()>;
}

#[async_trait]
impl QueueRemediation for dyn MovieAcquisition {
    fn kind(&self) -> MediaKind {
        MediaKind::Movie
    }

    async fn remove(&self, queue_id: i64) -> anyhow::Result<bool> {
        self.remove_queue_item(queue_id).await
    }

    async fn search_again(&self, search_id: i32) -> anyhow::Result<()> {
        self.trigger_search(&[search_id]).await
    }
}

#[async_trait]
impl QueueRemediation for dyn SeriesAcquisition {
    fn kind(&self) -> MediaKind {
        MediaKind::Episode
    }

    async fn remove(&self, queue_id: i64) -> anyhow::Result<bool> {
        self.remove_queue_item(queue_id).await
    }

    async fn search_again(&self, search_id: i32) -> anyhow::Result<()> {
        self.trigger_search(&[search_id]).await
    }
}

/// Check every transfer's health and remediate the stuck ones.
///
/// Returns the queue ids that were removed; those entries are gone from the tool and
/// must not be reconciled this cycle. A refused removal skips the re-search and is
/// retried on the next cycle.
pub(crate) async fn cull_stuck<T>(
    tool: &T,
    torrents: &dyn TorrentHealthSource,
    policy: &StuckPolicy,
    transfers: &[QueueTransfer],
    now: DateTime<Utc>,
    metrics: &ReconcileMetrics,
) -> anyhow::Result<HashSet<i64>>
where
    T: QueueRemediation + ?Sized,
{
    let mut torrent_ids: Vec<String> = transfers
        .iter()
        .filter_map(|transfer| transfer.torrent_id.clone())
        .collect();
    torrent_ids.sort();
    torrent_ids.dedup();
    if torrent_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let now_epoch = now.timestamp();
    let stuck: HashSet<String> = torrents
        .fetch_health(&torrent_ids)
        .await?
        .iter()
        .filter(|record| policy.should_cull(record, now_epoch))
        .map(|record| record.torrent_id.to_ascii_lowercase())
        .collect();

    let mut culled = HashSet::new();
    for transfer in transfers {
        let Some(torrent_id) = transfer.torrent_id.as_deref() else {
            continue;
        };
        if !stuck.contains(&torrent_id.to_ascii_lowercase()) {
            continue;
        }
        if !tool.remove(transfer.queue_id).await? {
            warn!(
                kind = %tool.kind(),
                queue_id = transfer.queue_id,
                torrent_id,
                "tool refused to remove stuck transfer"
            );
            continue;
        }
        tool.search_again(transfer.search_id).await?;
        info!(
            kind = %tool.kind(),
            queue_id = transfer.queue_id,
            search_id = transfer.search_id,
            torrent_id,
            "removed stuck transfer and searched again"
        );
        metrics.inc_culled(tool.kind().as_str());
        culled.insert(transfer.queue_id);
    }
    Ok(culled)
}
