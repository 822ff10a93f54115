#![forbid(unsafe_code)]
#![deny(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![warn(unused, unreachable_pub)]

//! Download request domain model, progress math, stuck-transfer heuristics and the
//! collaborator traits the reconciliation engine is written against.

pub mod error;
pub mod health;
pub mod model;
pub mod progress;
pub mod service;
pub mod status;

pub use error::{CoreError, CoreResult};
pub use health::{StuckPolicy, TransferState, should_cull};
pub use model::{
    DownloadRequest, DownloadedMovie, DownloadedShow, EpisodeInfo, HealthRecord, MediaDetails,
    MediaIdentity, MediaKind, MovieQueueRecord, MovieSnapshot, NewDownloadRequest,
    RequestBatch, RequestProgress, RequestStatus, SeasonSnapshot, SeriesInfo, SeriesQueueRecord,
    SeriesSnapshot, ShowEntry,
};
pub use progress::{SeriesAggregate, aggregate_series, minutes_left_weighted, parse_minutes, percent};
pub use service::{
    DiscoveryRefresher, InventoryStore, MovieAcquisition, RequestStore, SeriesAcquisition,
    TorrentHealthSource,
};
pub use status::map_status;
