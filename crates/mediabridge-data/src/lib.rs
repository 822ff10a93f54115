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

//! Postgres persistence for MediaBridge: migrations, download requests, inventory
//! snapshots and the integration settings table.

pub mod config;
pub mod error;
pub mod inventory;
pub mod requests;

pub use error::{DataError, Result as DataResult};
pub use inventory::InventorySnapshotStore;
pub use requests::DownloadRequestStore;
