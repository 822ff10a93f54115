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

//! MediaBridge download reconciliation engine.
//!
//! Layout: `bootstrap.rs` (service wiring), `reconcile/` (queue processors, sweeper,
//! library snapshot sync and the two-loop driver).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// Reconciliation steps and their driver.
pub mod reconcile;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
