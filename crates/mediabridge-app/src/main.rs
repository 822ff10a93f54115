#![forbid(unsafe_code)]
#![deny(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]

//! Binary entrypoint that wires the MediaBridge collaborators together and runs the
//! reconciliation loops until shutdown.

use mediabridge_app::{AppResult, run_app};

/// Bootstraps the engine and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
