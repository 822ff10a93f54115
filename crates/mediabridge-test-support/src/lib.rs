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

//! Shared test helpers used across MediaBridge suites.
//! Layout: fixtures.rs (domain builders), fakes.rs (in-memory collaborators),
//! postgres.rs (disposable databases).

pub mod fakes;
pub mod fixtures;
pub mod postgres;
