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

//! Integration settings for MediaBridge.
//!
//! Layout: `provider.rs` (`ConfigProvider`, `StaticConfig`, `CachedConfig`),
//! `service.rs` (Postgres-backed `ConfigService`), `keys.rs` (setting names),
//! `template.rs` (endpoint rendering), `settings.rs` (process timings from the
//! environment).

pub mod error;
pub mod keys;
pub mod provider;
pub mod service;
pub mod settings;
pub mod template;

pub use error::{ConfigError, ConfigResult};
pub use provider::{CachedConfig, ConfigProvider, StaticConfig};
pub use service::ConfigService;
pub use settings::ReconcileSettings;
pub use template::render_endpoint;
