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

//! Wire clients for the acquisition tools and the torrent client.
//!
//! Every client resolves its endpoints and credentials through a
//! [`mediabridge_config::ConfigProvider`] on each call; nothing is cached on the
//! client itself.

pub mod error;
pub mod http;
pub mod qbittorrent;
pub mod radarr;
pub mod sonarr;
mod wire;

pub use error::{ArrError, ArrResult};
pub use http::ArrHttp;
pub use qbittorrent::QbittorrentClient;
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
