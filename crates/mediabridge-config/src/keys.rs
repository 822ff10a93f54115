//! Names of the integration settings stored in the `configs` table.

/// Movie tool API key.
pub const RADARR_API_KEY: &str = "radarr_api_key";
/// Movie tool command endpoint.
pub const RADARR_COMMAND_ENDPOINT: &str = "radarr_command_endpoint";
/// Movie tool queue endpoint.
pub const RADARR_QUEUE_ENDPOINT: &str = "radarr_download_queue_endpoint";
/// Movie tool movie lookup endpoint, with a `{movieId}` placeholder.
pub const RADARR_MOVIE_ENDPOINT: &str = "radarr_movie_data_endpoint";
/// Movie tool queue removal endpoint, with an `{id}` placeholder.
pub const RADARR_REMOVE_QUEUE_ENDPOINT: &str = "radarr_remove_queue_item_endpoint";
/// Movie tool library listing endpoint.
pub const RADARR_LIBRARY_ENDPOINT: &str = "radarr_get_all_movies_endpoint";

/// Series tool API key.
pub const SONARR_API_KEY: &str = "sonarr_api_key";
/// Series tool command endpoint.
pub const SONARR_COMMAND_ENDPOINT: &str = "sonarr_command_endpoint";
/// Series tool queue endpoint.
pub const SONARR_QUEUE_ENDPOINT: &str = "sonarr_download_queue_endpoint";
/// Series tool series lookup endpoint, with a `{seriesId}` placeholder.
pub const SONARR_SERIES_ENDPOINT: &str = "sonarr_series_data_endpoint";
/// Series tool episode listing endpoint, with a `{seriesId}` placeholder.
pub const SONARR_EPISODES_ENDPOINT: &str = "sonarr_episode_data_endpoint";
/// Series tool queue removal endpoint, with an `{id}` placeholder.
pub const SONARR_REMOVE_QUEUE_ENDPOINT: &str = "sonarr_remove_queue_item_endpoint";
/// Series tool library listing endpoint.
pub const SONARR_LIBRARY_ENDPOINT: &str = "sonarr_get_all_shows_endpoint";

/// Torrent client login endpoint.
pub const QBITTORRENT_LOGIN_ENDPOINT: &str = "qbittorrent_api_cookie_endpoint";
/// Torrent client user name.
pub const QBITTORRENT_USERNAME: &str = "qbittorrent_api_username";
/// Torrent client password.
pub const QBITTORRENT_PASSWORD: &str = "qbittorrent_api_password";
/// Torrent client info endpoint.
pub const QBITTORRENT_INFO_ENDPOINT: &str = "qbittorrent_torrent_info_endpoint";

/// User name used when none is configured.
pub const DEFAULT_QBITTORRENT_USERNAME: &str = "admin";
