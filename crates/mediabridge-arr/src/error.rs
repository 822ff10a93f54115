//! Error types for the wire clients.

use mediabridge_config::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to an external tool.
#[derive(Debug, Error)]
pub enum ArrError {
    /// A setting needed to build the request was unavailable.
    #[error("integration setting unavailable")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// The shared HTTP client could not be constructed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Source transport error.
        source: reqwest::Error,
    },
    /// The request did not complete.
    #[error("request failed")]
    Request {
        /// Operation identifier.
        operation: &'static str,
        /// Target URL without its query string.
        url: String,
        /// Source transport error.
        source: reqwest::Error,
    },
    /// The tool answered with a non-success status.
    #[error("unexpected response status")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// Target URL without its query string.
        url: String,
        /// Status returned by the tool.
        status: StatusCode,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Target URL without its query string.
        url: String,
        /// Source decode error.
        source: reqwest::Error,
    },
    /// Login succeeded at the HTTP level but no session cookie came back.
    #[error("login returned no session cookie")]
    MissingSession {
        /// Login URL without its query string.
        url: String,
    },
}

impl ArrError {
    /// Operation label for structured logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Config { operation, .. }
            | Self::Request { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. } => *operation,
            Self::ClientBuild { .. } => "http.client_build",
            Self::MissingSession { .. } => "qbittorrent.login",
        }
    }
}

/// Convenience alias for wire client results.
pub type ArrResult<T> = Result<T, ArrError>;

/// Strip the query string so API keys never reach error messages or logs.
pub(crate) fn redact(url: &str) -> String {
    url.split_once('?')
        .map_or(url, |(base, _)| base)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn redact_drops_the_query() {
        assert_eq!(
            redact("http://radarr:7878/api/v3/queue?apikey=secret"),
            "http://radarr:7878/api/v3/queue"
        );
        assert_eq!(redact("http://qbit/api/v2/auth/login"), "http://qbit/api/v2/auth/login");
    }

    #[test]
    fn operation_labels_and_sources() {
        let config = ArrError::Config {
            operation: "radarr.fetch_queue",
            source: ConfigError::MissingKey {
                key: "radarr_api_key".into(),
            },
        };
        assert_eq!(config.operation(), "radarr.fetch_queue");
        assert_eq!(config.to_string(), "integration setting unavailable");
        assert!(config.source().is_some());

        let status = ArrError::Status {
            operation: "sonarr.series",
            url: "http://sonarr/api/v3/series/4".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(status.operation(), "sonarr.series");
        assert!(status.source().is_none());

        let session = ArrError::MissingSession {
            url: "http://qbit/api/v2/auth/login".into(),
        };
        assert_eq!(session.operation(), "qbittorrent.login");
    }
}
