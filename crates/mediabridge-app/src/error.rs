//! # Design
//!
//! - Centralize bootstrap errors; reconciliation failures never reach this type.
//! - Keep error messages constant while carrying context fields for debugging.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value.
        value: Option<String>,
    },
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: mediabridge_config::ConfigError,
    },
    /// Persistence setup failed.
    #[error("data store operation failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: mediabridge_data::DataError,
    },
    /// HTTP client construction failed.
    #[error("http client setup failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Source client error.
        source: mediabridge_arr::ArrError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: mediabridge_telemetry::TelemetryError,
    },
    /// A reconciliation loop task panicked or was cancelled.
    #[error("background task failed")]
    Task {
        /// Loop name.
        task: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) fn config(operation: &'static str, source: mediabridge_config::ConfigError) -> Self {
        match source {
            mediabridge_config::ConfigError::InvalidValue { key, value, reason } => {
                Self::InvalidConfig {
                    field: key,
                    reason,
                    value: Some(value),
                }
            }
            source => Self::Config { operation, source },
        }
    }

    pub(crate) const fn data(
        operation: &'static str,
        source: mediabridge_data::DataError,
    ) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn http(operation: &'static str, source: mediabridge_arr::ArrError) -> Self {
        Self::Http { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: mediabridge_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabridge_config::ConfigError;
    use std::error::Error;

    #[test]
    fn invalid_values_become_invalid_config() {
        let err = AppError::config(
            "settings.from_env",
            ConfigError::InvalidValue {
                key: "MEDIABRIDGE_POLL_INTERVAL_SECS".into(),
                value: "soon".into(),
                reason: "not an integer",
            },
        );
        match err {
            AppError::InvalidConfig {
                field,
                reason,
                value,
            } => {
                assert_eq!(field, "MEDIABRIDGE_POLL_INTERVAL_SECS");
                assert_eq!(reason, "not an integer");
                assert_eq!(value.as_deref(), Some("soon"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_config_errors_keep_their_source() {
        let err = AppError::config(
            "config_service.new",
            ConfigError::MissingKey {
                key: "radarr_api_key".into(),
            },
        );
        assert_eq!(err.to_string(), "configuration operation failed");
        assert!(err.source().is_some());
        assert_eq!(
            AppError::MissingEnv {
                name: "DATABASE_URL"
            }
            .to_string(),
            "missing environment configuration"
        );
    }
}
