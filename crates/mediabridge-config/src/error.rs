//! Error types for configuration lookups.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent or blank.
    #[error("missing configuration key")]
    MissingKey {
        /// Name of the missing key.
        key: String,
    },
    /// A value could not be interpreted.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Name of the offending key or variable.
        key: String,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Underlying database connection failed.
    #[error("database operation failed")]
    Database {
        /// Operation identifier.
        operation: &'static str,
        /// Source database error.
        source: sqlx::Error,
    },
    /// Data layer operation failed.
    #[error("data access failed")]
    DataAccess {
        /// Operation identifier.
        operation: &'static str,
        /// Source data-layer error.
        source: mediabridge_data::DataError,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
