//! Error types for the data access layer.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use mediabridge_core::CoreError;

/// Result alias for data layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the data access layer.
#[derive(Debug)]
pub enum DataError {
    /// Migration execution failed.
    MigrationFailed {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// A stored row could not be mapped onto the domain model.
    InvalidRow {
        /// Table the row came from.
        table: &'static str,
        /// Primary key of the row.
        id: i64,
        /// Machine-readable reason.
        reason: &'static str,
        /// Domain parsing error, when one caused the failure.
        source: Option<CoreError>,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MigrationFailed { .. } => formatter.write_str("migration failed"),
            Self::QueryFailed { .. } => formatter.write_str("database operation failed"),
            Self::InvalidRow { table, reason, .. } => {
                write!(formatter, "invalid {table} row: {reason}")
            }
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MigrationFailed { source } => Some(source),
            Self::QueryFailed { source, .. } => Some(source),
            Self::InvalidRow { source, .. } => source.as_ref().map(|err| err as &(dyn Error + 'static)),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        Self::QueryFailed {
            operation: "sqlx operation",
            source,
        }
    }
}

pub(crate) fn map_query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DataError {
    move |source| DataError::QueryFailed { operation, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_display_and_source() {
        let migration = DataError::MigrationFailed {
            source: sqlx::migrate::MigrateError::VersionMissing(1),
        };
        assert_eq!(migration.to_string(), "migration failed");
        assert!(migration.source().is_some());

        let query = map_query_err("fetch")(sqlx::Error::RowNotFound);
        assert_eq!(query.to_string(), "database operation failed");
        assert!(query.source().is_some());

        let row = DataError::InvalidRow {
            table: "download_requests",
            id: 4,
            reason: "unknown status",
            source: Some(CoreError::UnknownStatus {
                value: "lost".into(),
            }),
        };
        assert_eq!(
            row.to_string(),
            "invalid download_requests row: unknown status"
        );
        assert!(row.source().is_some());

        let bare = DataError::InvalidRow {
            table: "download_requests",
            id: 4,
            reason: "missing movie_id",
            source: None,
        };
        assert!(bare.source().is_none());

        let from = DataError::from(sqlx::Error::RowNotFound);
        assert_eq!(from.to_string(), "database operation failed");
    }
}
