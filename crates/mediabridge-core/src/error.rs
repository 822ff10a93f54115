//! Error types for the download request domain.

use thiserror::Error;

/// Errors raised while interpreting persisted or external domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A stored status label is not one of the canonical statuses.
    #[error("unknown request status")]
    UnknownStatus {
        /// Offending label.
        value: String,
    },
    /// A stored media kind label is not recognised.
    #[error("unknown media kind")]
    UnknownMediaKind {
        /// Offending label.
        value: String,
    },
    /// A progress percentage fell outside 0..=100.
    #[error("progress percent out of range")]
    PercentOutOfRange {
        /// Offending value.
        value: i64,
    },
}

/// Convenience alias for domain results.
pub type CoreResult<T> = Result<T, CoreError>;
