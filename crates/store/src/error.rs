//! Keystore Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A keystore error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for keystore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The storage engine could not be reached or failed mid-query.
    #[display("database error")]
    Database,
    /// Applying embedded migrations failed.
    #[display("database migration error")]
    Migration,
    /// The file carries a version stamp this build cannot interpret.
    /// Rows must not be read; the caller decides whether to wipe or abort.
    #[display("schema version {found} is not supported (expected {expected})")]
    Schema {
        /// Version stamped in the file.
        found: i64,
        /// Version this build expects.
        expected: i64,
    },
    /// The bounded wait for the write lock expired.
    #[display("timed out waiting for the store lock")]
    Timeout,
    /// The key normalized to an empty string.
    #[display("key is empty after normalization")]
    InvalidKey,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub(crate) fn classify(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.message().contains("database is locked") => Self::Timeout,
            sqlx::Error::PoolTimedOut => Self::Timeout,
            _ => Self::Database,
        }
    }
}

/// Raise sqlx failures as the matching [`ErrorKind`], keeping lock
/// contention distinguishable from everything else.
pub(crate) trait SqlxResultExt<T> {
    fn or_classify(self) -> Result<T>;
}
impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn or_classify(self) -> Result<T> {
        self.map_err(|err| exn::Exn::from(ErrorKind::classify(&err)))
    }
}
