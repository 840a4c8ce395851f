//! Metadata store error types.

use gallery_core::Interrupted;
use thiserror::Error;

/// SQLite result codes that mean another writer got there first
/// (BUSY, LOCKED, LOCKED_SHAREDCACHE, BUSY_SNAPSHOT).
const SQLITE_CONTENTION_CODES: [&str; 4] = ["5", "6", "262", "517"];

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("transaction already open on this handle")]
    NestedTransaction,

    #[error("handle is not inside a transaction")]
    NotInTransaction,

    #[error("transaction already committed or rolled back")]
    TransactionClosed,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

impl From<sqlx::Error> for MetadataError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return MetadataError::AlreadyExists(db_err.message().to_string());
            }
            let contended = db_err
                .code()
                .is_some_and(|code| SQLITE_CONTENTION_CODES.contains(&&*code));
            if contended {
                return MetadataError::Conflict(db_err.message().to_string());
            }
        }
        if let sqlx::Error::PoolTimedOut = e {
            return MetadataError::Conflict(
                "timed out waiting for the database connection; \
                 it may be held by an open transaction"
                    .to_string(),
            );
        }
        MetadataError::Database(e)
    }
}

impl From<Interrupted> for MetadataError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => MetadataError::Cancelled,
            Interrupted::DeadlineExceeded => MetadataError::DeadlineExceeded,
        }
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(e: std::io::Error) -> Self {
        MetadataError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_maps_to_signal_variants() {
        assert!(matches!(
            MetadataError::from(Interrupted::Cancelled),
            MetadataError::Cancelled
        ));
        assert!(matches!(
            MetadataError::from(Interrupted::DeadlineExceeded),
            MetadataError::DeadlineExceeded
        ));
    }

    #[test]
    fn test_pool_timeout_is_conflict() {
        let err = MetadataError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, MetadataError::Conflict(ref msg) if msg.contains("open transaction")));
    }

    #[test]
    fn test_non_database_sqlx_errors_stay_wrapped() {
        let err = MetadataError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, MetadataError::Database(sqlx::Error::RowNotFound)));
        assert!(err.to_string().starts_with("database error:"));
    }
}
