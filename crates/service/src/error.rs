//! Image core error types.

use gallery_core::{FieldErrors, Forbidden};
use gallery_metadata::MetadataError;
use thiserror::Error;

/// Errors returned by the image core.
///
/// Storage errors never leave the core raw; they are folded into the kinds
/// below by [`ImageError::from_store`].
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("ID is not in its proper form: {0}")]
    InvalidId(String),

    #[error("data validation error: {0}")]
    Validation(FieldErrors),

    #[error("image not found: {0}")]
    NotFound(String),

    #[error("attempted action is not allowed")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: MetadataError,
    },
}

/// Result type for image core operations.
pub type ImageResult<T> = std::result::Result<T, ImageError>;

impl ImageError {
    /// Translate a storage error raised while performing `op`.
    pub fn from_store(op: &'static str, err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(msg) => Self::NotFound(msg),
            MetadataError::AlreadyExists(msg) | MetadataError::Conflict(msg) => {
                Self::Conflict(msg)
            }
            MetadataError::InvalidArgument(msg) => {
                let mut fields = FieldErrors::default();
                fields.push("page", msg);
                Self::Validation(fields)
            }
            MetadataError::Cancelled => Self::Cancelled,
            MetadataError::DeadlineExceeded => Self::DeadlineExceeded,
            source => Self::Storage { op, source },
        }
    }

    /// Stable error code for logging and transport mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "invalid_id",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Forbidden => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Storage { .. } => "storage_error",
        }
    }
}

/// Errors surfacing from a unit of work itself (begin, commit, interruption).
impl From<MetadataError> for ImageError {
    fn from(e: MetadataError) -> Self {
        Self::from_store("transaction", e)
    }
}

impl From<Forbidden> for ImageError {
    fn from(_: Forbidden) -> Self {
        Self::Forbidden
    }
}

impl From<FieldErrors> for ImageError {
    fn from(e: FieldErrors) -> Self {
        Self::Validation(e)
    }
}
