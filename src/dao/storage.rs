use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A write collided with a uniqueness constraint. Buzz arbitration leans
    /// on this variant: the losing insert must surface as `Duplicate`, never
    /// as a generic failure.
    #[error("unique constraint violated: {constraint}")]
    Duplicate { constraint: &'static str },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a duplicate-key error naming the violated constraint.
    pub fn duplicate(constraint: &'static str) -> Self {
        StorageError::Duplicate { constraint }
    }

    /// Whether this error is a uniqueness violation rather than a backend
    /// fault.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate { .. })
    }
}
