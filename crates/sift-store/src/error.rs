use sift_types::KeyError;

/// Errors from document store operations.
///
/// A missing document is not an error: reads report absence as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The namespace or document id was empty. Caller's fault; never retried.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The backend failed. Transient faults have already been retried by the
    /// backend by the time this surfaces.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl StoreError {
    pub fn storage(reason: impl std::fmt::Display) -> Self {
        Self::StorageFailure(reason.to_string())
    }

    /// Returns `true` if the caller supplied a bad key.
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::InvalidKey(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageFailure(format!("I/O error: {e}"))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
