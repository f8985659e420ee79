use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures raised by a [`LinkRepository`](crate::repository::LinkRepository) backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short token already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Failures raised by a code generation client.
///
/// Transport failures (`Timeout`, `Unreachable`) are kept apart from
/// `BadResponse`, where the service answered but the answer was unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("code generation timed out: {0}")]
    Timeout(String),
    #[error("code generation service unreachable: {0}")]
    Unreachable(String),
    #[error("code generation service returned an unusable response: {0}")]
    BadResponse(String),
}

impl GenerateError {
    /// Whether the failure happened before the service produced an answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unreachable(_))
    }
}

/// Errors surfaced by link lifecycle operations.
///
/// `NotFound` covers both absent records and records owned by someone else.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("short token generation failed: {0}")]
    GenerationFailed(#[from] GenerateError),
    #[error("no unique short token after {attempts} attempts")]
    TooManyCollisions { attempts: u32 },
    #[error("link not found")]
    NotFound,
    #[error("link has expired")]
    Expired,
    #[error("link click limit reached")]
    QuotaExceeded,
    #[error("link store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_flagged() {
        assert!(GenerateError::Timeout("slow".into()).is_transport());
        assert!(GenerateError::Unreachable("refused".into()).is_transport());
        assert!(!GenerateError::BadResponse("empty body".into()).is_transport());
    }

    #[test]
    fn storage_errors_convert_to_store_unavailable() {
        let err: LinkError = StorageError::Query("syntax".into()).into();
        assert!(matches!(err, LinkError::StoreUnavailable(StorageError::Query(_))));
    }

    #[test]
    fn collision_message_mentions_attempts() {
        let err = LinkError::TooManyCollisions { attempts: 8 };
        assert_eq!(err.to_string(), "no unique short token after 8 attempts");
    }
}
