//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Every domain error is converted into one of these kinds at the crate
/// boundary, and each kind maps to its own HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid request field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wallet, subwallet or transaction not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflicting state (e.g., settling an already settled transaction).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Publish/consume failure on the request queue.
    #[error("Queue error: {0}")]
    Queue(String),

    /// Downstream service failure (gateway proxy).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Upstream(_) => 502,
            Self::Queue(_) => 503,
            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the detail message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Storage(msg)
            | Self::Queue(msg)
            | Self::Upstream(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Returns true for errors whose details must not leak to clients.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Conflict(String::new()), 409, "CONFLICT")]
    #[case(AppError::Storage(String::new()), 500, "STORAGE_ERROR")]
    #[case(AppError::Queue(String::new()), 503, "QUEUE_ERROR")]
    #[case(AppError::Upstream(String::new()), 502, "UPSTREAM_ERROR")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_error_mapping(#[case] error: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.error_code(), code);
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            AppError::Validation(String::new()).error_code(),
            AppError::NotFound(String::new()).error_code(),
            AppError::Conflict(String::new()).error_code(),
            AppError::Storage(String::new()).error_code(),
            AppError::Queue(String::new()).error_code(),
            AppError::Upstream(String::new()).error_code(),
            AppError::Internal(String::new()).error_code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_server_errors() {
        assert!(AppError::Storage("db down".into()).is_server_error());
        assert!(AppError::Queue("full".into()).is_server_error());
        assert!(!AppError::NotFound("tx 1".into()).is_server_error());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::NotFound("msg".into()).to_string(),
            "Not found: msg"
        );
        assert_eq!(
            AppError::Storage("msg".into()).to_string(),
            "Storage error: msg"
        );
        assert_eq!(AppError::Queue("msg".into()).to_string(), "Queue error: msg");
        assert_eq!(AppError::Conflict("already settled".into()).message(), "already settled");
    }
}
