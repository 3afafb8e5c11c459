//! Queue error types.

use purse_shared::AppError;
use thiserror::Error;

use super::types::Topic;

/// Errors that can occur while publishing or consuming requests.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A message could not be appended.
    #[error("failed to publish to {topic}: {message}")]
    Publish {
        /// Target topic.
        topic: Topic,
        /// Underlying failure.
        message: String,
    },

    /// A message could not be fetched or acknowledged.
    #[error("failed to consume from {topic}: {message}")]
    Consume {
        /// Source topic.
        topic: Topic,
        /// Underlying failure.
        message: String,
    },

    /// The payload is not a valid request.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Malformed(msg) => Self::Validation(msg),
            QueueError::Publish { .. } | QueueError::Consume { .. } => {
                Self::Queue(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_failure_is_unavailable() {
        let app: AppError = QueueError::Publish {
            topic: Topic::Invoices,
            message: "pool timed out".into(),
        }
        .into();
        assert_eq!(app.status_code(), 503);
        assert!(app.to_string().contains("invoices"));
    }

    #[test]
    fn test_malformed_is_validation() {
        let app: AppError = QueueError::Malformed("missing field `amount`".into()).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
    }
}
