//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use purse_core::StorageError;
use purse_core::escrow::EscrowError;
use purse_core::ledger::LedgerError;
use purse_core::queue::QueueError;
use purse_core::wallet::WalletError;
use purse_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// An `AppError` rendered as `{"error": <code>, "message": <text>}`.
///
/// Server-side failures are logged and answered with a fixed message so
/// driver details never reach clients.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Shorthand for a 400 response.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }

    fn public_message(&self) -> String {
        match &self.0 {
            AppError::Storage(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            AppError::Queue(_) => "Request queue unavailable".to_string(),
            AppError::Upstream(_) => "Billing service unavailable".to_string(),
            other => other.message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_server_error() {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
        } else {
            warn!(error = %self.0, code = self.0.error_code(), "Request rejected");
        }

        let body = json!({
            "error": self.0.error_code(),
            "message": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        Self(err.into())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err.into())
    }
}

impl From<EscrowError> for ApiError {
    fn from(err: EscrowError) -> Self {
        Self(err.into())
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        Self(err.into())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(AppError::Validation("bad amount".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR")]
    #[case(AppError::NotFound("wallet".into()), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(AppError::Conflict("settled".into()), StatusCode::CONFLICT, "CONFLICT")]
    #[case(AppError::Storage("db".into()), StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")]
    #[case(AppError::Queue("down".into()), StatusCode::SERVICE_UNAVAILABLE, "QUEUE_ERROR")]
    #[case(AppError::Upstream("refused".into()), StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")]
    #[case(AppError::Internal("panic".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")]
    #[tokio::test]
    async fn test_error_kinds_map_to_status(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (actual, body) = render(ApiError(err)).await;
        assert_eq!(actual, status);
        assert_eq!(body["error"], code);
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let (_, body) = render(ApiError::validation("amount must be positive")).await;
        assert_eq!(body["message"], "amount must be positive");
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let err: ApiError =
            StorageError::new("wallet.create", "password authentication failed").into();
        let (_, body) = render(err).await;
        assert_eq!(body["error"], "STORAGE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("password"));
    }
}
