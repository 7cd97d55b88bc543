use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateways::{GatewayError, VerificationError};
use crate::ports::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("payment required: {0}")]
    PaymentRequired(String),

    // The provider-side detail stays in the source for operator logs; the
    // user only ever sees the generic message.
    #[error("could not initialize payment")]
    Gateway(#[source] GatewayError),

    #[error("webhook verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(detail) => AppError::NotFound(detail),
            StoreError::Conflict(detail) => AppError::Validation(detail),
            StoreError::Backend(detail) => AppError::Internal(detail),
        }
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Gateway(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Verification(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let error = AppError::Validation("course is free".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let error = AppError::NotFound("course not found".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let error = AppError::Unauthorized("authentication required".to_string());
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn payment_required_maps_to_402() {
        let error = AppError::PaymentRequired("course costs 49.99".to_string());
        assert_eq!(error.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn verification_failure_maps_to_400() {
        let error = AppError::Verification(VerificationError::Mismatch);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_failure_hides_provider_detail() {
        let error = AppError::Gateway(GatewayError::Rejected {
            provider: "stripe",
            detail: "card declined".to_string(),
        });
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.to_string(), "could not initialize payment");
    }

    #[test]
    fn store_not_found_converts_to_404() {
        let error = AppError::from(StoreError::NotFound("transaction".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn validation_error_response_body() {
        let error = AppError::Validation("already enrolled in this course".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
