//! API error type with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use serde::Serialize;

/// API-level error: a stable machine-readable code plus an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

/// Wire shape of every error response.
#[derive(Serialize)]
struct ErrorBody {
    error_code: &'static str,
    status_code: u16,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Missing, malformed, or unknown credential.
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid credential",
        )
    }

    /// Request body failed boundary validation.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_failed", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.code,
            status_code: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            CheckoutError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            CheckoutError::OrderNotFound => (StatusCode::NOT_FOUND, "order_not_found"),
            CheckoutError::PaymentNotFound => (StatusCode::NOT_FOUND, "payment_not_found"),
            CheckoutError::ProductUnavailable => (StatusCode::BAD_REQUEST, "product_unavailable"),
            CheckoutError::InsufficientStock => (StatusCode::BAD_REQUEST, "insufficient_stock"),
            CheckoutError::InvalidQuantity => (StatusCode::BAD_REQUEST, "invalid_quantity"),
            CheckoutError::OrderAlreadyPaid => (StatusCode::BAD_REQUEST, "order_already_paid"),
            CheckoutError::PaymentAlreadyProcessed => {
                (StatusCode::BAD_REQUEST, "payment_already_processed")
            }
            CheckoutError::PaymentNotRetryable => {
                (StatusCode::BAD_REQUEST, "payment_not_retryable")
            }
            CheckoutError::OnlyPaidCanBeRefunded => {
                (StatusCode::BAD_REQUEST, "only_paid_can_be_refunded")
            }
            CheckoutError::CancellationNotAllowed => {
                (StatusCode::BAD_REQUEST, "cancellation_not_allowed")
            }
            CheckoutError::Order(_) => (StatusCode::BAD_REQUEST, "invalid_order_state"),
            CheckoutError::AccessDenied => (StatusCode::FORBIDDEN, "access_denied"),
            CheckoutError::Store(inner) => {
                tracing::error!(error = %inner, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        Self::new(status, code, message)
    }
}
