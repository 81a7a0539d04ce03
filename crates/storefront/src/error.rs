//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` that captures server-class errors to
//! Sentry before responding. All route handlers return
//! `Result<T, AppError>`. Every user-visible failure leaves the previous
//! cart state intact: handlers only persist after reconciliation succeeds,
//! and never respond success when a save failed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use millet_basket_core::cart::CartError;

use crate::db::StoreError;
use crate::services::razorpay::RazorpayError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input (non-numeric quantity, bad email, empty order).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The cart already holds the maximum available stock; nothing could be
    /// added. Clamped partial adds are not errors.
    #[error("Maximum available quantity ({max}) already in cart")]
    AtCapacity { max: u32 },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Cart/session backend failure; retryable, no partial write visible.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Payment gateway operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] RazorpayError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Storage(msg) => Self::Persistence(msg),
        }
    }
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity => Self::Validation(e.to_string()),
            CartError::AtCapacity { max } => Self::AtCapacity { max },
            CartError::LineItemNotFound(id) => Self::NotFound(format!("cart item {id}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Persistence(_) | Self::Internal(_) | Self::Payment(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AtCapacity { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Persistence(_) => "Cart storage is temporarily unavailable, please retry"
                .to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Payment(_) => "Payment gateway error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product ragi-flour".to_string());
        assert_eq!(err.to_string(), "Not found: product ragi-flour");

        let err = AppError::AtCapacity { max: 5 };
        assert_eq!(
            err.to_string(),
            "Maximum available quantity (5) already in cart"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Validation("bad quantity".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::AtCapacity { max: 5 }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("bad token".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Persistence("down".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cart_error_mapping() {
        let err: AppError = CartError::AtCapacity { max: 3 }.into();
        assert!(matches!(err, AppError::AtCapacity { max: 3 }));

        let err: AppError = CartError::InvalidQuantity.into();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_store_error_mapping() {
        let err: AppError = StoreError::Storage("connection refused".to_string()).into();
        assert!(matches!(err, AppError::Persistence(_)));

        let err: AppError = StoreError::NotFound("session x".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
