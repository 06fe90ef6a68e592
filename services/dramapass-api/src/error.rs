//! Error types for the Dramapass API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use dramapass_billing_core::BillingError;
use dramapass_types::AccessDenial;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("{}", .0.message())]
    Denied(AccessDenial),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::Billing(e) => match e {
                BillingError::ReferralAlreadySet(_) => StatusCode::CONFLICT,
                e if e.is_validation() => StatusCode::BAD_REQUEST,
                e if e.is_not_found() => StatusCode::NOT_FOUND,
                e if e.is_provider_error() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Denied(denial) => denial.code(),
            Self::Billing(e) => match e {
                BillingError::UnknownPackage(_) => "UNKNOWN_PACKAGE",
                BillingError::Validation(_) => "VALIDATION_ERROR",
                BillingError::SelfReferral => "SELF_REFERRAL",
                BillingError::ReferralAlreadySet(_) => "REFERRAL_ALREADY_SET",
                BillingError::SubscriberNotFound(_) => "SUBSCRIBER_NOT_FOUND",
                BillingError::ContentNotFound(_) => "CONTENT_NOT_FOUND",
                BillingError::ReferralCodeNotFound(_) => "REFERRAL_CODE_NOT_FOUND",
                BillingError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
                BillingError::NoActiveCheckout(_) => "NO_ACTIVE_CHECKOUT",
                BillingError::Provider(_) => "PAYMENT_GATEWAY_ERROR",
                BillingError::Store(dramapass_db::DbError::NotFound) => "NOT_FOUND",
                BillingError::Store(_)
                | BillingError::Timeout(_)
                | BillingError::Internal(_) => "INTERNAL_ERROR",
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Internal details stay in the logs
        let message = if self.is_internal() {
            tracing::error!(error = ?self, "Internal API error");
            match &self {
                Self::Billing(BillingError::Provider(_)) => "payment gateway unavailable".to_string(),
                _ => "system error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
