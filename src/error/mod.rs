//! Error handling for the micro-lending ledger
//!
//! `LedgerError` names every precondition the loan ledger can reject.
//! `ApiError` maps those (and request-level failures) onto HTTP status codes
//! and JSON error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::loan::Amount;
use crate::token::TokenError;

/// Domain errors raised by ledger operations. Every failure aborts the whole
/// operation with no state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Borrower already has an active loan")]
    LoanAlreadyActive,

    #[error("Loan is not fundable (missing, inactive or already funded)")]
    LoanNotFundable,

    #[error("Loan is not active or not funded")]
    LoanNotActiveOrUnfunded,

    #[error("Repayment of {amount} exceeds total due {total_due}")]
    RepaymentExceedsDue { amount: Amount, total_due: Amount },

    #[error("Caller is not the owner")]
    NotOwner,

    #[error("Loan is not liquidatable (missing, inactive or unfunded)")]
    LoanNotLiquidatable,

    #[error("Loan is not eligible for liquidation: repaid {repaid} >= threshold {threshold}")]
    NotEligibleForLiquidation { repaid: Amount, threshold: Amount },

    #[error("Insufficient ledger balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("Token transfer failed")]
    TransferFailed,

    #[error("Reentrant call rejected")]
    ReentrantCall,

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Loan not found")]
    LoanNotFound,

    #[error("Token service error: {0}")]
    Token(#[from] TokenError),
}

impl LedgerError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::LoanAlreadyActive => "LOAN_ALREADY_ACTIVE",
            LedgerError::LoanNotFundable => "LOAN_NOT_FUNDABLE",
            LedgerError::LoanNotActiveOrUnfunded => "LOAN_NOT_ACTIVE_OR_UNFUNDED",
            LedgerError::RepaymentExceedsDue { .. } => "REPAYMENT_EXCEEDS_DUE",
            LedgerError::NotOwner => "NOT_OWNER",
            LedgerError::LoanNotLiquidatable => "LOAN_NOT_LIQUIDATABLE",
            LedgerError::NotEligibleForLiquidation { .. } => "NOT_ELIGIBLE_FOR_LIQUIDATION",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::TransferFailed => "TRANSFER_FAILED",
            LedgerError::ReentrantCall => "REENTRANT_CALL",
            LedgerError::MathOverflow => "MATH_OVERFLOW",
            LedgerError::LoanNotFound => "LOAN_NOT_FOUND",
            LedgerError::Token(_) => "TOKEN_ERROR",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::NotOwner => StatusCode::FORBIDDEN,
            LedgerError::LoanNotFound => StatusCode::NOT_FOUND,
            LedgerError::LoanAlreadyActive
            | LedgerError::LoanNotFundable
            | LedgerError::LoanNotActiveOrUnfunded
            | LedgerError::LoanNotLiquidatable
            | LedgerError::NotEligibleForLiquidation { .. } => StatusCode::CONFLICT,
            LedgerError::RepaymentExceedsDue { .. }
            | LedgerError::InsufficientBalance { .. }
            | LedgerError::Token(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::ReentrantCall => StatusCode::LOCKED,
            LedgerError::TransferFailed => StatusCode::BAD_GATEWAY,
            LedgerError::MathOverflow => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => err.code(),
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => err.status_code(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %message, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
