//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    BookUnavailable = 7,
    Conflict = 8,
    MaxLoansReached = 11,
    DuplicateLoan = 12,
    AlreadyReturned = 13,
    BadValue = 18,
    NoSuchData = 20,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// A loan rule was violated; the code tells which one.
    #[error("{message}")]
    LoanRule { code: ErrorCode, message: String },
}

impl AppError {
    pub fn reader_not_found() -> Self {
        AppError::NotFound("Reader not found".to_string())
    }

    pub fn book_not_found(id: i32) -> Self {
        AppError::NotFound(format!("Book with id {} not found", id))
    }

    pub fn loan_not_found(id: i32) -> Self {
        AppError::NotFound(format!("Loan with id {} not found", id))
    }

    pub fn max_loans_reached(name: &str, active: i64, max: i64) -> Self {
        AppError::LoanRule {
            code: ErrorCode::MaxLoansReached,
            message: format!(
                "Reader {} has {} active loans; a reader may hold at most {} simultaneous loans",
                name, active, max
            ),
        }
    }

    pub fn out_of_stock(book_id: i32) -> Self {
        AppError::LoanRule {
            code: ErrorCode::BookUnavailable,
            message: format!("Book {} is out of stock", book_id),
        }
    }

    pub fn duplicate_loan(book_id: i32) -> Self {
        AppError::LoanRule {
            code: ErrorCode::DuplicateLoan,
            message: format!("Duplicate active loan for book {}", book_id),
        }
    }

    pub fn already_returned(loan_id: i32) -> Self {
        AppError::LoanRule {
            code: ErrorCode::AlreadyReturned,
            message: format!("Loan {} was already returned", loan_id),
        }
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::LoanRule {
                code: ErrorCode::AlreadyReturned,
                ..
            } => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::LoanRule { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::Authentication(msg) | AppError::Authorization(msg) => {
                (ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) | AppError::BadRequest(msg) => {
                (ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (ErrorCode::DbFailure, "Database error".to_string())
            }
            AppError::Conflict(msg) => (ErrorCode::Conflict, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (ErrorCode::Failure, "Internal server error".to_string())
            }
            AppError::LoanRule { code, message } => (*code, message.clone()),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_rules_are_bad_requests() {
        assert_eq!(AppError::out_of_stock(1).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::duplicate_loan(1).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::max_loans_reached("Ana", 3, 3).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::already_returned(4).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::loan_not_found(4).status(), StatusCode::NOT_FOUND);
    }
}
