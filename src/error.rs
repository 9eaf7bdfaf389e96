//! Error types for Biblioteca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BookUnavailable = 5,
    LoanAlreadyReturned = 6,
    Duplicate = 7,
    BadValue = 8,
    StoreUnavailable = 9,
}

/// Errors of the loan ledger (opening and closing loans)
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Referenced book, borrower or loan does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Only borrower accounts may hold loans
    #[error("{0} accounts cannot hold loans")]
    Ineligible(String),

    /// No copy left at decrement time
    #[error("No copies available for this book")]
    Unavailable,

    #[error("Loan already returned")]
    AlreadyClosed,

    /// The transaction could not be started, run or committed; nothing was applied
    #[error("Ledger store failure: {0}")]
    Infrastructure(#[from] sqlx::Error),
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

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AppError {
    /// Turn unique and foreign-key violations into a `Conflict` with the given message
    pub fn from_constraint(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::Failure, msg.clone())
            }
            AppError::Ledger(err) => match err {
                LedgerError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, err.to_string())
                }
                LedgerError::Ineligible(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::Failure, err.to_string())
                }
                LedgerError::Unavailable => {
                    (StatusCode::CONFLICT, ErrorCode::BookUnavailable, err.to_string())
                }
                LedgerError::AlreadyClosed => {
                    (StatusCode::CONFLICT, ErrorCode::LoanAlreadyReturned, err.to_string())
                }
                LedgerError::Infrastructure(e) => {
                    tracing::error!("Ledger store failure: {:?}", e);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        ErrorCode::StoreUnavailable,
                        "Loan store unavailable, nothing was changed; try again".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_code();

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

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn ledger_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(LedgerError::NotFound("Book 4".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(LedgerError::Unavailable.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(LedgerError::Ineligible("librarian".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(LedgerError::AlreadyClosed.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(LedgerError::Infrastructure(sqlx::Error::PoolTimedOut).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn ledger_error_codes_are_distinct() {
        let (_, unavailable, _) = AppError::from(LedgerError::Unavailable).status_and_code();
        let (_, closed, message) = AppError::from(LedgerError::AlreadyClosed).status_and_code();

        assert_eq!(unavailable, ErrorCode::BookUnavailable);
        assert_eq!(closed, ErrorCode::LoanAlreadyReturned);
        assert_eq!(message, "Loan already returned");
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let err = LedgerError::NotFound("Loan 12".to_string());
        assert_eq!(err.to_string(), "Loan 12 not found");
    }

    #[test]
    fn non_constraint_errors_stay_database_errors() {
        let err = AppError::from_constraint(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        assert_eq!(
            status_of(AppError::Authentication("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(AppError::Authorization("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(AppError::BusinessRule("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
