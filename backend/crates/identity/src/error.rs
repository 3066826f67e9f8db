//! Identity Error Types
//!
//! Identity-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::service::conflict::RegistrationConflict;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Failures while minting or reading a session token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token claims")]
    InvalidClaims,

    #[error("Token has expired")]
    Expired,

    #[error("Token subject was rejected")]
    ValidationRejected,

    /// Claims could not be encoded
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Identity-specific error variants
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    #[error("Either an email or a phone number is required")]
    MissingIdentifier,

    /// Identifier already taken at registration
    #[error("{0}")]
    Conflict(RegistrationConflict),

    /// No non-deleted account matches
    #[error("Account not found")]
    AccountNotFound,

    /// No account matches, deleted or not
    #[error("No account exists with this identifier")]
    NoSuchAccount,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication token is required")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Refresh token is not the one currently on record
    #[error("Refresh token has been revoked")]
    TokenRevoked,

    /// Access token is valid but the account has logged out
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Only admins can perform this action")]
    Forbidden,

    #[error("Account already logged out")]
    AlreadyLoggedOut,

    #[error("Account is already active")]
    AlreadyActive,

    #[error("Account is already deactivated")]
    AlreadyDeactivated,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// The account is already where the caller wanted it; not a hard failure
    pub fn is_already_in_state(&self) -> bool {
        matches!(
            self,
            IdentityError::AlreadyLoggedOut
                | IdentityError::AlreadyActive
                | IdentityError::AlreadyDeactivated
        )
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        if self.is_already_in_state() {
            return StatusCode::OK;
        }
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        use IdentityError::*;
        match self {
            Validation(_) | MissingIdentifier => ErrorKind::BadRequest,
            Conflict(_) => ErrorKind::Conflict,
            AccountNotFound | NoSuchAccount => ErrorKind::NotFound,
            InvalidCredentials | MissingToken | TokenRevoked | SessionExpired => {
                ErrorKind::Unauthorized
            }
            Token(TokenError::Signing(_)) => ErrorKind::InternalServerError,
            Token(_) => ErrorKind::Unauthorized,
            Forbidden => ErrorKind::Forbidden,
            AlreadyLoggedOut | AlreadyActive | AlreadyDeactivated => ErrorKind::Conflict,
            Hashing(_) | Database(_) | Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let error = AppError::new(self.kind(), self.to_string());
        match self {
            IdentityError::Conflict(conflict) if conflict.requires_activation() => {
                error.with_action("Activate the existing account")
            }
            IdentityError::SessionExpired | IdentityError::TokenRevoked => {
                error.with_action("Log in again")
            }
            _ => error,
        }
    }

    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Hashing(msg) | IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            IdentityError::TokenRevoked => {
                tracing::warn!("Revoked refresh token presented");
            }
            IdentityError::Token(e) => {
                tracing::warn!(error = %e, "Token rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();

        if self.is_already_in_state() {
            let body = serde_json::json!({
                "status": "success",
                "message": self.to_string(),
            });
            return (StatusCode::OK, Json(body)).into_response();
        }

        match self {
            // Pool exhaustion and lost connections answer 503
            IdentityError::Database(e) => AppError::from(e).into_response(),
            other => other.to_app_error().into_response(),
        }
    }
}

impl From<AppError> for IdentityError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => IdentityError::Validation(err.message().to_string()),
            _ => IdentityError::Internal(err.to_string()),
        }
    }
}
