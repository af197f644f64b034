// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use ticketing_common::MessageResponse;

use crate::auth::{HashingError, SessionError};
use crate::mailer::MailError;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Why a bearer-authenticated request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header
    NoToken,
    /// Signature fine, `exp` in the past
    TokenExpired,
    /// Bad signature, structure or subject
    InvalidToken,
    /// Token subject does not resolve to an identity
    UserNotFound,
}

impl AuthRejection {
    pub fn message(self) -> &'static str {
        match self {
            AuthRejection::NoToken => "Not authorized, no token",
            AuthRejection::TokenExpired => "Not authorized, token expired",
            AuthRejection::InvalidToken => "Not authorized, invalid token",
            AuthRejection::UserNotFound => "Not authorized, user not found",
        }
    }
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    /// Unknown user and wrong password are indistinguishable to the client
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before logging in.")]
    EmailNotVerified,

    #[error("{}", .0.message())]
    Unauthorized(AuthRejection),

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::DuplicateUsername | AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::EmailNotVerified | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidVerificationToken | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::DuplicateUsername => "CONFLICT_001",
            AppError::DuplicateEmail => "CONFLICT_002",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::EmailNotVerified => "AUTH_002",
            AppError::Unauthorized(_) => "AUTH_003",
            AppError::AuthRateLimited => "AUTH_004",
            AppError::InvalidVerificationToken => "VERIFY_001",
            AppError::NotFound(_) => "NF_001",
            AppError::Configuration(_) => "CFG_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to show a client. Server-side failures never carry
    /// their cause past this point.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Configuration(_) | AppError::Internal(_) => "Server error".to_string(),
            AppError::NotFound(_) => "User not found".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        let body = MessageResponse::error(self.error_code(), self.client_message());
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => AppError::DuplicateUsername,
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::InvalidVerificationToken => AppError::InvalidVerificationToken,
            StoreError::NotFound => AppError::NotFound("identity".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::MissingSecret => AppError::Configuration(err.to_string()),
            SessionError::TokenExpired => AppError::Unauthorized(AuthRejection::TokenExpired),
            SessionError::TokenMalformed => AppError::Unauthorized(AuthRejection::InvalidToken),
            SessionError::Signing(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<HashingError> for AppError {
    fn from(err: HashingError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Validation(ValidationError::MissingFields("email")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::EmailNotVerified.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthorized(AuthRejection::NoToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidVerificationToken.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Configuration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_map_to_conflicts() {
        assert!(matches!(
            AppError::from(StoreError::DuplicateUsername),
            AppError::DuplicateUsername
        ));
        assert!(matches!(
            AppError::from(StoreError::DuplicateEmail),
            AppError::DuplicateEmail
        ));
    }

    #[test]
    fn test_session_errors_map_to_rejections() {
        assert!(matches!(
            AppError::from(SessionError::TokenExpired),
            AppError::Unauthorized(AuthRejection::TokenExpired)
        ));
        assert!(matches!(
            AppError::from(SessionError::TokenMalformed),
            AppError::Unauthorized(AuthRejection::InvalidToken)
        ));
        assert!(matches!(
            AppError::from(SessionError::MissingSecret),
            AppError::Configuration(_)
        ));
    }

    #[tokio::test]
    async fn test_server_errors_do_not_leak_detail() {
        let response =
            AppError::Configuration("JWT secret not configured".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "Server error");
        assert_eq!(body.code.as_deref(), Some("CFG_001"));
    }

    #[tokio::test]
    async fn test_rejection_message_is_returned() {
        let response = AppError::Unauthorized(AuthRejection::TokenExpired).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "Not authorized, token expired");
    }
}
