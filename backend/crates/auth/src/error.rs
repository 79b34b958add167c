//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system. Every variant
//! carries a stable machine-readable code where clients branch on it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::value_object::provider::AuthProvider;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or wrong password. Deliberately a single variant so
    /// callers cannot tell which half failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An active account already exists for this email
    #[error("An account with this email already exists")]
    EmailAlreadyExists,

    /// A deactivated account exists for this email (sign-up path)
    #[error("A deactivated account with this email exists")]
    DeactivatedEmailExists,

    /// The account tied to this credential has been deactivated
    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Federated login hit an email already owned by another provider
    #[error("Email is already registered with {existing_provider}")]
    DuplicateEmail { existing_provider: AuthProvider },

    /// Refresh token is missing, malformed, expired, or unknown
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh token was presented again after its grace window;
    /// the whole family has been revoked
    #[error("Refresh token reuse detected")]
    TokenReused,

    /// Verification code resend requested inside the cooldown window
    #[error("Please wait before requesting another code")]
    RateLimited,

    /// Submitted verification code does not match the live code
    #[error("Invalid verification code")]
    InvalidCode,

    /// Submitted code is not a 5-digit string
    #[error("Verification code must be 5 digits")]
    InvalidCodeFormat,

    /// Unknown verification purpose string
    #[error("Invalid verification purpose")]
    InvalidPurpose,

    /// Verification code has expired
    #[error("Verification code has expired")]
    CodeExpired,

    /// Attempt counter reached the cap; the code is force-expired
    #[error("Too many verification attempts")]
    TooManyAttempts,

    /// Privileged operation requires a recent verified handle
    #[error("Email verification required")]
    EmailNotVerified,

    /// Identity provider code exchange or profile fetch failed
    #[error("{provider} sign-in failed")]
    ProviderExchangeFailed { provider: AuthProvider },

    /// Request payload validation error
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Password policy violation
    #[error("Password validation failed: {0}")]
    PasswordPolicy(#[from] platform::password::PasswordPolicyError),

    /// Password hashing failure
    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] platform::password::PasswordHashError),

    /// Field encryption/decryption failure
    #[error("Crypto error: {0}")]
    Crypto(#[from] platform::crypto::CryptoError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::TokenReused => ErrorKind::Unauthorized,
            AuthError::EmailAlreadyExists
            | AuthError::DeactivatedEmailExists
            | AuthError::DuplicateEmail { .. } => ErrorKind::Conflict,
            AuthError::AccountDeactivated | AuthError::EmailNotVerified => ErrorKind::Forbidden,
            AuthError::RateLimited | AuthError::TooManyAttempts => ErrorKind::TooManyRequests,
            AuthError::CodeExpired => ErrorKind::Gone,
            AuthError::InvalidCode
            | AuthError::InvalidCodeFormat
            | AuthError::InvalidPurpose
            | AuthError::Validation(_)
            | AuthError::PasswordPolicy(_) => ErrorKind::BadRequest,
            AuthError::ProviderExchangeFailed { .. } => ErrorKind::ServiceUnavailable,
            AuthError::PasswordHash(_)
            | AuthError::Crypto(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Stable machine-readable code, where one exists
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AuthError::EmailAlreadyExists => Some("EMAIL_EXISTS"),
            AuthError::DeactivatedEmailExists | AuthError::AccountDeactivated => {
                Some("ACCOUNT_DEACTIVATED")
            }
            AuthError::DuplicateEmail { .. } => Some("DUPLICATE_EMAIL"),
            AuthError::TokenReused => Some("TOKEN_REUSED"),
            AuthError::RateLimited => Some("RATE_LIMITED"),
            AuthError::InvalidCode => Some("INVALID_CODE"),
            AuthError::InvalidCodeFormat => Some("INVALID_CODE_FORMAT"),
            AuthError::InvalidPurpose => Some("INVALID_PURPOSE"),
            AuthError::CodeExpired => Some("CODE_EXPIRED"),
            AuthError::TooManyAttempts => Some("TOO_MANY_ATTEMPTS"),
            AuthError::EmailNotVerified => Some("EMAIL_NOT_VERIFIED"),
            AuthError::ProviderExchangeFailed { .. } => Some("OAUTH_FAILED"),
            _ => None,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self.code() {
            Some(code) => err.with_code(code),
            None => err,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::PasswordHash(e) => {
                tracing::error!(error = %e, "Password hashing error");
            }
            AuthError::Crypto(e) => {
                tracing::error!(error = %e, "Field crypto error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::TokenReused => {
                tracing::warn!("Refresh token reuse detected, family revoked");
            }
            AuthError::ProviderExchangeFailed { provider } => {
                tracing::warn!(provider = %provider, "Identity provider exchange failed");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
