//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::user::User;

// ============================================================================
// Sign Up / Login
// ============================================================================

/// Local signup request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Local login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ============================================================================
// Email Verification
// ============================================================================

/// Send-verification request (signup flow only; password reset uses
/// the forgot-password endpoint)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
    pub email: String,
}

/// Verify-email request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub email: String,
    pub purpose: String,
    pub code: String,
}

/// Verify-email response: a one-time handle the client presents back
/// when redeeming the verification (e.g. reset-password)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    pub verification_id: Uuid,
}

// ============================================================================
// Password Reset
// ============================================================================

/// Forgot-password request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub verification_id: Uuid,
}

// ============================================================================
// OAuth
// ============================================================================

/// Query string of a provider callback redirect
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
}

// ============================================================================
// Current User
// ============================================================================

/// Current user info response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub provider: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl MeResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.into_uuid(),
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            provider: user.provider.as_str().to_owned(),
            role: user.role.as_str().to_owned(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}
