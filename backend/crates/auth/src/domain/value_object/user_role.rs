//! User Role Value Object
//!
//! Stored as text and embedded in access token claims, so the string
//! forms are stable.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Standard,
    Admin,
}

impl UserRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UserRole::Standard => "STANDARD",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Unknown values fall back to Standard rather than panicking,
    /// so a bad row cannot take the whole request path down.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ADMIN" => UserRole::Admin,
            "STANDARD" => UserRole::Standard,
            other => {
                tracing::warn!(code = %other, "Unknown user role, defaulting to STANDARD");
                UserRole::Standard
            }
        }
    }

    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
