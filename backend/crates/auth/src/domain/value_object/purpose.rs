//! Verification Purpose Value Object
//!
//! Codes for different purposes live in separate streams: a code sent
//! for sign-up can never be redeemed for a password reset.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationPurpose {
    Signup,
    PasswordReset,
}

impl VerificationPurpose {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VerificationPurpose::Signup => "SIGNUP",
            VerificationPurpose::PasswordReset => "PASSWORD_RESET",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SIGNUP" => Some(VerificationPurpose::Signup),
            "PASSWORD_RESET" => Some(VerificationPurpose::PasswordReset),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_roundtrip() {
        assert_eq!(
            VerificationPurpose::parse("SIGNUP"),
            Some(VerificationPurpose::Signup)
        );
        assert_eq!(
            VerificationPurpose::parse("PASSWORD_RESET"),
            Some(VerificationPurpose::PasswordReset)
        );
        assert_eq!(VerificationPurpose::parse("signup"), None);
        assert_eq!(VerificationPurpose::parse(""), None);
    }
}
