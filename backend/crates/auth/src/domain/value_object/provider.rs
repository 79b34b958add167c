//! Auth Provider Value Object
//!
//! Identifies how an account authenticates. Stored as text in the
//! database and embedded in token claims, so the string forms are stable.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthProvider {
    /// Email + password account
    Local,
    /// Google federated account
    Google,
    /// Kakao federated account
    Kakao,
}

impl AuthProvider {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "LOCAL",
            AuthProvider::Google => "GOOGLE",
            AuthProvider::Kakao => "KAKAO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOCAL" => Some(AuthProvider::Local),
            "GOOGLE" => Some(AuthProvider::Google),
            "KAKAO" => Some(AuthProvider::Kakao),
            _ => None,
        }
    }

    /// Federated providers reachable through the browser redirect flow
    pub const fn is_federated(&self) -> bool {
        !matches!(self, AuthProvider::Local)
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
