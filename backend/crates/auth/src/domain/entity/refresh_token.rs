//! Refresh Token Entity
//!
//! Server-side record of an issued refresh credential. Only the SHA-256
//! digest of the raw token is stored; the raw value exists once, in the
//! cookie handed to the client.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{RefreshTokenId, UserId};

/// Refresh token record
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    /// SHA-256 of the raw token string
    pub token_hash: Vec<u8>,
    /// Mirrors the embedded expiry claim
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, on rotation or revocation
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(user_id: UserId, token_hash: Vec<u8>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: RefreshTokenId::new(),
            user_id,
            token_hash,
            expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// True while a just-revoked token is still inside the grace window
    /// where a second presentation is treated as a benign race.
    pub fn within_grace(&self, grace: Duration) -> bool {
        match self.revoked_at {
            Some(revoked_at) => Utc::now() <= revoked_at + grace,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_not_revoked() {
        let token = RefreshToken::new(UserId::new(), vec![1; 32], Utc::now() + Duration::days(14));
        assert!(!token.is_revoked());
        assert!(!token.is_expired());
        assert!(!token.within_grace(Duration::seconds(10)));
    }

    #[test]
    fn test_grace_window() {
        let mut token =
            RefreshToken::new(UserId::new(), vec![1; 32], Utc::now() + Duration::days(14));
        token.revoked_at = Some(Utc::now() - Duration::seconds(5));
        assert!(token.within_grace(Duration::seconds(10)));
        assert!(!token.within_grace(Duration::seconds(3)));
    }
}
