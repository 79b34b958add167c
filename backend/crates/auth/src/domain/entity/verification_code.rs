//! Verification Code Entity
//!
//! A short-lived 5-digit challenge mailed to an address. Keyed by the
//! email's blind index so the plaintext address never lands in this
//! table.

use chrono::{DateTime, Duration, Utc};
use kernel::id::VerificationId;

use crate::domain::value_object::purpose::VerificationPurpose;

/// Verification code record
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub id: VerificationId,
    /// Blind index of the normalized email
    pub email_hash: Vec<u8>,
    pub purpose: VerificationPurpose,
    /// Zero-padded 5-digit code
    pub code: String,
    /// Failed match count; the cap force-expires the code
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn new(
        email_hash: Vec<u8>,
        purpose: VerificationPurpose,
        code: String,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: VerificationId::new(),
            email_hash,
            purpose,
            code,
            attempts: 0,
            expires_at: now + ttl,
            verified: false,
            verified_at: None,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Record a failed match
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Mark the code as successfully verified
    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.verified_at = Some(Utc::now());
    }

    /// Force the code out of play immediately
    pub fn force_expire(&mut self) {
        self.expires_at = Utc::now();
    }

    /// A verified handle is only redeemable for a short window
    pub fn redeemable_within(&self, window: Duration) -> bool {
        match self.verified_at {
            Some(verified_at) if self.verified => Utc::now() <= verified_at + window,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> VerificationCode {
        VerificationCode::new(
            vec![7; 32],
            VerificationPurpose::Signup,
            "04213".into(),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_new_code_live() {
        let c = code();
        assert!(!c.is_expired());
        assert!(!c.verified);
        assert_eq!(c.attempts, 0);
    }

    #[test]
    fn test_force_expire() {
        let mut c = code();
        c.force_expire();
        // expires_at is now in the past or exactly now; either way no longer live
        assert!(c.expires_at <= Utc::now());
    }

    #[test]
    fn test_redeemable_window() {
        let mut c = code();
        assert!(!c.redeemable_within(Duration::minutes(10)));
        c.mark_verified();
        assert!(c.redeemable_within(Duration::minutes(10)));
        c.verified_at = Some(Utc::now() - Duration::minutes(11));
        assert!(!c.redeemable_within(Duration::minutes(10)));
    }
}
