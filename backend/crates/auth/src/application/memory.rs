//! In-memory repository for application-layer tests.
//!
//! One struct implements every repository trait, mirroring how the
//! Postgres implementation bundles them. Email lookups use the same
//! blind-index scheme as production so lookup semantics match.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use kernel::id::{UserId, VerificationId};
use platform::crypto::BlindIndexer;
use platform::password::{ClearTextPassword, HashedPassword};

use crate::domain::entity::{
    refresh_token::RefreshToken, user::User, verification_code::VerificationCode,
};
use crate::domain::repository::{
    UserRepository, RefreshTokenRepository, VerificationCodeRepository,
};
use crate::domain::value_object::{email::Email, purpose::VerificationPurpose};
use crate::error::AuthResult;

pub(crate) const TEST_MASTER_SECRET: &[u8] = b"test-master-secret";

pub(crate) fn indexer() -> BlindIndexer {
    BlindIndexer::new(TEST_MASTER_SECRET)
}

/// A local user with an unverifiable placeholder hash, for tests that
/// never check the password.
pub(crate) fn local_user(email: &str) -> User {
    let hash = HashedPassword::from_phc_string(
        "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNoaGFzaA",
    )
    .unwrap();
    User::new_local(Email::new(email).unwrap(), "Test User".into(), hash)
}

/// A local user whose hash verifies against `password`.
pub(crate) fn local_user_with_password(email: &str, password: &str) -> User {
    let hash = ClearTextPassword::new(password.to_string())
        .unwrap()
        .hash(None)
        .unwrap();
    User::new_local(Email::new(email).unwrap(), "Test User".into(), hash)
}

#[derive(Default)]
pub(crate) struct MemoryRepo {
    users: Mutex<Vec<User>>,
    tokens: Mutex<Vec<RefreshToken>>,
    codes: Mutex<Vec<VerificationCode>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdate a token's revocation, to age it out of the grace window
    #[allow(dead_code)]
    pub fn backdate_revocation(&self, token_hash: &[u8], revoked_at: DateTime<Utc>) {
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(t) = tokens.iter_mut().find(|t| t.token_hash == token_hash) {
            t.revoked_at = Some(revoked_at);
        }
    }
}

impl UserRepository for MemoryRepo {
    async fn create(&self, user: &User) -> AuthResult<()> {
        self.users.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == *user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == *email)
            .cloned())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == user.id) {
            *u = user.clone();
        }
        Ok(())
    }
}

impl RefreshTokenRepository for MemoryRepo {
    async fn save(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &[u8]) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_if_active(&self, token_hash: &[u8]) -> AuthResult<bool> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && t.revoked_at.is_none())
        {
            Some(t) => {
                t.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let mut revoked = 0;
        for t in tokens
            .iter_mut()
            .filter(|t| t.user_id == *user_id && t.revoked_at.is_none())
        {
            t.revoked_at = Some(Utc::now());
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        let now = Utc::now();
        tokens.retain(|t| t.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

impl VerificationCodeRepository for MemoryRepo {
    async fn create(&self, code: &VerificationCode) -> AuthResult<()> {
        self.codes.lock().unwrap().push(code.clone());
        Ok(())
    }

    async fn latest_for(
        &self,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email_hash == email_hash && c.purpose == purpose)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn latest_unverified(
        &self,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email_hash == email_hash && c.purpose == purpose && !c.verified)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn find_verified(
        &self,
        id: &VerificationId,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .find(|c| {
                c.id == *id && c.email_hash == email_hash && c.purpose == purpose && c.verified
            })
            .cloned())
    }

    async fn update(&self, code: &VerificationCode) -> AuthResult<()> {
        let mut codes = self.codes.lock().unwrap();
        if let Some(c) = codes.iter_mut().find(|c| c.id == code.id) {
            *c = code.clone();
        }
        Ok(())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let mut codes = self.codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|c| c.created_at >= cutoff);
        Ok((before - codes.len()) as u64)
    }
}
