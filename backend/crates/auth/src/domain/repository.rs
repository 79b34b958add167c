//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::{UserId, VerificationId};

use crate::domain::entity::{
    refresh_token::RefreshToken, user::User, verification_code::VerificationCode,
};
use crate::domain::value_object::{email::Email, purpose::VerificationPurpose};
use crate::error::AuthResult;

/// User repository trait
///
/// Lookups take the plaintext email; the implementation derives the
/// blind index itself so callers never handle index material.
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Find user by email, active or not
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Update user
    async fn update(&self, user: &User) -> AuthResult<()>;
}

/// Refresh token repository trait
#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    /// Persist a newly issued token record
    async fn save(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Find a token record by raw-token digest
    async fn find_by_hash(&self, token_hash: &[u8]) -> AuthResult<Option<RefreshToken>>;

    /// Atomically revoke the token iff it is still active.
    ///
    /// Returns true when this call performed the revocation. Under
    /// concurrent rotation exactly one caller sees true; the rest
    /// observe an already-revoked record.
    async fn revoke_if_active(&self, token_hash: &[u8]) -> AuthResult<bool>;

    /// Revoke every active token for a user
    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64>;

    /// Delete records whose embedded expiry has passed
    async fn delete_expired(&self) -> AuthResult<u64>;
}

/// Verification code repository trait
///
/// Codes are keyed by (email blind index, purpose); "latest" means by
/// creation time.
#[trait_variant::make(VerificationCodeRepository: Send)]
pub trait LocalVerificationCodeRepository {
    /// Persist a new code
    async fn create(&self, code: &VerificationCode) -> AuthResult<()>;

    /// Latest code for the stream, in any state
    async fn latest_for(
        &self,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>>;

    /// Latest code that has not been verified yet
    async fn latest_unverified(
        &self,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>>;

    /// Look up a verified handle by id, scoped to its stream
    async fn find_verified(
        &self,
        id: &VerificationId,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>>;

    /// Update a code (attempts, expiry, verified state)
    async fn update(&self, code: &VerificationCode) -> AuthResult<()>;

    /// Delete codes created before the cutoff
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64>;
}
