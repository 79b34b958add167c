//! Refresh Rotation
//!
//! Single-use refresh tokens with reuse detection. Every successful
//! rotation revokes the presented token and mints a successor; a token
//! presented again after its grace window has passed is treated as
//! theft evidence and the user's whole token family is revoked.

use std::sync::Arc;

use chrono::Duration;
use kernel::id::UserId;
use platform::crypto::sha256;

use crate::domain::entity::refresh_token::RefreshToken;
use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::error::{AuthError, AuthResult};
use crate::token::{IssuedRefresh, TokenIssuer, TokenPair, TokenType};

/// Server-side ledger of issued refresh tokens
pub struct RefreshLedger<R>
where
    R: RefreshTokenRepository,
{
    issuer: Arc<TokenIssuer>,
    repo: Arc<R>,
    grace: Duration,
}

impl<R> RefreshLedger<R>
where
    R: RefreshTokenRepository,
{
    pub fn new(issuer: Arc<TokenIssuer>, repo: Arc<R>, grace: Duration) -> Self {
        Self {
            issuer,
            repo,
            grace,
        }
    }

    /// Mint and record a refresh token for a user
    pub async fn issue(&self, user_id: &UserId) -> AuthResult<IssuedRefresh> {
        let issued = self.issuer.issue_refresh(user_id)?;
        let record = RefreshToken::new(
            *user_id,
            sha256(issued.token.as_bytes()).to_vec(),
            issued.expires_at,
        );
        self.repo.save(&record).await?;
        Ok(issued)
    }

    /// Mint a full credential pair for an authenticated user
    pub async fn issue_pair(&self, user: &User) -> AuthResult<TokenPair> {
        let access_token = self.issuer.issue_access(user)?;
        let refresh = self.issue(&user.id).await?;
        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }

    /// Rotate a presented refresh token.
    ///
    /// Exactly one caller wins the atomic revocation; a presenter that
    /// lost the race, or that re-presents shortly after a rotation,
    /// still gets a fresh successor while the revocation is inside the
    /// grace window. Beyond the window the presentation counts as
    /// reuse: the family is revoked and the caller gets `TokenReused`.
    pub async fn rotate(&self, raw: &str) -> AuthResult<(UserId, IssuedRefresh)> {
        // Signature and expiry first; an unsigned or expired token never
        // reaches the ledger.
        self.issuer
            .resolve_subject(raw, TokenType::Refresh)
            .ok_or(AuthError::InvalidRefreshToken)?;

        let token_hash = sha256(raw.as_bytes());
        let record = self
            .repo
            .find_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;
        // The ledger row is authoritative for ownership
        let user_id = record.user_id;

        if !record.is_revoked() && self.repo.revoke_if_active(&token_hash).await? {
            let issued = self.issue(&user_id).await?;
            return Ok((user_id, issued));
        }

        // Either the record was already revoked or another request beat
        // us to the revocation just now. Re-read for a current revoked_at.
        let record = self
            .repo
            .find_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if record.within_grace(self.grace) {
            tracing::info!(user_id = %user_id, "Refresh replay within grace window");
            let issued = self.issue(&user_id).await?;
            return Ok((user_id, issued));
        }

        let revoked = self.repo.revoke_all_for_user(&user_id).await?;
        tracing::warn!(
            user_id = %user_id,
            revoked,
            "Refresh token reuse detected, token family revoked"
        );
        Err(AuthError::TokenReused)
    }

    /// Revoke a presented token; absent or foreign tokens are a no-op
    pub async fn revoke(&self, raw: &str) -> AuthResult<()> {
        let token_hash = sha256(raw.as_bytes());
        self.repo.revoke_if_active(&token_hash).await?;
        Ok(())
    }

    /// Revoke every active token for a user
    pub async fn revoke_all(&self, user_id: &UserId) -> AuthResult<u64> {
        self.repo.revoke_all_for_user(user_id).await
    }

    /// Drop records whose embedded expiry has passed
    pub async fn sweep_expired(&self) -> AuthResult<u64> {
        self.repo.delete_expired().await
    }
}

/// Refresh use case: rotate the cookie pair for a still-active user
pub struct RefreshUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    ledger: Arc<RefreshLedger<R>>,
    issuer: Arc<TokenIssuer>,
}

impl<U, R> RefreshUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, ledger: Arc<RefreshLedger<R>>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            user_repo,
            ledger,
            issuer,
        }
    }

    pub async fn execute(&self, raw: &str) -> AuthResult<TokenPair> {
        let user_id = self
            .issuer
            .resolve_subject(raw, TokenType::Refresh)
            .ok_or(AuthError::InvalidRefreshToken)?;

        let user = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let (_, refresh) = self.ledger.rotate(raw).await?;
        let access_token = self.issuer.issue_access(&user)?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory::{MemoryRepo, local_user};
    use crate::token::test_keys;

    fn ledger(repo: Arc<MemoryRepo>, grace: Duration) -> RefreshLedger<MemoryRepo> {
        RefreshLedger::new(Arc::new(test_keys::issuer()), repo, grace)
    }

    #[tokio::test]
    async fn test_rotate_revokes_predecessor() {
        let repo = Arc::new(MemoryRepo::new());
        let ledger = ledger(repo.clone(), Duration::seconds(10));
        let user_id = UserId::new();

        let first = ledger.issue(&user_id).await.unwrap();
        let (rotated_for, second) = ledger.rotate(&first.token).await.unwrap();

        assert_eq!(rotated_for, user_id);
        assert_ne!(first.token, second.token);

        let record = repo
            .find_by_hash(&sha256(first.token.as_bytes()))
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_revoked());
    }

    #[tokio::test]
    async fn test_replay_within_grace_gets_fresh_successor() {
        let repo = Arc::new(MemoryRepo::new());
        let ledger = ledger(repo.clone(), Duration::seconds(10));
        let user_id = UserId::new();

        let first = ledger.issue(&user_id).await.unwrap();
        let (_, second) = ledger.rotate(&first.token).await.unwrap();

        // Same token again, well inside the grace window
        let (replay_for, third) = ledger.rotate(&first.token).await.unwrap();
        assert_eq!(replay_for, user_id);
        assert_ne!(third.token, second.token);

        // The successor from the replay is itself usable
        assert!(ledger.rotate(&third.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_replay_after_grace_revokes_family() {
        let repo = Arc::new(MemoryRepo::new());
        // Zero grace: any replay counts as reuse
        let ledger = ledger(repo.clone(), Duration::zero());
        let user_id = UserId::new();

        let first = ledger.issue(&user_id).await.unwrap();
        let (_, second) = ledger.rotate(&first.token).await.unwrap();

        let err = ledger.rotate(&first.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenReused));

        // The whole family is gone, including the live successor
        let err = ledger.rotate(&second.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenReused | AuthError::InvalidRefreshToken));
        let record = repo
            .find_by_hash(&sha256(second.token.as_bytes()))
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_revoked());
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let repo = Arc::new(MemoryRepo::new());
        let ledger = ledger(repo.clone(), Duration::seconds(10));

        // Valid signature but never saved to the ledger
        let foreign = test_keys::issuer().issue_refresh(&UserId::new()).unwrap();
        let err = ledger.rotate(&foreign.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));

        let err = ledger.rotate("garbage").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_concurrent_rotation_single_winner() {
        let repo = Arc::new(MemoryRepo::new());
        let ledger = Arc::new(ledger(repo.clone(), Duration::seconds(10)));
        let user_id = UserId::new();

        let first = ledger.issue(&user_id).await.unwrap();

        let (a, b) = tokio::join!(ledger.rotate(&first.token), ledger.rotate(&first.token));
        // Within the grace window both presentations succeed, but with
        // distinct successors
        let (_, ra) = a.unwrap();
        let (_, rb) = b.unwrap();
        assert_ne!(ra.token, rb.token);
    }

    #[tokio::test]
    async fn test_refresh_use_case_blocks_deactivated() {
        let repo = Arc::new(MemoryRepo::new());
        let issuer = Arc::new(test_keys::issuer());
        let ledger = Arc::new(RefreshLedger::new(
            issuer.clone(),
            repo.clone(),
            Duration::seconds(10),
        ));
        let use_case = RefreshUseCase::new(repo.clone(), ledger.clone(), issuer);

        let mut user = local_user("sleepy@example.com");
        user.deactivate();
        repo.create(&user).await.unwrap();

        let refresh = ledger.issue(&user.id).await.unwrap();
        let err = use_case.execute(&refresh.token).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn test_refresh_use_case_rotates_pair() {
        let repo = Arc::new(MemoryRepo::new());
        let issuer = Arc::new(test_keys::issuer());
        let ledger = Arc::new(RefreshLedger::new(
            issuer.clone(),
            repo.clone(),
            Duration::seconds(10),
        ));
        let use_case = RefreshUseCase::new(repo.clone(), ledger.clone(), issuer.clone());

        let user = local_user("awake@example.com");
        repo.create(&user).await.unwrap();

        let refresh = ledger.issue(&user.id).await.unwrap();
        let pair = use_case.execute(&refresh.token).await.unwrap();

        assert_eq!(
            issuer.resolve_subject(&pair.access_token, TokenType::Access),
            Some(user.id)
        );
        assert_ne!(pair.refresh_token, refresh.token);
    }
}
