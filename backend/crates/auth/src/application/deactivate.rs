//! Account Deactivation Use Case
//!
//! Soft-deletes the account and revokes every outstanding session. The
//! row survives so the email stays claimed and a later successful
//! authentication can restore it.

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::refresh::RefreshLedger;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

/// Deactivate use case
pub struct DeactivateUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    ledger: Arc<RefreshLedger<R>>,
}

impl<U, R> DeactivateUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, ledger: Arc<RefreshLedger<R>>) -> Self {
        Self { user_repo, ledger }
    }

    pub async fn execute(&self, user_id: &UserId) -> AuthResult<()> {
        let mut user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        user.deactivate();
        self.user_repo.update(&user).await?;
        self.ledger.revoke_all(user_id).await?;

        tracing::info!(user_id = %user_id, "Account deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory::{MemoryRepo, local_user};
    use crate::token::test_keys;
    use chrono::Duration;

    #[tokio::test]
    async fn test_deactivate_soft_deletes_and_revokes() {
        let repo = Arc::new(MemoryRepo::new());
        let ledger = Arc::new(RefreshLedger::new(
            Arc::new(test_keys::issuer()),
            repo.clone(),
            Duration::zero(),
        ));
        let use_case = DeactivateUseCase::new(repo.clone(), ledger.clone());

        let user = local_user("bye@example.com");
        repo.create(&user).await.unwrap();
        let issued = ledger.issue(&user.id).await.unwrap();

        use_case.execute(&user.id).await.unwrap();

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(ledger.rotate(&issued.token).await.is_err());
    }
}
