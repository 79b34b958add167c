//! Sign Up Use Case
//!
//! Creates a local (email + password) account and signs it in.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::refresh::RefreshLedger;
use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};
use crate::token::TokenPair;
use platform::password::ClearTextPassword;

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub user: User,
    pub tokens: TokenPair,
}

/// Sign up use case
pub struct SignUpUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    ledger: Arc<RefreshLedger<R>>,
    config: Arc<AuthConfig>,
}

impl<U, R> SignUpUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, ledger: Arc<RefreshLedger<R>>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            ledger,
            config,
        }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let email = Email::new(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("Name cannot be empty".into()));
        }

        let password = ClearTextPassword::new(input.password)?;

        // A deactivated account blocks re-registration rather than
        // silently resurrecting or shadowing it.
        if let Some(existing) = self.user_repo.find_by_email(&email).await? {
            return Err(if existing.is_active {
                AuthError::EmailAlreadyExists
            } else {
                AuthError::DeactivatedEmailExists
            });
        }

        let hash = password.hash(self.config.pepper())?;
        let mut user = User::new_local(email, name.to_string(), hash);
        user.record_login();
        self.user_repo.create(&user).await?;

        let tokens = self.ledger.issue_pair(&user).await?;

        tracing::info!(user_id = %user.id, "Local account created");

        Ok(SignUpOutput { user, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory::{MemoryRepo, local_user};
    use crate::token::test_keys;
    use chrono::Duration;

    fn use_case(repo: Arc<MemoryRepo>) -> SignUpUseCase<MemoryRepo, MemoryRepo> {
        let issuer = Arc::new(test_keys::issuer());
        let ledger = Arc::new(RefreshLedger::new(issuer, repo.clone(), Duration::seconds(10)));
        SignUpUseCase::new(repo, ledger, Arc::new(AuthConfig::development()))
    }

    fn input(email: &str) -> SignUpInput {
        SignUpInput {
            email: email.into(),
            password: "correct horse battery".into(),
            name: "New User".into(),
        }
    }

    #[tokio::test]
    async fn test_signup_creates_active_local_user() {
        let repo = Arc::new(MemoryRepo::new());
        let out = use_case(repo.clone()).execute(input("new@example.com")).await.unwrap();

        assert!(out.user.is_local());
        assert!(out.user.is_active);
        assert!(!out.tokens.access_token.is_empty());

        let stored = repo
            .find_by_email(&Email::new("new@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, out.user.id);
    }

    #[tokio::test]
    async fn test_signup_rejects_existing_active_email() {
        let repo = Arc::new(MemoryRepo::new());
        repo.create(&local_user("taken@example.com")).await.unwrap();

        let err = use_case(repo).execute(input("taken@example.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyExists));
    }

    #[tokio::test]
    async fn test_signup_rejects_deactivated_email() {
        let repo = Arc::new(MemoryRepo::new());
        let mut user = local_user("gone@example.com");
        user.deactivate();
        repo.create(&user).await.unwrap();

        let err = use_case(repo).execute(input("gone@example.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::DeactivatedEmailExists));
    }

    #[tokio::test]
    async fn test_signup_rejects_weak_password() {
        let repo = Arc::new(MemoryRepo::new());
        let err = use_case(repo)
            .execute(SignUpInput {
                email: "weak@example.com".into(),
                password: "short".into(),
                name: "W".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));
    }

    #[tokio::test]
    async fn test_signup_rejects_bad_email_and_empty_name() {
        let repo = Arc::new(MemoryRepo::new());
        let uc = use_case(repo);

        let err = uc.execute(input("not-an-email")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = uc
            .execute(SignUpInput {
                email: "ok@example.com".into(),
                password: "correct horse battery".into(),
                name: "   ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
