//! Login Use Case
//!
//! Authenticates a local account. Unknown email, wrong provider, and
//! wrong password all collapse into the same `InvalidCredentials`, and
//! the miss paths still burn a hash so response timing stays flat.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::refresh::RefreshLedger;
use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};
use crate::token::TokenPair;
use platform::password::ClearTextPassword;

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Login output
#[derive(Debug)]
pub struct LoginOutput {
    pub user: User,
    pub tokens: TokenPair,
}

/// Login use case
pub struct LoginUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    ledger: Arc<RefreshLedger<R>>,
    config: Arc<AuthConfig>,
}

impl<U, R> LoginUseCase<U, R>
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

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        let password =
            ClearTextPassword::new(input.password).map_err(|_| AuthError::InvalidCredentials)?;

        let Ok(email) = Email::new(&input.email) else {
            self.burn_hash(&password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some(mut user) = self.user_repo.find_by_email(&email).await? else {
            self.burn_hash(&password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some(hash) = user.password_hash.clone() else {
            // Federated account; no password to check
            self.burn_hash(&password);
            return Err(AuthError::InvalidCredentials);
        };

        if !hash.verify(&password, self.config.pepper()) {
            return Err(AuthError::InvalidCredentials);
        }

        // Correct password on a deactivated account restores it
        if !user.is_active {
            user.reactivate();
            tracing::info!(user_id = %user.id, "Deactivated account restored on login");
        }

        user.record_login();
        self.user_repo.update(&user).await?;

        let tokens = self.ledger.issue_pair(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutput { user, tokens })
    }

    /// Hash and discard, so miss paths cost as much as verify paths
    fn burn_hash(&self, password: &ClearTextPassword) {
        let _ = password.hash(self.config.pepper());
    }
}
