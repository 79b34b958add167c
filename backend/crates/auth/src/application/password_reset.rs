//! Password Reset Use Cases
//!
//! Forgot-password answers identically for unknown addresses and
//! federated accounts, so the endpoint cannot be used to probe which
//! emails exist. The actual reset requires a recent verified handle
//! from the PASSWORD_RESET stream and revokes every session on success.

use std::sync::Arc;

use kernel::id::VerificationId;
use platform::password::ClearTextPassword;

use crate::application::config::AuthConfig;
use crate::application::refresh::RefreshLedger;
use crate::application::verification::{CodeSource, EmailVerificationService, Mailer};
use crate::domain::repository::{
    RefreshTokenRepository, UserRepository, VerificationCodeRepository,
};
use crate::domain::value_object::{email::Email, purpose::VerificationPurpose};
use crate::error::{AuthError, AuthResult};

/// Forgot password use case: start the reset code stream
pub struct ForgotPasswordUseCase<U, V, M, S>
where
    U: UserRepository,
    V: VerificationCodeRepository,
    M: Mailer,
    S: CodeSource,
{
    user_repo: Arc<U>,
    verification: Arc<EmailVerificationService<V, M, S>>,
}

impl<U, V, M, S> ForgotPasswordUseCase<U, V, M, S>
where
    U: UserRepository,
    V: VerificationCodeRepository,
    M: Mailer,
    S: CodeSource,
{
    pub fn new(user_repo: Arc<U>, verification: Arc<EmailVerificationService<V, M, S>>) -> Self {
        Self {
            user_repo,
            verification,
        }
    }

    pub async fn execute(&self, email: &str) -> AuthResult<()> {
        // Malformed input gets the same silent OK as an unknown address
        let Ok(email) = Email::new(email) else {
            return Ok(());
        };

        match self.user_repo.find_by_email(&email).await? {
            Some(user) if user.is_local() && user.is_active => {
                // RateLimited still surfaces; it reveals only that the
                // caller themselves just asked.
                self.verification
                    .send(&email, VerificationPurpose::PasswordReset)
                    .await
            }
            _ => Ok(()),
        }
    }
}

/// Reset password input
pub struct ResetPasswordInput {
    pub email: String,
    pub new_password: String,
    pub verification_id: VerificationId,
}

/// Reset password use case: redeem the handle and swap the hash
pub struct ResetPasswordUseCase<U, R, V, M, S>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    V: VerificationCodeRepository,
    M: Mailer,
    S: CodeSource,
{
    user_repo: Arc<U>,
    ledger: Arc<RefreshLedger<R>>,
    verification: Arc<EmailVerificationService<V, M, S>>,
    config: Arc<AuthConfig>,
}

impl<U, R, V, M, S> ResetPasswordUseCase<U, R, V, M, S>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    V: VerificationCodeRepository,
    M: Mailer,
    S: CodeSource,
{
    pub fn new(
        user_repo: Arc<U>,
        ledger: Arc<RefreshLedger<R>>,
        verification: Arc<EmailVerificationService<V, M, S>>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            ledger,
            verification,
            config,
        }
    }

    pub async fn execute(&self, input: ResetPasswordInput) -> AuthResult<()> {
        let email =
            Email::new(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;
        let password = ClearTextPassword::new(input.new_password)?;

        self.verification
            .redeem(
                &input.verification_id,
                &email,
                VerificationPurpose::PasswordReset,
            )
            .await?;

        let mut user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::EmailNotVerified)?;

        if !user.is_local() {
            return Err(AuthError::EmailNotVerified);
        }

        user.set_password_hash(password.hash(self.config.pepper())?);
        self.user_repo.update(&user).await?;

        // A reset invalidates every open session
        self.ledger.revoke_all(&user.id).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory::{
        MemoryRepo, indexer, local_user_with_password,
    };
    use crate::application::verification::tests_support::{FixedCodes, RecordingMailer};
    use crate::token::test_keys;
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    type Svc = EmailVerificationService<MemoryRepo, RecordingMailer, FixedCodes>;

    struct Fixture {
        repo: Arc<MemoryRepo>,
        mailer: Arc<RecordingMailer>,
        verification: Arc<Svc>,
        ledger: Arc<RefreshLedger<MemoryRepo>>,
        config: Arc<AuthConfig>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepo::new());
        let mailer = Arc::new(RecordingMailer::default());
        let config = Arc::new(AuthConfig::development());
        let verification = Arc::new(EmailVerificationService::new(
            repo.clone(),
            mailer.clone(),
            FixedCodes(4213),
            indexer(),
            config.clone(),
        ));
        let ledger = Arc::new(RefreshLedger::new(
            Arc::new(test_keys::issuer()),
            repo.clone(),
            Duration::zero(),
        ));
        Fixture {
            repo,
            mailer,
            verification,
            ledger,
            config,
        }
    }

    #[tokio::test]
    async fn test_forgot_password_silent_for_unknown_and_federated() {
        let f = fixture();
        let uc = ForgotPasswordUseCase::new(f.repo.clone(), f.verification.clone());

        uc.execute("nobody@example.com").await.unwrap();
        uc.execute("not-an-email").await.unwrap();
        assert_eq!(f.mailer.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forgot_password_sends_for_local_account() {
        let f = fixture();
        UserRepository::create(
            &*f.repo,
            &local_user_with_password("resets@example.com", "old password 1"),
        )
        .await
        .unwrap();
        let uc = ForgotPasswordUseCase::new(f.repo.clone(), f.verification.clone());

        uc.execute("resets@example.com").await.unwrap();
        assert_eq!(f.mailer.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_reset_flow_revokes_sessions() {
        let f = fixture();
        let user = local_user_with_password("resets@example.com", "old password 1");
        UserRepository::create(&*f.repo, &user).await.unwrap();
        let open_session = f.ledger.issue(&user.id).await.unwrap();

        let email = Email::new("resets@example.com").unwrap();
        f.verification
            .send(&email, VerificationPurpose::PasswordReset)
            .await
            .unwrap();
        let handle = f
            .verification
            .verify(&email, VerificationPurpose::PasswordReset, "04213")
            .await
            .unwrap();

        let uc = ResetPasswordUseCase::new(
            f.repo.clone(),
            f.ledger.clone(),
            f.verification.clone(),
            f.config.clone(),
        );
        uc.execute(ResetPasswordInput {
            email: "resets@example.com".into(),
            new_password: "new password 22".into(),
            verification_id: handle,
        })
        .await
        .unwrap();

        let stored = f.repo.find_by_id(&user.id).await.unwrap().unwrap();
        let new_pw = ClearTextPassword::new("new password 22".to_string()).unwrap();
        assert!(stored.password_hash.unwrap().verify(&new_pw, None));

        assert!(f.ledger.rotate(&open_session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_without_verified_handle_refused() {
        let f = fixture();
        UserRepository::create(
            &*f.repo,
            &local_user_with_password("resets@example.com", "old password 1"),
        )
        .await
        .unwrap();
        let uc = ResetPasswordUseCase::new(
            f.repo.clone(),
            f.ledger.clone(),
            f.verification.clone(),
            f.config.clone(),
        );

        let err = uc
            .execute(ResetPasswordInput {
                email: "resets@example.com".into(),
                new_password: "new password 22".into(),
                verification_id: VerificationId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailNotVerified));
    }
}
