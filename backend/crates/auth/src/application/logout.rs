//! Logout Use Cases
//!
//! Logout revokes the presented refresh token; logout-everywhere
//! revokes the caller's whole family. Both succeed regardless of the
//! cookie's state, so a client can always reach a logged-out state.

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::refresh::RefreshLedger;
use crate::domain::repository::RefreshTokenRepository;
use crate::error::AuthResult;

/// Logout use case
pub struct LogoutUseCase<R>
where
    R: RefreshTokenRepository,
{
    ledger: Arc<RefreshLedger<R>>,
}

impl<R> LogoutUseCase<R>
where
    R: RefreshTokenRepository,
{
    pub fn new(ledger: Arc<RefreshLedger<R>>) -> Self {
        Self { ledger }
    }

    /// Revoke one refresh token; absent or unknown cookies are a no-op
    pub async fn execute(&self, refresh_token: Option<&str>) -> AuthResult<()> {
        if let Some(raw) = refresh_token {
            self.ledger.revoke(raw).await?;
        }
        Ok(())
    }

    /// Revoke every session the user has
    pub async fn execute_all(&self, user_id: &UserId) -> AuthResult<()> {
        let revoked = self.ledger.revoke_all(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "Logged out everywhere");
        Ok(())
    }
}
