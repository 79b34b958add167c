//! Federated Login Use Case
//!
//! Exchanges a provider authorization code for a profile and signs the
//! matching account in, creating it on first contact. One account per
//! email: a federated login that collides with an email owned by a
//! different provider is refused with the owning provider named.

use std::sync::Arc;

use crate::application::refresh::RefreshLedger;
use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{email::Email, provider::AuthProvider};
use crate::error::{AuthError, AuthResult};
use crate::token::TokenPair;

/// Profile returned by an identity provider after code exchange
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: AuthProvider,
    pub provider_user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Identity provider port; HTTP implementations live in infra
#[trait_variant::make(OAuthClient: Send)]
pub trait LocalOAuthClient {
    fn provider(&self) -> AuthProvider;

    /// Browser redirect target that starts the provider's consent flow
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's profile
    async fn fetch_profile(&self, code: &str) -> AuthResult<ProviderProfile>;
}

/// Post-login avatar import port.
///
/// Returns the hosted URL on success, `None` to keep the pass-through
/// provider URL. Runs detached from the login request.
#[trait_variant::make(AvatarImporter: Send)]
pub trait LocalAvatarImporter {
    async fn import(&self, source_url: &str) -> Option<String>;
}

/// Importer that always keeps the provider's own URL
pub struct PassThroughAvatars;

impl AvatarImporter for PassThroughAvatars {
    async fn import(&self, _source_url: &str) -> Option<String> {
        None
    }
}

/// Federated login output
#[derive(Debug)]
pub struct OAuthLoginOutput {
    pub user: User,
    pub tokens: TokenPair,
    pub created: bool,
}

/// Federated login use case
pub struct OAuthLoginUseCase<U, R, A>
where
    U: UserRepository + Send + Sync + 'static,
    R: RefreshTokenRepository,
    A: AvatarImporter + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    ledger: Arc<RefreshLedger<R>>,
    avatars: Arc<A>,
}

impl<U, R, A> OAuthLoginUseCase<U, R, A>
where
    U: UserRepository + Send + Sync + 'static,
    R: RefreshTokenRepository,
    A: AvatarImporter + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, ledger: Arc<RefreshLedger<R>>, avatars: Arc<A>) -> Self {
        Self {
            user_repo,
            ledger,
            avatars,
        }
    }

    pub async fn execute<C>(&self, client: &C, code: &str) -> AuthResult<OAuthLoginOutput>
    where
        C: OAuthClient + Sync,
    {
        let provider = client.provider();
        let profile = client.fetch_profile(code).await?;

        let email = Email::new(&profile.email)
            .map_err(|_| AuthError::ProviderExchangeFailed { provider })?;

        let existing = self.user_repo.find_by_email(&email).await?;

        let (user, created) = match existing {
            Some(user) if user.provider == provider => {
                let mut user = user;
                if !user.is_active {
                    user.reactivate();
                    tracing::info!(user_id = %user.id, "Deactivated account restored on federated login");
                }
                user.record_login();
                self.user_repo.update(&user).await?;
                (user, false)
            }
            Some(user) => {
                return Err(AuthError::DuplicateEmail {
                    existing_provider: user.provider,
                });
            }
            None => {
                let name = profile
                    .name
                    .clone()
                    .unwrap_or_else(|| email.as_str().to_owned());
                let mut user = User::new_federated(
                    email,
                    name,
                    provider,
                    profile.provider_user_id.clone(),
                    profile.avatar_url.clone(),
                );
                user.record_login();
                self.user_repo.create(&user).await?;
                tracing::info!(user_id = %user.id, provider = %provider, "Federated account created");
                (user, true)
            }
        };

        // Detached avatar import; the login result never waits on it
        // and the pass-through URL stays in place when it yields nothing.
        if created {
            if let Some(source_url) = profile.avatar_url.clone() {
                let repo = self.user_repo.clone();
                let avatars = self.avatars.clone();
                let user_id = user.id;
                tokio::spawn(async move {
                    let Some(hosted) = avatars.import(&source_url).await else {
                        return;
                    };
                    match repo.find_by_id(&user_id).await {
                        Ok(Some(mut u)) => {
                            u.set_avatar_url(Some(hosted));
                            if let Err(e) = repo.update(&u).await {
                                tracing::warn!(error = %e, "Avatar import update failed");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "Avatar import lookup failed"),
                    }
                });
            }
        }

        let tokens = self.ledger.issue_pair(&user).await?;

        Ok(OAuthLoginOutput {
            user,
            tokens,
            created,
        })
    }
}
