//! Identity Provider Clients
//!
//! Google and Kakao implementations of the `OAuthClient` port. Both
//! calls (code exchange, profile fetch) are time-bounded by the shared
//! reqwest client; any failure collapses into `ProviderExchangeFailed`
//! with the detail kept in the log, never in the response.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;

use crate::application::oauth::{OAuthClient, ProviderProfile};
use crate::domain::value_object::provider::AuthProvider;
use crate::error::{AuthError, AuthResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider app registration
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

fn http_client() -> AuthResult<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| AuthError::Internal(format!("HTTP client build failed: {e}")))
}

fn exchange_failed(provider: AuthProvider, stage: &str, detail: impl std::fmt::Display) -> AuthError {
    tracing::warn!(provider = %provider, stage, error = %detail, "Provider exchange failed");
    AuthError::ProviderExchangeFailed { provider }
}

/// Google OAuth2 client (authorization code flow)
pub struct GoogleOAuthClient {
    config: OAuthProviderConfig,
    http: Client,
}

impl GoogleOAuthClient {
    pub fn new(config: OAuthProviderConfig) -> AuthResult<Self> {
        Ok(Self {
            config,
            http: http_client()?,
        })
    }
}

impl OAuthClient for GoogleOAuthClient {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Google
    }

    fn authorize_url(&self, state: &str) -> String {
        // Checked params; the base URL is a constant
        Url::parse_with_params(
            "https://accounts.google.com/o/oauth2/v2/auth",
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .map(Into::into)
        .unwrap_or_default()
    }

    async fn fetch_profile(&self, code: &str) -> AuthResult<ProviderProfile> {
        let provider = AuthProvider::Google;

        let token: Value = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| exchange_failed(provider, "token", e))?
            .error_for_status()
            .map_err(|e| exchange_failed(provider, "token", e))?
            .json()
            .await
            .map_err(|e| exchange_failed(provider, "token", e))?;

        let access_token = token["access_token"]
            .as_str()
            .ok_or_else(|| exchange_failed(provider, "token", "no access_token in response"))?;

        let profile: Value = self
            .http
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| exchange_failed(provider, "profile", e))?
            .error_for_status()
            .map_err(|e| exchange_failed(provider, "profile", e))?
            .json()
            .await
            .map_err(|e| exchange_failed(provider, "profile", e))?;

        let provider_user_id = profile["id"]
            .as_str()
            .ok_or_else(|| exchange_failed(provider, "profile", "no id in profile"))?
            .to_owned();
        let email = profile["email"]
            .as_str()
            .ok_or_else(|| exchange_failed(provider, "profile", "no email in profile"))?
            .to_owned();

        Ok(ProviderProfile {
            provider,
            provider_user_id,
            email,
            name: profile["name"].as_str().map(str::to_owned),
            avatar_url: profile["picture"].as_str().map(str::to_owned),
        })
    }
}

/// Kakao OAuth2 client (authorization code flow)
pub struct KakaoOAuthClient {
    config: OAuthProviderConfig,
    http: Client,
}

impl KakaoOAuthClient {
    pub fn new(config: OAuthProviderConfig) -> AuthResult<Self> {
        Ok(Self {
            config,
            http: http_client()?,
        })
    }
}

impl OAuthClient for KakaoOAuthClient {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Kakao
    }

    fn authorize_url(&self, state: &str) -> String {
        Url::parse_with_params(
            "https://kauth.kakao.com/oauth/authorize",
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("state", state),
            ],
        )
        .map(Into::into)
        .unwrap_or_default()
    }

    async fn fetch_profile(&self, code: &str) -> AuthResult<ProviderProfile> {
        let provider = AuthProvider::Kakao;

        let token: Value = self
            .http
            .post("https://kauth.kakao.com/oauth/token")
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| exchange_failed(provider, "token", e))?
            .error_for_status()
            .map_err(|e| exchange_failed(provider, "token", e))?
            .json()
            .await
            .map_err(|e| exchange_failed(provider, "token", e))?;

        let access_token = token["access_token"]
            .as_str()
            .ok_or_else(|| exchange_failed(provider, "token", "no access_token in response"))?;

        let me: Value = self
            .http
            .get("https://kapi.kakao.com/v2/user/me")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| exchange_failed(provider, "profile", e))?
            .error_for_status()
            .map_err(|e| exchange_failed(provider, "profile", e))?
            .json()
            .await
            .map_err(|e| exchange_failed(provider, "profile", e))?;

        let provider_user_id = me["id"]
            .as_i64()
            .ok_or_else(|| exchange_failed(provider, "profile", "no id in profile"))?
            .to_string();
        let account = &me["kakao_account"];
        let email = account["email"]
            .as_str()
            .ok_or_else(|| exchange_failed(provider, "profile", "no email in kakao_account"))?
            .to_owned();

        Ok(ProviderProfile {
            provider,
            provider_user_id,
            email,
            name: account["profile"]["nickname"].as_str().map(str::to_owned),
            avatar_url: account["profile"]["profile_image_url"]
                .as_str()
                .map(str::to_owned),
        })
    }
}
