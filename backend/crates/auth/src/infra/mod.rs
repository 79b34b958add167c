//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod mailer;
pub mod oauth;
pub mod postgres;

pub use mailer::HttpMailer;
pub use oauth::{GoogleOAuthClient, KakaoOAuthClient, OAuthProviderConfig};
pub use postgres::PgAuthRepository;
