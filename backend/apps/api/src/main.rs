//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use auth::config::AuthConfig;
use auth::handlers::AuthAppState;
use auth::infra::{GoogleOAuthClient, HttpMailer, KakaoOAuthClient, OAuthProviderConfig};
use auth::{PgAuthRepository, TokenIssuer, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use platform::crypto::BlindIndexer;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Field-level crypto master secret (base64, 32+ bytes decoded)
    let master_secret = {
        let b64 = env::var("CRYPTO_MASTER_SECRET")
            .expect("CRYPTO_MASTER_SECRET must be set in environment");
        let bytes = Engine::decode(&general_purpose::STANDARD, &b64)?;
        anyhow::ensure!(
            bytes.len() >= 32,
            "CRYPTO_MASTER_SECRET must decode to at least 32 bytes"
        );
        bytes
    };

    // Auth configuration
    let mut auth_config = if cfg!(debug_assertions) {
        AuthConfig::development()
    } else {
        AuthConfig::default()
    };
    auth_config.password_pepper = env::var("PASSWORD_PEPPER")
        .ok()
        .map(|b64| Engine::decode(&general_purpose::STANDARD, &b64))
        .transpose()?;
    if let Ok(url) = env::var("FRONTEND_REDIRECT_URL") {
        auth_config.frontend_url = url;
    }

    // RS256 signing keys
    let private_pem = read_pem_env("JWT_PRIVATE_KEY")?;
    let public_pem = read_pem_env("JWT_PUBLIC_KEY")?;
    let issuer = TokenIssuer::from_pem(
        &private_pem,
        &public_pem,
        auth_config.access_ttl,
        auth_config.refresh_ttl,
    )?;

    // OAuth providers
    let google = GoogleOAuthClient::new(provider_config_from_env("GOOGLE")?)?;
    let kakao = KakaoOAuthClient::new(provider_config_from_env("KAKAO")?)?;

    // Transactional mail; runs disabled without an API key so local
    // development never needs mail credentials
    let mailer = match env::var("MAIL_API_KEY") {
        Ok(key) => HttpMailer::new(
            env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "https://api.brevo.com/v3/smtp/email".to_string()),
            key,
            env::var("MAIL_SENDER_EMAIL").expect("MAIL_SENDER_EMAIL must be set with MAIL_API_KEY"),
            env::var("MAIL_SENDER_NAME").ok(),
        )?,
        Err(_) => {
            tracing::warn!("MAIL_API_KEY not set, outbound mail is disabled");
            HttpMailer::disabled()
        }
    };

    let repo = PgAuthRepository::new(pool.clone(), &master_secret);

    let auth_state = AuthAppState::new(
        Arc::new(repo),
        Arc::new(auth_config),
        Arc::new(issuer),
        Arc::new(mailer),
        Arc::new(google),
        Arc::new(kakao),
        BlindIndexer::new(&master_secret),
    );

    spawn_sweepers(&auth_state);

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/auth", auth_router(auth_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 31113));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Read a PEM either inline (`_PEM`) or from a file path (`_PATH`)
fn read_pem_env(prefix: &str) -> anyhow::Result<Vec<u8>> {
    if let Ok(pem) = env::var(format!("{prefix}_PEM")) {
        return Ok(pem.into_bytes());
    }
    let path = env::var(format!("{prefix}_PATH"))
        .map_err(|_| anyhow::anyhow!("{prefix}_PEM or {prefix}_PATH must be set"))?;
    Ok(std::fs::read(path)?)
}

fn provider_config_from_env(prefix: &str) -> anyhow::Result<OAuthProviderConfig> {
    Ok(OAuthProviderConfig {
        client_id: env::var(format!("{prefix}_CLIENT_ID"))
            .map_err(|_| anyhow::anyhow!("{prefix}_CLIENT_ID must be set"))?,
        client_secret: env::var(format!("{prefix}_CLIENT_SECRET"))
            .map_err(|_| anyhow::anyhow!("{prefix}_CLIENT_SECRET must be set"))?,
        redirect_uri: env::var(format!("{prefix}_REDIRECT_URI"))
            .map_err(|_| anyhow::anyhow!("{prefix}_REDIRECT_URI must be set"))?,
    })
}

/// Periodic cleanup of expired refresh tokens and old verification codes.
/// Failures are logged and retried on the next tick.
fn spawn_sweepers(state: &AuthAppState<PgAuthRepository>) {
    let ledger = state.ledger.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            match ledger.sweep_expired().await {
                Ok(n) if n > 0 => tracing::info!(deleted = n, "Expired refresh tokens swept"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Refresh token sweep failed"),
            }
        }
    });

    let verification = state.verification.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            match verification.sweep().await {
                Ok(n) if n > 0 => tracing::info!(deleted = n, "Old verification codes swept"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Verification code sweep failed"),
            }
        }
    });
}
