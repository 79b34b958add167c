//! Auth Router

use axum::{
    Router,
    routing::{get, post},
};

use crate::domain::repository::{
    RefreshTokenRepository, UserRepository, VerificationCodeRepository,
};
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};

/// Create the Auth router with PostgreSQL repository
pub fn auth_router(state: AuthAppState<PgAuthRepository>) -> Router {
    auth_router_generic(state)
}

/// Create a generic Auth router for any repository implementation
pub fn auth_router_generic<R>(state: AuthAppState<R>) -> Router
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/signup", post(handlers::sign_up::<R>))
        .route("/login", post(handlers::login::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .route("/logout-all", post(handlers::logout_all::<R>))
        .route("/authorize/{provider}", get(handlers::oauth_authorize::<R>))
        .route("/callback/{provider}", get(handlers::oauth_callback::<R>))
        .route("/send-verification", post(handlers::send_verification::<R>))
        .route("/verify-email", post(handlers::verify_email::<R>))
        .route("/forgot-password", post(handlers::forgot_password::<R>))
        .route("/reset-password", post(handlers::reset_password::<R>))
        .route("/me", get(handlers::me::<R>))
        .route("/deactivate", post(handlers::deactivate::<R>))
        .with_state(state)
}
