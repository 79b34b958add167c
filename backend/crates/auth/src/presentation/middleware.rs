//! Auth Middleware
//!
//! Middleware for requiring a valid access token on protected routes.
//! Validation is stateless; only the refresh endpoint touches the
//! token ledger.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::AuthConfig;
use crate::token::{TokenIssuer, TokenType};

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub issuer: Arc<TokenIssuer>,
    pub config: Arc<AuthConfig>,
}

/// Authenticated caller, stored in request extensions by `require_auth`
#[derive(Clone, Copy, Debug)]
pub struct CurrentIdentity(pub UserId);

/// Middleware that requires a valid access token cookie
pub async fn require_auth(
    state: AuthMiddlewareState,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = platform::cookie::extract_cookie(req.headers(), &state.config.access_cookie_name);

    let user_id = token
        .as_deref()
        .and_then(|t| state.issuer.resolve_subject(t, TokenType::Access));

    let Some(user_id) = user_id else {
        return Err((StatusCode::UNAUTHORIZED, [("X-Auth-Required", "true")]).into_response());
    };

    req.extensions_mut().insert(CurrentIdentity(user_id));

    Ok(next.run(req).await)
}

/// Middleware that checks the access token but doesn't require it
pub async fn check_auth(
    state: AuthMiddlewareState,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user_id = platform::cookie::extract_cookie(req.headers(), &state.config.access_cookie_name)
        .and_then(|t| state.issuer.resolve_subject(&t, TokenType::Access));

    if let Some(user_id) = user_id {
        req.extensions_mut().insert(CurrentIdentity(user_id));
    }

    next.run(req).await
}
