//! HTTP Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use std::sync::Arc;
use uuid::Uuid;

use kernel::id::VerificationId;
use platform::cookie::{delete_cookie_header, extract_cookie, set_cookie_header};
use platform::crypto::BlindIndexer;

use crate::application::config::AuthConfig;
use crate::application::{
    DeactivateUseCase, EmailVerificationService, ForgotPasswordUseCase, LoginInput, LoginUseCase,
    LogoutUseCase, OAuthClient, OAuthLoginUseCase, OsRngCodes, PassThroughAvatars, RefreshLedger,
    RefreshUseCase, ResetPasswordInput, ResetPasswordUseCase, SignUpInput, SignUpUseCase,
};
use crate::domain::repository::{
    RefreshTokenRepository, UserRepository, VerificationCodeRepository,
};
use crate::domain::value_object::email::Email;
use crate::domain::value_object::provider::AuthProvider;
use crate::domain::value_object::purpose::VerificationPurpose;
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::HttpMailer;
use crate::infra::oauth::{GoogleOAuthClient, KakaoOAuthClient};
use crate::presentation::dto::{
    ForgotPasswordRequest, LoginRequest, MeResponse, OAuthCallbackQuery, ResetPasswordRequest,
    SendVerificationRequest, SignUpRequest, VerifyEmailRequest, VerifyEmailResponse,
};
use crate::token::{TokenIssuer, TokenPair, TokenType};

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<R>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub issuer: Arc<TokenIssuer>,
    pub ledger: Arc<RefreshLedger<R>>,
    pub verification: Arc<EmailVerificationService<R, HttpMailer, OsRngCodes>>,
    pub google: Arc<GoogleOAuthClient>,
    pub kakao: Arc<KakaoOAuthClient>,
}

impl<R> AuthAppState<R>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<R>,
        config: Arc<AuthConfig>,
        issuer: Arc<TokenIssuer>,
        mailer: Arc<HttpMailer>,
        google: Arc<GoogleOAuthClient>,
        kakao: Arc<KakaoOAuthClient>,
        indexer: BlindIndexer,
    ) -> Self {
        let ledger = Arc::new(RefreshLedger::new(
            issuer.clone(),
            repo.clone(),
            config.refresh_grace,
        ));
        let verification = Arc::new(EmailVerificationService::new(
            repo.clone(),
            mailer,
            OsRngCodes,
            indexer,
            config.clone(),
        ));

        Self {
            repo,
            config,
            issuer,
            ledger,
            verification,
            google,
            kakao,
        }
    }
}

// ============================================================================
// Sign Up / Login
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.ledger.clone(), state.config.clone());

    let output = use_case
        .execute(SignUpInput {
            email: req.email,
            password: req.password,
            name: req.name,
        })
        .await?;

    Ok((
        StatusCode::OK,
        auth_cookie_headers(&state.config, &output.tokens),
    ))
}

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let use_case = LoginUseCase::new(state.repo.clone(), state.ledger.clone(), state.config.clone());

    let output = use_case
        .execute(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::OK,
        auth_cookie_headers(&state.config, &output.tokens),
    ))
}

// ============================================================================
// Token Management
// ============================================================================

/// POST /api/auth/refresh
pub async fn refresh<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> Response
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let Some(raw) = extract_cookie(&headers, &state.config.refresh_cookie_name) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let use_case =
        RefreshUseCase::new(state.repo.clone(), state.ledger.clone(), state.issuer.clone());

    match use_case.execute(&raw).await {
        Ok(tokens) => (
            StatusCode::OK,
            auth_cookie_headers(&state.config, &tokens),
        )
            .into_response(),
        // Rotation failure means the presented cookie is dead either way;
        // clear both so the client stops replaying it
        Err(err) => (clear_cookie_headers(&state.config), err).into_response(),
    }
}

/// POST /api/auth/logout
pub async fn logout<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> impl IntoResponse
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let raw = extract_cookie(&headers, &state.config.refresh_cookie_name);

    let use_case = LogoutUseCase::new(state.ledger.clone());
    // Ignore errors - just clear the cookies
    let _ = use_case.execute(raw.as_deref()).await;

    (StatusCode::NO_CONTENT, clear_cookie_headers(&state.config))
}

/// POST /api/auth/logout-all
pub async fn logout_all<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> Response
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let Some(user_id) = current_user_id(&state, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let use_case = LogoutUseCase::new(state.ledger.clone());

    match use_case.execute_all(&user_id).await {
        Ok(()) => {
            (StatusCode::NO_CONTENT, clear_cookie_headers(&state.config)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

// ============================================================================
// OAuth
// ============================================================================

/// GET /api/auth/authorize/{provider}
pub async fn oauth_authorize<R>(
    State(state): State<AuthAppState<R>>,
    Path(provider): Path<String>,
) -> Response
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    // The state echo is not validated on callback; it only keeps the
    // authorize URL unique per attempt
    let nonce = Uuid::new_v4().to_string();

    let url = match provider.as_str() {
        "google" => state.google.authorize_url(&nonce),
        "kakao" => state.kakao.authorize_url(&nonce),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    Redirect::to(&url).into_response()
}

/// GET /api/auth/callback/{provider}
///
/// Browser-facing: every outcome is a redirect back to the frontend,
/// with error hints in the query string on failure.
pub async fn oauth_callback<R>(
    State(state): State<AuthAppState<R>>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let Some(provider) = parse_provider_path(&provider) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let use_case = OAuthLoginUseCase::new(
        state.repo.clone(),
        state.ledger.clone(),
        Arc::new(PassThroughAvatars),
    );

    let result = match provider {
        AuthProvider::Google => use_case.execute(state.google.as_ref(), &query.code).await,
        AuthProvider::Kakao => use_case.execute(state.kakao.as_ref(), &query.code).await,
        AuthProvider::Local => return StatusCode::NOT_FOUND.into_response(),
    };

    let frontend = &state.config.frontend_url;
    match result {
        Ok(output) => (
            auth_cookie_headers(&state.config, &output.tokens),
            Redirect::to(frontend),
        )
            .into_response(),
        Err(AuthError::DuplicateEmail { existing_provider }) => Redirect::to(&format!(
            "{frontend}?error=DUPLICATE_EMAIL&existing_provider={existing_provider}"
        ))
        .into_response(),
        Err(err) => {
            err.log();
            Redirect::to(&format!("{frontend}?error=OAUTH_FAILED&provider={provider}"))
                .into_response()
        }
    }
}

// ============================================================================
// Email Verification
// ============================================================================

/// POST /api/auth/send-verification
///
/// Signup flow only. An address that already has an account is refused
/// up front so the caller learns before sitting through a code exchange.
pub async fn send_verification<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<SendVerificationRequest>,
) -> AuthResult<StatusCode>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let email = Email::new(req.email).map_err(|e| AuthError::Validation(e.to_string()))?;

    if let Some(existing) = state.repo.find_by_email(&email).await? {
        return Err(if existing.is_active {
            AuthError::EmailAlreadyExists
        } else {
            AuthError::DeactivatedEmailExists
        });
    }

    state
        .verification
        .send(&email, VerificationPurpose::Signup)
        .await?;

    Ok(StatusCode::OK)
}

/// POST /api/auth/verify-email
pub async fn verify_email<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<VerifyEmailRequest>,
) -> AuthResult<Json<VerifyEmailResponse>>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    // Format is checked before purpose so a garbled submission reports
    // the code problem, not the purpose problem
    if req.code.len() != 5 || !req.code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::InvalidCodeFormat);
    }

    let purpose = VerificationPurpose::parse(&req.purpose).ok_or(AuthError::InvalidPurpose)?;
    let email = Email::new(req.email).map_err(|e| AuthError::Validation(e.to_string()))?;

    let verification_id = state.verification.verify(&email, purpose, &req.code).await?;

    Ok(Json(VerifyEmailResponse {
        verification_id: verification_id.into_uuid(),
    }))
}

// ============================================================================
// Password Reset
// ============================================================================

/// POST /api/auth/forgot-password
pub async fn forgot_password<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AuthResult<StatusCode>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let use_case = ForgotPasswordUseCase::new(state.repo.clone(), state.verification.clone());
    use_case.execute(&req.email).await?;

    Ok(StatusCode::OK)
}

/// POST /api/auth/reset-password
pub async fn reset_password<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<StatusCode>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let use_case = ResetPasswordUseCase::new(
        state.repo.clone(),
        state.ledger.clone(),
        state.verification.clone(),
        state.config.clone(),
    );

    use_case
        .execute(ResetPasswordInput {
            email: req.email,
            new_password: req.new_password,
            verification_id: VerificationId::from_uuid(req.verification_id),
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Current User
// ============================================================================

/// GET /api/auth/me
pub async fn me<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> Response
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let Some(user_id) = current_user_id(&state, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match state.repo.find_by_id(&user_id).await {
        Ok(Some(user)) if user.is_active => Json(MeResponse::from_user(&user)).into_response(),
        Ok(Some(_)) => StatusCode::FORBIDDEN.into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

/// POST /api/auth/deactivate
pub async fn deactivate<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> Response
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let Some(user_id) = current_user_id(&state, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let use_case = DeactivateUseCase::new(state.repo.clone(), state.ledger.clone());

    match use_case.execute(&user_id).await {
        Ok(()) => {
            (StatusCode::NO_CONTENT, clear_cookie_headers(&state.config)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn current_user_id<R>(state: &AuthAppState<R>, headers: &HeaderMap) -> Option<kernel::id::UserId>
where
    R: UserRepository + RefreshTokenRepository + VerificationCodeRepository + Clone + Send + Sync + 'static,
{
    let token = extract_cookie(headers, &state.config.access_cookie_name)?;
    state.issuer.resolve_subject(&token, TokenType::Access)
}

fn parse_provider_path(raw: &str) -> Option<AuthProvider> {
    match raw {
        "google" => Some(AuthProvider::Google),
        "kakao" => Some(AuthProvider::Kakao),
        _ => None,
    }
}

/// Both Set-Cookie headers for a freshly issued pair
fn auth_cookie_headers(config: &AuthConfig, tokens: &TokenPair) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        set_cookie_header(&config.access_cookie(), &tokens.access_token),
    );
    headers.append(
        header::SET_COOKIE,
        set_cookie_header(&config.refresh_cookie(), &tokens.refresh_token),
    );
    headers
}

/// Expire both cookies on their own paths
fn clear_cookie_headers(config: &AuthConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        delete_cookie_header(&config.access_cookie()),
    );
    headers.append(
        header::SET_COOKIE,
        delete_cookie_header(&config.refresh_cookie()),
    );
    headers
}
