//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database, mail, and OAuth provider implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Local signup/login with email + password
//! - OAuth login (Google, Kakao) with duplicate-email detection
//! - Short-lived access JWT + rotated refresh token, both in HttpOnly cookies
//! - Email verification codes for signup and password reset
//!
//! ## Security Model
//! - Passwords hashed with Argon2id; optional server-side pepper
//! - Email stored encrypted, looked up through an HMAC blind index
//! - Refresh tokens stored as SHA-256 hashes; rotation is atomic, reuse
//!   outside a short grace window revokes the whole family

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;
pub mod token;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgAuthRepository;
pub use presentation::router::auth_router;
pub use token::{TokenIssuer, TokenPair, TokenType};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::postgres::PgAuthRepository as AuthStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
