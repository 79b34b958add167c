//! Application Configuration
//!
//! Configuration for the Auth application layer. Durations use chrono
//! so they compose directly with token expiry arithmetic.

use chrono::Duration;
use platform::cookie::CookieConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token cookie name
    pub access_cookie_name: String,
    /// Refresh token cookie name
    pub refresh_cookie_name: String,
    /// Access cookie path; the whole API surface
    pub access_cookie_path: String,
    /// Refresh cookie path; the auth endpoints only, so the refresh
    /// token never travels on ordinary API requests
    pub refresh_cookie_path: String,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Access token TTL
    pub access_ttl: Duration,
    /// Refresh token TTL
    pub refresh_ttl: Duration,
    /// Window after revocation where re-presentation is a benign race
    pub refresh_grace: Duration,
    /// Verification code TTL
    pub code_ttl: Duration,
    /// Minimum gap between code sends per (email, purpose) stream
    pub resend_cooldown: Duration,
    /// How long a verified handle stays redeemable
    pub redeem_window: Duration,
    /// Failed-match cap before a code is force-expired
    pub max_code_attempts: i32,
    /// How long spent codes are kept before the sweeper deletes them
    pub code_retention: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Frontend base URL for post-OAuth redirects
    pub frontend_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_cookie_name: "__at".to_string(),
            refresh_cookie_name: "__rt".to_string(),
            access_cookie_path: "/api".to_string(),
            refresh_cookie_path: "/api/auth".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::days(14),
            refresh_grace: Duration::seconds(10),
            code_ttl: Duration::hours(1),
            resend_cooldown: Duration::seconds(60),
            redeem_window: Duration::minutes(10),
            max_code_attempts: 5,
            code_retention: Duration::hours(24),
            password_pepper: None,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Cookie settings for the access token
    pub fn access_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.access_cookie_name.clone(),
            secure: self.cookie_secure,
            same_site: self.cookie_same_site,
            path: self.access_cookie_path.clone(),
            max_age_secs: self.access_ttl.num_seconds(),
        }
    }

    /// Cookie settings for the refresh token
    pub fn refresh_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.refresh_cookie_name.clone(),
            secure: self.cookie_secure,
            same_site: self.cookie_same_site,
            path: self.refresh_cookie_path.clone(),
            max_age_secs: self.refresh_ttl.num_seconds(),
        }
    }
}
