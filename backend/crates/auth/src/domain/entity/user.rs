//! User Entity
//!
//! One account per email regardless of how it authenticates. The
//! provider decides which credential fields are populated: Local
//! accounts carry a password hash, federated accounts carry the
//! provider's subject identifier instead.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::value_object::{email::Email, provider::AuthProvider, user_role::UserRole};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    /// Internal UUID identifier
    pub id: UserId,
    /// Normalized email (encrypted at rest, looked up via blind index)
    pub email: Email,
    /// Display name
    pub name: String,
    /// How this account authenticates
    pub provider: AuthProvider,
    /// Subject identifier at the provider (federated accounts only)
    pub provider_user_id: Option<String>,
    /// Argon2 PHC string (Local accounts only)
    pub password_hash: Option<HashedPassword>,
    /// Role embedded in access token claims
    pub role: UserRole,
    /// Avatar URL, pass-through from the provider until imported
    pub avatar_url: Option<String>,
    /// Soft-delete flag; deactivated accounts keep their row
    pub is_active: bool,
    /// When the account was deactivated
    pub deactivated_at: Option<DateTime<Utc>>,
    /// Last successful login time
    pub last_login_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new email + password account
    pub fn new_local(email: Email, name: String, password_hash: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            name,
            provider: AuthProvider::Local,
            provider_user_id: None,
            password_hash: Some(password_hash),
            role: UserRole::default(),
            avatar_url: None,
            is_active: true,
            deactivated_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new federated account from a provider profile
    pub fn new_federated(
        email: Email,
        name: String,
        provider: AuthProvider,
        provider_user_id: String,
        avatar_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            name,
            provider,
            provider_user_id: Some(provider_user_id),
            password_hash: None,
            role: UserRole::default(),
            avatar_url,
            is_active: true,
            deactivated_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_local(&self) -> bool {
        self.provider == AuthProvider::Local
    }

    /// Record successful login
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Soft-delete the account
    pub fn deactivate(&mut self) {
        let now = Utc::now();
        self.is_active = false;
        self.deactivated_at = Some(now);
        self.updated_at = now;
    }

    /// Restore a soft-deleted account on successful authentication
    pub fn reactivate(&mut self) {
        self.is_active = true;
        self.deactivated_at = None;
        self.updated_at = Utc::now();
    }

    /// Replace the password hash (password reset)
    pub fn set_password_hash(&mut self, hash: HashedPassword) {
        self.password_hash = Some(hash);
        self.updated_at = Utc::now();
    }

    /// Update avatar once an import lands
    pub fn set_avatar_url(&mut self, url: Option<String>) {
        self.avatar_url = url;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_user() -> User {
        let hash = HashedPassword::from_phc_string(
            "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNoaGFzaA",
        )
        .unwrap();
        User::new_local(Email::new("a@example.com").unwrap(), "A".into(), hash)
    }

    #[test]
    fn test_local_user_has_password_no_subject() {
        let user = local_user();
        assert!(user.is_local());
        assert!(user.password_hash.is_some());
        assert!(user.provider_user_id.is_none());
        assert!(user.is_active);
    }

    #[test]
    fn test_federated_user_has_subject_no_password() {
        let user = User::new_federated(
            Email::new("b@example.com").unwrap(),
            "B".into(),
            AuthProvider::Google,
            "google-sub-1".into(),
            Some("https://lh3.example/pic".into()),
        );
        assert!(!user.is_local());
        assert!(user.password_hash.is_none());
        assert_eq!(user.provider_user_id.as_deref(), Some("google-sub-1"));
    }

    #[test]
    fn test_deactivate_reactivate() {
        let mut user = local_user();
        user.deactivate();
        assert!(!user.is_active);
        assert!(user.deactivated_at.is_some());
        user.reactivate();
        assert!(user.is_active);
        assert!(user.deactivated_at.is_none());
    }
}
