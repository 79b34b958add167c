//! PostgreSQL Repository Implementations
//!
//! One repository struct backs all three persistence traits. Emails are
//! stored encrypted (`email_enc`) and looked up through a keyed blind
//! index (`email_hash`); the plaintext address never reaches a column.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use kernel::id::{RefreshTokenId, UserId, VerificationId};
use platform::crypto::{BlindIndexer, FieldCipher};
use platform::password::HashedPassword;

use crate::domain::entity::{
    refresh_token::RefreshToken, user::User, verification_code::VerificationCode,
};
use crate::domain::repository::{
    RefreshTokenRepository, UserRepository, VerificationCodeRepository,
};
use crate::domain::value_object::{
    email::Email, provider::AuthProvider, purpose::VerificationPurpose, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
    indexer: BlindIndexer,
    cipher: FieldCipher,
}

impl PgAuthRepository {
    /// `master_secret` keys both the email blind index and the email
    /// column cipher.
    pub fn new(pool: PgPool, master_secret: &[u8]) -> Self {
        Self {
            pool,
            indexer: BlindIndexer::new(master_secret),
            cipher: FieldCipher::new(master_secret),
        }
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let email_hash = self.indexer.hash(user.email.as_str());
        let email_enc = self.cipher.encrypt_str(user.email.as_str())?;

        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                email_hash,
                email_enc,
                name,
                provider,
                provider_user_id,
                password_hash,
                role,
                avatar_url,
                is_active,
                deactivated_at,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&email_hash)
        .bind(&email_enc)
        .bind(&user.name)
        .bind(user.provider.as_str())
        .bind(&user.provider_user_id)
        .bind(user.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(user.role.as_str())
        .bind(&user.avatar_url)
        .bind(user.is_active)
        .bind(user.deactivated_at)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                user_id, email_enc, name, provider, provider_user_id,
                password_hash, role, avatar_url, is_active, deactivated_at,
                last_login_at, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user(&self.cipher)).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let email_hash = self.indexer.hash(email.as_str());

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                user_id, email_enc, name, provider, provider_user_id,
                password_hash, role, avatar_url, is_active, deactivated_at,
                last_login_at, created_at, updated_at
            FROM users
            WHERE email_hash = $1
            "#,
        )
        .bind(&email_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user(&self.cipher)).transpose()
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                provider_user_id = $3,
                password_hash = $4,
                role = $5,
                avatar_url = $6,
                is_active = $7,
                deactivated_at = $8,
                last_login_at = $9,
                updated_at = $10
            WHERE user_id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.provider_user_id)
        .bind(user.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(user.role.as_str())
        .bind(&user.avatar_url)
        .bind(user.is_active)
        .bind(user.deactivated_at)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for PgAuthRepository {
    async fn save(&self, token: &RefreshToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, user_id, token_hash, expires_at, revoked_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(token.user_id.as_uuid())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &[u8]) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, token_hash, expires_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn revoke_if_active(&self, token_hash: &[u8]) -> AuthResult<bool> {
        // The WHERE clause makes this a compare-and-set: under
        // concurrent rotation exactly one UPDATE reports a row.
        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            tracing::info!(tokens_deleted = deleted, "Swept expired refresh tokens");
        }

        Ok(deleted)
    }
}

// ============================================================================
// Verification Code Repository Implementation
// ============================================================================

impl VerificationCodeRepository for PgAuthRepository {
    async fn create(&self, code: &VerificationCode) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO email_verification_codes (
                id, email_hash, purpose, code, attempts,
                expires_at, verified, verified_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(code.id.as_uuid())
        .bind(&code.email_hash)
        .bind(code.purpose.as_str())
        .bind(&code.code)
        .bind(code.attempts)
        .bind(code.expires_at)
        .bind(code.verified)
        .bind(code.verified_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for(
        &self,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>> {
        let row = sqlx::query_as::<_, VerificationCodeRow>(
            r#"
            SELECT id, email_hash, purpose, code, attempts,
                   expires_at, verified, verified_at, created_at
            FROM email_verification_codes
            WHERE email_hash = $1 AND purpose = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerificationCodeRow::into_code).transpose()
    }

    async fn latest_unverified(
        &self,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>> {
        let row = sqlx::query_as::<_, VerificationCodeRow>(
            r#"
            SELECT id, email_hash, purpose, code, attempts,
                   expires_at, verified, verified_at, created_at
            FROM email_verification_codes
            WHERE email_hash = $1 AND purpose = $2 AND verified = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerificationCodeRow::into_code).transpose()
    }

    async fn find_verified(
        &self,
        id: &VerificationId,
        email_hash: &[u8],
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationCode>> {
        let row = sqlx::query_as::<_, VerificationCodeRow>(
            r#"
            SELECT id, email_hash, purpose, code, attempts,
                   expires_at, verified, verified_at, created_at
            FROM email_verification_codes
            WHERE id = $1 AND email_hash = $2 AND purpose = $3 AND verified = TRUE
            "#,
        )
        .bind(id.as_uuid())
        .bind(email_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerificationCodeRow::into_code).transpose()
    }

    async fn update(&self, code: &VerificationCode) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE email_verification_codes SET
                attempts = $2,
                expires_at = $3,
                verified = $4,
                verified_at = $5
            WHERE id = $1
            "#,
        )
        .bind(code.id.as_uuid())
        .bind(code.attempts)
        .bind(code.expires_at)
        .bind(code.verified)
        .bind(code.verified_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM email_verification_codes WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            tracing::info!(codes_deleted = deleted, "Swept old verification codes");
        }

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email_enc: Vec<u8>,
    name: String,
    provider: String,
    provider_user_id: Option<String>,
    password_hash: Option<String>,
    role: String,
    avatar_url: Option<String>,
    is_active: bool,
    deactivated_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, cipher: &FieldCipher) -> AuthResult<User> {
        let email = Email::from_db(cipher.decrypt_str(&self.email_enc)?);

        let provider = AuthProvider::parse(&self.provider)
            .ok_or_else(|| AuthError::Internal(format!("Invalid provider: {}", self.provider)))?;

        let password_hash = self
            .password_hash
            .map(HashedPassword::from_phc_string)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(User {
            id: UserId::from_uuid(self.user_id),
            email,
            name: self.name,
            provider,
            provider_user_id: self.provider_user_id,
            password_hash,
            role: UserRole::from_code(&self.role),
            avatar_url: self.avatar_url,
            is_active: self.is_active,
            deactivated_at: self.deactivated_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: Vec<u8>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl RefreshTokenRow {
    fn into_token(self) -> RefreshToken {
        RefreshToken {
            id: RefreshTokenId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VerificationCodeRow {
    id: Uuid,
    email_hash: Vec<u8>,
    purpose: String,
    code: String,
    attempts: i32,
    expires_at: DateTime<Utc>,
    verified: bool,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl VerificationCodeRow {
    fn into_code(self) -> AuthResult<VerificationCode> {
        let purpose = VerificationPurpose::parse(&self.purpose)
            .ok_or_else(|| AuthError::Internal(format!("Invalid purpose: {}", self.purpose)))?;

        Ok(VerificationCode {
            id: VerificationId::from_uuid(self.id),
            email_hash: self.email_hash,
            purpose,
            code: self.code,
            attempts: self.attempts,
            expires_at: self.expires_at,
            verified: self.verified,
            verified_at: self.verified_at,
            created_at: self.created_at,
        })
    }
}
