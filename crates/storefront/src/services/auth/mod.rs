//! Authentication service.
//!
//! Email and password accounts. Passwords are hashed with Argon2id; the
//! checkout flow only ever sees the resulting identity through the session.
//!
//! # Password reset
//!
//! A reset request issues a random single-use token valid for
//! [`RESET_TOKEN_TTL_MINUTES`]. Only its SHA-256 is stored. There is no
//! mailer, so the reset link is written to the log.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::instrument;
use uuid::Uuid;

use cartwright_core::Email;

use crate::db::{RepositoryError, UserStore};
use crate::models::user::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a reset link stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Issue a password reset token for the account behind `email`.
    ///
    /// Returns the raw token, or `None` when no account uses that email.
    /// Callers must not tell the two cases apart in their response.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = Email::parse(email)?;

        let Some((user, _)) = self.users.get_password_hash(&email).await? else {
            tracing::info!("password reset requested for unknown email");
            return Ok(None);
        };

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .create_reset_token(&user.id, &hash_reset_token(&token), expires_at)
            .await?;

        tracing::info!(
            user_id = %user.id,
            %expires_at,
            reset_link = %format!("/auth/reset-password?token={token}"),
            "password reset link issued"
        );
        Ok(Some(token))
    }

    /// Set a new password using a reset token. The token is spent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::PasswordMismatch` for a
    /// bad new password, checked before the token is touched.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, used
    /// or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        validate_password(password)?;
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .redeem_reset_token(&hash_reset_token(token.trim()), &password_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user_id = %user.id, "password reset");
        Ok(user)
    }
}

/// Stored form of a reset token.
fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("longenough").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth
            .register("Jane@Example.com", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "jane@example.com");

        let logged_in = auth.login("jane@example.com", "hunter2hunter2").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("jane@example.com", "nope-nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "hunter2hunter2").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.register("not-an-email", "hunter2hunter2", "hunter2hunter2").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("jane@example.com", "hunter2hunter2", "hunter3hunter3").await,
            Err(AuthError::PasswordMismatch)
        ));

        auth.register("jane@example.com", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();
        assert!(matches!(
            auth.register("JANE@example.com", "hunter2hunter2", "hunter2hunter2").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_replaces_password_once() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("jane@example.com", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();

        let token = auth
            .request_password_reset("Jane@Example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.pending_reset_count().await, 1);

        auth.reset_password(&token, "new-password-1", "new-password-1")
            .await
            .unwrap();
        assert!(auth.login("jane@example.com", "new-password-1").await.is_ok());
        assert!(matches!(
            auth.login("jane@example.com", "hunter2hunter2").await,
            Err(AuthError::InvalidCredentials)
        ));

        assert!(matches!(
            auth.reset_password(&token, "new-password-2", "new-password-2").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_rejections() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth
            .register("jane@example.com", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();

        assert!(auth.request_password_reset("nobody@example.com").await.unwrap().is_none());
        assert_eq!(store.pending_reset_count().await, 0);
        assert!(matches!(
            auth.request_password_reset("not-an-email").await,
            Err(AuthError::InvalidEmail(_))
        ));

        let token = auth
            .request_password_reset("jane@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            auth.reset_password(&token, "short", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.reset_password(&token, "new-password-1", "new-password-2").await,
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            auth.reset_password("not-a-token", "new-password-1", "new-password-1").await,
            Err(AuthError::InvalidResetToken)
        ));
        // The rejected attempts above did not spend the token.
        assert_eq!(store.pending_reset_count().await, 1);

        let expired = "expired-token";
        store
            .create_reset_token(&user.id, &hash_reset_token(expired), Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            auth.reset_password(expired, "new-password-1", "new-password-1").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[test]
    fn test_reset_token_hash_is_hex_sha256() {
        let hash = hash_reset_token("abc");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, "abc");
        assert_eq!(hash, hash_reset_token("abc"));
    }
}
