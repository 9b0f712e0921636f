//! Authentication service.
//!
//! Shopper login with a per-email failure counter and lockout, email
//! verification codes, password reset links, and the back office login.
//!
//! Passwords are stored and compared in plaintext.

mod error;

pub use error::AuthError;

use std::time::Duration;

use sqlx::PgPool;

use hackshop_core::UserId;

use crate::cache::{self, EphemeralStore};
use crate::db::{AdminRepository, MailRepository, RepositoryError, UserRepository};
use crate::models::{Admin, User};
use crate::services::crypto;
use crate::services::ids::generate_mailcode;

/// Failures before an email is locked.
pub const MAX_LOGIN_FAILURES: i64 = 5;

/// Lifetime of the failure counter and of the lock.
pub const LOCK_TTL: Duration = Duration::from_secs(300);

/// Lifetime of an email verification code.
pub const MAILCODE_TTL: Duration = Duration::from_secs(600);

/// Lifetime of a password reset token.
pub const RESET_TOKEN_TTL: Duration = Duration::from_secs(3600);

const CODE_SENDER: &str = "system@hackshop.local";
const SECURITY_SENDER: &str = "security@hackshop.local";

/// Fails with `AuthError::Locked` while the email's lock flag is set.
///
/// # Errors
///
/// Returns `AuthError::Locked` with the remaining lock time.
pub async fn ensure_not_locked(store: &EphemeralStore, email: &str) -> Result<(), AuthError> {
    let key = cache::login_lock_key(email);
    if store.get(&key).await.as_deref() == Some("1") {
        let lock_ttl = store.ttl(&key).await.unwrap_or(0);
        return Err(AuthError::Locked { lock_ttl });
    }
    Ok(())
}

/// Count a failed login and lock the email once the limit is reached.
///
/// Returns the failure count including this one. Reaching the limit sets the
/// lock and clears the counter.
pub async fn record_login_failure(store: &EphemeralStore, email: &str) -> i64 {
    let fail_key = cache::login_fail_key(email);
    let count = store.incr(&fail_key, LOCK_TTL).await;
    if count >= MAX_LOGIN_FAILURES {
        store
            .set_ex(&cache::login_lock_key(email), "1", LOCK_TTL)
            .await;
        store.delete(&fail_key).await;
        tracing::warn!(email, "login locked after repeated failures");
    }
    count
}

/// Check and consume an email verification code.
///
/// Empty values never match. A matching code is deleted.
pub async fn verify_email_code(store: &EphemeralStore, email: &str, code: &str) -> bool {
    if email.is_empty() || code.is_empty() {
        return false;
    }
    let key = cache::mailcode_key(email);
    match store.get(&key).await {
        Some(stored) if stored == code => {
            store.delete(&key).await;
            true
        }
        _ => false,
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    store: &'a EphemeralStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, store: &'a EphemeralStore) -> Self {
        Self { pool, store }
    }

    /// Log a shopper in by email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Locked` while the email is locked.
    /// Returns `AuthError::InvalidCredentials` on an unknown email or wrong password.
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn authenticate_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        ensure_not_locked(self.store, email).await?;

        let user = UserRepository::new(self.pool).get_by_email(email).await?;
        match user {
            Some(user) if user.password == password => {
                self.store.delete(&cache::login_fail_key(email)).await;
                Ok(user)
            }
            _ => {
                let fail_count = record_login_failure(self.store, email).await;
                Err(AuthError::InvalidCredentials { fail_count })
            }
        }
    }

    /// Generate a code, cache it and drop it in the inbox.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the mail cannot be recorded.
    pub async fn send_mail_code(&self, email: &str) -> Result<(), AuthError> {
        let code = generate_mailcode();
        self.store
            .set_ex(&cache::mailcode_key(email), code.as_str(), MAILCODE_TTL)
            .await;

        MailRepository::new(self.pool)
            .create(
                CODE_SENDER,
                email,
                "Verification code",
                &format!("{email}, your verification code is {code}."),
            )
            .await?;
        Ok(())
    }

    /// Register a shopper after checking the email code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmailCode` if the code does not verify.
    /// Returns `AuthError::UserAlreadyExists` on a duplicate username or email.
    /// Returns `AuthError::Repository` for other database errors.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        email_code: &str,
    ) -> Result<User, AuthError> {
        if !verify_email_code(self.store, email, email_code).await {
            return Err(AuthError::InvalidEmailCode);
        }

        UserRepository::new(self.pool)
            .create(username, email, password, None)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Mail a password reset link for a known email.
    ///
    /// The link is built from `host` exactly as the client sent it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email.
    /// Returns `AuthError::Repository` if a query fails.
    pub async fn send_reset_url(&self, email: &str, host: &str) -> Result<(), AuthError> {
        let user = UserRepository::new(self.pool)
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = uuid::Uuid::new_v4().to_string();
        self.store
            .set_ex(
                &cache::reset_token_key(&token),
                user.id.to_string(),
                RESET_TOKEN_TTL,
            )
            .await;

        let link = reset_link(host, &token);
        MailRepository::new(self.pool)
            .create(
                SECURITY_SENDER,
                email,
                "Reset your password - HackShop",
                &format!(
                    "Follow this link to reset your password: {link}\n\
                     If you did not ask for a reset, ignore this mail."
                ),
            )
            .await?;
        Ok(())
    }

    /// The user a live reset token belongs to.
    pub async fn reset_token_user(&self, token: &str) -> Option<UserId> {
        self.store
            .get(&cache::reset_token_key(token))
            .await
            .and_then(|raw| raw.parse::<i32>().ok())
            .map(UserId::new)
    }

    /// Set a new password through a reset token, then burn the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown.
    /// Returns `AuthError::UserNotFound` if the user has gone.
    /// Returns `AuthError::Repository` if the update fails.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), AuthError> {
        let user_id = self
            .reset_token_user(token)
            .await
            .ok_or(AuthError::InvalidResetToken)?;

        UserRepository::new(self.pool)
            .update_password(user_id, password)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        self.store.delete(&cache::reset_token_key(token)).await;
        Ok(())
    }

    /// Back office login with the browser-encrypted password.
    ///
    /// Returns `None` when decryption fails, the account is unknown or the
    /// password differs. Stamps `last_login` on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if a query fails.
    pub async fn admin_auth(
        &self,
        username: &str,
        encrypted_password: &str,
    ) -> Result<Option<Admin>, AuthError> {
        let password = match crypto::decrypt_admin_password(encrypted_password) {
            Ok(password) => password,
            Err(e) => {
                tracing::warn!(error = %e, "admin password decryption failed");
                return Ok(None);
            }
        };

        let admins = AdminRepository::new(self.pool);
        let Some(admin) = admins.get_by_username(username).await? else {
            return Ok(None);
        };
        if admin.password != password {
            return Ok(None);
        }

        admins.touch_last_login(admin.id).await?;
        Ok(Some(admin))
    }
}

/// Reset link for `token` on `host`.
#[must_use]
pub fn reset_link(host: &str, token: &str) -> String {
    format!("http://{host}/auth/user/reset-password/{token}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lockout_after_five_failures() {
        let store = EphemeralStore::new();
        let email = "victim@test.com";

        for expected in 1..MAX_LOGIN_FAILURES {
            assert!(ensure_not_locked(&store, email).await.is_ok());
            assert_eq!(record_login_failure(&store, email).await, expected);
        }

        assert_eq!(record_login_failure(&store, email).await, MAX_LOGIN_FAILURES);
        match ensure_not_locked(&store, email).await {
            Err(AuthError::Locked { lock_ttl }) => assert!(lock_ttl > 0 && lock_ttl <= 300),
            other => panic!("expected lock, got {other:?}"),
        }
        assert_eq!(store.get(&cache::login_fail_key(email)).await, None);
    }

    #[tokio::test]
    async fn test_lock_is_per_email() {
        let store = EphemeralStore::new();
        for _ in 0..MAX_LOGIN_FAILURES {
            record_login_failure(&store, "a@test.com").await;
        }
        assert!(ensure_not_locked(&store, "a@test.com").await.is_err());
        assert!(ensure_not_locked(&store, "b@test.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_email_code_is_single_use() {
        let store = EphemeralStore::new();
        store
            .set_ex(&cache::mailcode_key("a@test.com"), "123456", MAILCODE_TTL)
            .await;

        assert!(!verify_email_code(&store, "a@test.com", "654321").await);
        assert!(verify_email_code(&store, "a@test.com", "123456").await);
        assert!(!verify_email_code(&store, "a@test.com", "123456").await);
    }

    #[tokio::test]
    async fn test_email_code_rejects_empty() {
        let store = EphemeralStore::new();
        store
            .set_ex(&cache::mailcode_key(""), "", MAILCODE_TTL)
            .await;
        assert!(!verify_email_code(&store, "", "").await);
    }

    #[test]
    fn test_reset_link_uses_given_host() {
        assert_eq!(
            reset_link("evil.example:8080", "tok"),
            "http://evil.example:8080/auth/user/reset-password/tok"
        );
    }
}
