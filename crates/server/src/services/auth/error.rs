//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Too many failed logins for this email; retry after `lock_ttl` seconds.
    #[error("account locked for {lock_ttl}s")]
    Locked { lock_ttl: u64 },

    /// Wrong password or unknown email. `fail_count` is the running total.
    #[error("invalid credentials (failure {fail_count})")]
    InvalidCredentials { fail_count: i64 },

    /// The email verification code is missing or wrong.
    #[error("invalid email code")]
    InvalidEmailCode,

    /// Reset token unknown or expired.
    #[error("invalid reset token")]
    InvalidResetToken,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Username or email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
