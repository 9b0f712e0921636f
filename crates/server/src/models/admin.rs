//! Back office accounts.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use hackshop_core::AdminId;

/// A back office account (plaintext password).
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: AdminId,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    /// `None` until the first successful login.
    pub last_login: Option<DateTime<Utc>>,
}
