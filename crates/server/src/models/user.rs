//! Shopper accounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use hackshop_core::{Price, UserId};

/// A registered shopper.
///
/// Passwords are stored and compared in plaintext; the lab's credential
/// exercises depend on it.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub balance: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Wallet balance, treating a missing balance as zero.
    #[must_use]
    pub fn balance(&self) -> Price {
        Price::from(self.balance)
    }
}
