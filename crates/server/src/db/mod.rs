//! Database operations for the shop `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `admins` - Back office accounts
//! - `users`, `addresses` - Shoppers and their shipping addresses
//! - `goods`, `goods_images`, `goods_specs` - Catalogue
//! - `user_goods` - Favourites
//! - `cart_items` - One row per (user, goods)
//! - `orders`, `order_items` - Orders with price snapshots
//! - `vouchers` - Balance vouchers
//! - `mail_logs` - Simulated mailbox
//! - `tower_sessions.session` - Session storage (owned by `tower-sessions-sqlx-store`)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p hackshop-cli -- migrate
//! ```

pub mod addresses;
pub mod admins;
pub mod cart;
pub mod goods;
pub mod mail;
pub mod orders;
pub mod users;
pub mod vouchers;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use admins::AdminRepository;
pub use cart::CartRepository;
pub use goods::GoodsRepository;
pub use mail::MailRepository;
pub use orders::OrderRepository;
pub use users::UserRepository;
pub use vouchers::VoucherRepository;

use crate::config::PoolConfig;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `pool` - Connection limits and acquire timeout
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    pool: PoolConfig,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(pool.acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("mug"), "%mug%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "not found");
    }
}
