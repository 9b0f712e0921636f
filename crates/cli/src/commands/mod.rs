//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod reset;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use hackshop_server::config::{ConfigError, HackshopConfig};
use hackshop_server::db::{self, RepositoryError};

/// Errors shared by the database commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid input: {0}")]
    Invalid(&'static str),

    #[error("Aborted")]
    Aborted,
}

/// Load the server configuration and open a pool.
pub async fn connect() -> Result<PgPool, CommandError> {
    let config = HackshopConfig::from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&config.database_url, config.pool).await?)
}
