//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! hackshop-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `HACKSHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/server/migrations/`. The session table is
//! created by the session store's own migration.

use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

use hackshop_server::db::MIGRATOR;

use super::{CommandError, connect};

/// Apply the schema and session store migrations to `pool`.
pub async fn apply(pool: &PgPool) -> Result<(), CommandError> {
    tracing::info!("Running schema migrations...");
    MIGRATOR.run(pool).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

/// Run all migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    apply(&pool).await
}
