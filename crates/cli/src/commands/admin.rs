//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! hackshop-cli admin create -u admin2 -p secret
//! ```
//!
//! # Environment Variables
//!
//! - `HACKSHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use hackshop_server::db::AdminRepository;

use super::{CommandError, connect};

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(username: &str, password: &str) -> Result<i32, CommandError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(CommandError::Invalid("username and password are required"));
    }

    let pool = connect().await?;

    tracing::info!("Creating admin user: {}", username);
    let admin = AdminRepository::new(&pool).create(username, password).await?;

    tracing::info!("Admin user created successfully!");
    tracing::info!("  ID: {}", admin.id);
    tracing::info!("  Username: {}", admin.username);
    tracing::info!("Log in at /admin/login");

    Ok(admin.id.as_i32())
}
