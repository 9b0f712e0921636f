//! Back office account repository.

use sqlx::{PgConnection, PgPool};

use hackshop_core::AdminId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::Admin;

const ADMIN_COLUMNS: &str = "id, username, password, created_at, last_login";

/// Repository for admin database operations.
pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    /// Create a new admin repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    /// The first admin ever created (the one provisioned by setup or seed).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first(&self) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins ORDER BY id LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    /// List all admins, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Admin>, RepositoryError> {
        let admins = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(admins)
    }

    /// Create an admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, username: &str, password: &str) -> Result<Admin, RepositoryError> {
        sqlx::query_as::<_, Admin>(&format!(
            "INSERT INTO admins (username, password) VALUES ($1, $2) RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(username)
        .bind(password)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "admin"))
    }

    /// Create the admin, or reset its password if it already exists.
    ///
    /// Returns the admin and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, username: &str, password: &str) -> Result<(Admin, bool), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let (id, inserted) = upsert_admin(&mut conn, username, password).await?;

        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok((admin, inserted))
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: AdminId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admins SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Count all admins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Insert an admin or reset its password, on an existing connection or
/// transaction. Returns the id and whether the row was inserted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_admin(
    conn: &mut PgConnection,
    username: &str,
    password: &str,
) -> Result<(AdminId, bool), RepositoryError> {
    let row: (AdminId, bool) = sqlx::query_as(
        r"
        INSERT INTO admins (username, password)
        VALUES ($1, $2)
        ON CONFLICT (username) DO UPDATE SET password = EXCLUDED.password
        RETURNING id, (xmax = 0) AS inserted
        ",
    )
    .bind(username)
    .bind(password)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}
