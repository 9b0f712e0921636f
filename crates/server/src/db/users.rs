//! User repository for database operations.

use rust_decimal::Decimal;
use sqlx::PgPool;

use hackshop_core::UserId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str =
    "id, username, email, password, balance, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by email, matched exactly.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Create a new user with a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        balance: Option<Decimal>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO users (username, email, password, balance)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(username)
        .bind(email)
        .bind(password)
        .bind(balance)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username or email"))
    }

    /// Replace a user's password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_password(&self, id: UserId, password: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Update username and/or password; `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new username is taken.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: UserId,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET username = COALESCE($2, username),
                password = COALESCE($3, password),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(username)
        .bind(password)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
