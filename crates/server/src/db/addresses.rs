//! Shipping address repository.
//!
//! `get`, `update` and `delete` address rows by id alone; callers decide
//! whether to check ownership.

use sqlx::PgPool;

use hackshop_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressForm};

const ADDRESS_COLUMNS: &str =
    "id, receiver, phone, addressname, user_id, created_at, updated_at";

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an address by id, regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create an address for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        form: &AddressForm,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO addresses (receiver, phone, addressname, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(&form.receiver)
        .bind(&form.phone)
        .bind(&form.addressname)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Overwrite an address by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, id: AddressId, form: &AddressForm) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE addresses
            SET receiver = $2, phone = $3, addressname = $4, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&form.receiver)
        .bind(&form.phone)
        .bind(&form.addressname)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an address by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
