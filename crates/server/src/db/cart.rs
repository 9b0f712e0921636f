//! Cart repository.

use sqlx::PgPool;

use hackshop_core::{CartItemId, GoodsId, UserId};

use super::RepositoryError;
use crate::models::{CartItem, CartLine};

/// Repository for cart rows.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Cart rows joined with their goods, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLine>(
            r"
            SELECT c.id, c.goods_id, c.quantity, g.goodsname, g.mainimg, g.price, g.stock
            FROM cart_items c
            JOIN goods g ON g.id = c.goods_id
            WHERE c.user_id = $1
            ORDER BY c.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// The selected rows of a user's cart, joined with their goods.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn selected_lines(
        &self,
        user_id: UserId,
        item_ids: &[CartItemId],
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let ids: Vec<i32> = item_ids.iter().map(CartItemId::as_i32).collect();
        let rows = sqlx::query_as::<_, CartLine>(
            r"
            SELECT c.id, c.goods_id, c.quantity, g.goodsname, g.mainimg, g.price, g.stock
            FROM cart_items c
            JOIN goods g ON g.id = c.goods_id
            WHERE c.user_id = $1 AND c.id = ANY($2::int[])
            ORDER BY c.id
            ",
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// The user's row for a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        user_id: UserId,
        goods_id: GoodsId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, user_id, goods_id, quantity, created_at FROM cart_items
            WHERE user_id = $1 AND goods_id = $2
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(goods_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// A row by id, only if it belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(
        &self,
        item_id: CartItemId,
        user_id: UserId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, user_id, goods_id, quantity, created_at FROM cart_items
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(
        &self,
        user_id: UserId,
        goods_id: GoodsId,
        quantity: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let id: CartItemId = sqlx::query_scalar(
            "INSERT INTO cart_items (user_id, goods_id, quantity) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(goods_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Set a row's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(&self, item_id: CartItemId, quantity: i32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete the user's rows among `item_ids`; returns how many went.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_many(
        &self,
        user_id: UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        let ids: Vec<i32> = item_ids.iter().map(CartItemId::as_i32).collect();
        let result =
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2::int[])")
                .bind(user_id)
                .bind(ids)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Number of rows (not units) in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
