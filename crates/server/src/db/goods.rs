//! Catalogue repository.

use sqlx::{PgConnection, PgPool};

use hackshop_core::{GoodsId, GoodsStatus, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::{Goods, GoodsFilter, GoodsImage, GoodsSpec, NewGoods, Pagination};

const GOODS_COLUMNS: &str = "id, goodsname, category, mainimg, content, stock, price, status, \
     brand, model, original_price, rating_avg, rating_count, sales_count, slug, \
     created_at, updated_at";

/// Repository for goods, their images and specs, and favourites.
pub struct GoodsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GoodsRepository<'a> {
    /// Create a new goods repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All goods currently on sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_on_sale(&self) -> Result<Vec<Goods>, RepositoryError> {
        let rows = sqlx::query_as::<_, Goods>(&format!(
            "SELECT {GOODS_COLUMNS} FROM goods WHERE status = '0' ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// On-sale goods whose name or category contains `term`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_on_sale(&self, term: &str) -> Result<Vec<Goods>, RepositoryError> {
        let rows = sqlx::query_as::<_, Goods>(&format!(
            r"
            SELECT {GOODS_COLUMNS} FROM goods
            WHERE status = '0' AND (goodsname ILIKE $1 OR category ILIKE $1)
            ORDER BY id
            "
        ))
        .bind(like_pattern(term))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a product by id, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: GoodsId) -> Result<Option<Goods>, RepositoryError> {
        let row = sqlx::query_as::<_, Goods>(&format!(
            "SELECT {GOODS_COLUMNS} FROM goods WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Gallery images, main image first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, id: GoodsId) -> Result<Vec<GoodsImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, GoodsImage>(
            r"
            SELECT id, goods_id, url, is_main, sort_order FROM goods_images
            WHERE goods_id = $1
            ORDER BY is_main DESC, sort_order, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Specification rows in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn specs(&self, id: GoodsId) -> Result<Vec<GoodsSpec>, RepositoryError> {
        let rows = sqlx::query_as::<_, GoodsSpec>(
            r"
            SELECT id, goods_id, name, value, sort_order FROM goods_specs
            WHERE goods_id = $1
            ORDER BY sort_order, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One page of the back office product list, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn admin_page(
        &self,
        filter: &GoodsFilter,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Goods>, Pagination), RepositoryError> {
        let keyword = filter.keyword.as_deref().map(like_pattern);
        let status = filter.status.map(|s| s.code());

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM goods
            WHERE ($1::text IS NULL OR goodsname ILIKE $1 OR category ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            ",
        )
        .bind(keyword.as_deref())
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let pagination = Pagination::new(page, per_page, total);
        let rows = sqlx::query_as::<_, Goods>(&format!(
            r"
            SELECT {GOODS_COLUMNS} FROM goods
            WHERE ($1::text IS NULL OR goodsname ILIKE $1 OR category ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(keyword.as_deref())
        .bind(status)
        .bind(pagination.per_page)
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, pagination))
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, goods: &NewGoods) -> Result<GoodsId, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_goods(&mut conn, goods).await
    }

    /// Update the editable fields; `mainimg` is only replaced when `Some`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: GoodsId,
        goods: &NewGoods,
        mainimg: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE goods
            SET goodsname = $2, category = $3, price = $4, stock = $5, content = $6,
                status = $7, mainimg = COALESCE($8, mainimg), updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&goods.goodsname)
        .bind(&goods.category)
        .bind(goods.price)
        .bind(goods.stock)
        .bind(&goods.content)
        .bind(goods.status.code())
        .bind(mainimg)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set the listing status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status(&self, id: GoodsId, status: GoodsStatus) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE goods SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(status.code())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count all goods.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM goods")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// A user's favourites, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn favorites(&self, user_id: UserId) -> Result<Vec<Goods>, RepositoryError> {
        let rows = sqlx::query_as::<_, Goods>(
            r"
            SELECT g.* FROM user_goods ug
            JOIN goods g ON g.id = ug.goods_id
            WHERE ug.user_id = $1
            ORDER BY ug.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Add or remove a favourite. Returns `true` when it is now a favourite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn toggle_favorite(
        &self,
        user_id: UserId,
        goods_id: GoodsId,
    ) -> Result<bool, RepositoryError> {
        let removed = sqlx::query("DELETE FROM user_goods WHERE user_id = $1 AND goods_id = $2")
            .bind(user_id)
            .bind(goods_id)
            .execute(self.pool)
            .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO user_goods (user_id, goods_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(goods_id)
        .execute(self.pool)
        .await?;
        Ok(true)
    }
}

/// Insert a product on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the slug is taken.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_goods(
    conn: &mut PgConnection,
    goods: &NewGoods,
) -> Result<GoodsId, RepositoryError> {
    let id: GoodsId = sqlx::query_scalar(
        r"
        INSERT INTO goods (goodsname, category, mainimg, content, stock, price, status,
                           brand, model, original_price, rating_avg, rating_count,
                           sales_count, slug)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id
        ",
    )
    .bind(&goods.goodsname)
    .bind(&goods.category)
    .bind(&goods.mainimg)
    .bind(&goods.content)
    .bind(goods.stock)
    .bind(goods.price)
    .bind(goods.status.code())
    .bind(&goods.brand)
    .bind(&goods.model)
    .bind(goods.original_price)
    .bind(goods.rating_avg)
    .bind(goods.rating_count)
    .bind(goods.sales_count)
    .bind(&goods.slug)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| super::conflict_on_unique(e, "slug"))?;
    Ok(id)
}

/// Whether a product with this slug exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn slug_exists(conn: &mut PgConnection, slug: &str) -> Result<bool, RepositoryError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM goods WHERE slug = $1)")
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// Attach a gallery image.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_image(
    conn: &mut PgConnection,
    goods_id: GoodsId,
    url: &str,
    is_main: bool,
    sort_order: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO goods_images (goods_id, url, is_main, sort_order) VALUES ($1, $2, $3, $4)",
    )
    .bind(goods_id)
    .bind(url)
    .bind(is_main)
    .bind(sort_order)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Attach a specification row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_spec(
    conn: &mut PgConnection,
    goods_id: GoodsId,
    name: &str,
    value: &str,
    sort_order: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO goods_specs (goods_id, name, value, sort_order) VALUES ($1, $2, $3, $4)",
    )
    .bind(goods_id)
    .bind(name)
    .bind(value)
    .bind(sort_order)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
