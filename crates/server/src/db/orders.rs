//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use hackshop_core::{AddressId, OrderId, OrderStatus, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::{
    CartLine, DashboardStats, Order, OrderDetailRow, OrderLine, OrderSummary, Pagination,
    PaymentOutcome,
};

const ORDER_COLUMNS: &str = "id, order_number, generatetime, payment_status, payment_method, \
     total_amount, user_id, address_id, paid_at";

/// Summary projection shared by the back office lists.
const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.order_number, o.generatetime, o.payment_status, o.payment_method,
           o.total_amount, o.user_id, o.address_id, o.paid_at,
           u.username,
           fl.goodsname AS first_goodsname,
           fl.quantity AS first_quantity,
           (SELECT COALESCE(SUM(quantity), 0)::bigint FROM order_items WHERE order_id = o.id)
               AS total_quantity
    FROM orders o
    LEFT JOIN users u ON u.id = o.user_id
    LEFT JOIN LATERAL (
        SELECT g.goodsname, oi.quantity
        FROM order_items oi
        LEFT JOIN goods g ON g.id = oi.goods_id
        WHERE oi.order_id = o.id
        ORDER BY oi.id
        LIMIT 1
    ) fl ON TRUE
";

/// Repository for orders and order lines.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn cart lines into a pending order and empty those cart rows.
    ///
    /// Prices are snapshotted from the lines. Runs in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create_from_cart(
        &self,
        user_id: UserId,
        order_number: &str,
        lines: &[CartLine],
    ) -> Result<OrderId, RepositoryError> {
        let order_id = OrderId::generate();
        let total: Decimal = lines
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO orders (id, order_number, generatetime, payment_status,
                                payment_method, total_amount, user_id)
            VALUES ($1, $2, now(), 'pending', 'online', $3, $4)
            ",
        )
        .bind(&order_id)
        .bind(order_number)
        .bind(total)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, goods_id, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(&order_id)
            .bind(line.goods_id)
            .bind(line.quantity)
            .bind(line.price)
            .bind(line.price * Decimal::from(line.quantity))
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
                .bind(line.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    /// Get an order by id, whoever owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Get an order by id only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(&self, id: &str, user_id: UserId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Lines of an order joined with goods.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLine>(
            r"
            SELECT oi.id, oi.goods_id, g.goodsname, g.mainimg, oi.quantity,
                   oi.unit_price, oi.subtotal
            FROM order_items oi
            LEFT JOIN goods g ON g.id = oi.goods_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1
            ORDER BY generatetime DESC NULLS LAST
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Pay for a pending order out of `payer`'s balance.
    ///
    /// `payer` is charged whoever owns the order. Address and payment method
    /// are applied first; a business failure rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payer does not exist.
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn pay(
        &self,
        order: &Order,
        payer: UserId,
        address_id: Option<AddressId>,
        payment_method: &str,
    ) -> Result<PaymentOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE orders
            SET address_id = COALESCE($2, address_id), payment_method = $3
            WHERE id = $1
            ",
        )
        .bind(&order.id)
        .bind(address_id)
        .bind(payment_method)
        .execute(&mut *tx)
        .await?;

        let balance: Option<Option<Decimal>> =
            sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(payer)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(balance) = balance else {
            return Err(RepositoryError::NotFound);
        };
        match balance {
            Some(balance) if balance >= order.total_amount => {}
            _ => return Ok(PaymentOutcome::InsufficientBalance),
        }

        let items = sqlx::query(
            r"
            SELECT oi.goods_id, oi.quantity, g.stock, g.goodsname
            FROM order_items oi
            JOIN goods g ON g.id = oi.goods_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            FOR UPDATE OF g
            ",
        )
        .bind(&order.id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            let goods_id: i32 = item.try_get("goods_id")?;
            let quantity: i32 = item.try_get("quantity")?;
            let stock: i32 = item.try_get("stock")?;
            if stock < quantity {
                let goodsname: String = item.try_get("goodsname")?;
                return Ok(PaymentOutcome::InsufficientStock { goodsname });
            }
            sqlx::query(
                r"
                UPDATE goods
                SET stock = stock - $2, sales_count = sales_count + $2, updated_at = now()
                WHERE id = $1
                ",
            )
            .bind(goods_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE users SET balance = balance - $2, updated_at = now() WHERE id = $1")
            .bind(payer)
            .bind(order.total_amount)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE orders SET payment_status = 'paid', paid_at = now() WHERE id = $1")
            .bind(&order.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PaymentOutcome::Paid {
            total: order.total_amount,
        })
    }

    /// One page of the back office order list, newest first.
    ///
    /// `keyword` matches order number or username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn admin_page(
        &self,
        keyword: Option<&str>,
        status: Option<OrderStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<OrderSummary>, Pagination), RepositoryError> {
        let keyword = keyword.map(like_pattern);

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            WHERE ($1::text IS NULL OR o.order_number ILIKE $1 OR u.username ILIKE $1)
              AND ($2::order_status IS NULL OR o.payment_status = $2)
            ",
        )
        .bind(keyword.as_deref())
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let pagination = Pagination::new(page, per_page, total);
        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE ($1::text IS NULL OR o.order_number ILIKE $1 OR u.username ILIKE $1)
              AND ($2::order_status IS NULL OR o.payment_status = $2)
            ORDER BY o.generatetime DESC NULLS LAST
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

    /// One page of orders placed since `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn recent_page(
        &self,
        since: DateTime<Utc>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<OrderSummary>, Pagination), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE generatetime IS NOT NULL AND generatetime >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        let pagination = Pagination::new(page, per_page, total);
        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE o.generatetime IS NOT NULL AND o.generatetime >= $1
            ORDER BY o.generatetime DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(since)
        .bind(pagination.per_page)
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, pagination))
    }

    /// Dashboard headline numbers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COALESCE(SUM(total_amount), 0) FROM orders) AS total_sales,
                (SELECT COUNT(*) FROM orders) AS order_count,
                (SELECT COUNT(*) FROM users) AS user_count,
                (SELECT COUNT(*) FROM goods) AS goods_count
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardStats {
            total_sales: row.try_get("total_sales")?,
            order_count: row.try_get("order_count")?,
            user_count: row.try_get("user_count")?,
            goods_count: row.try_get("goods_count")?,
        })
    }

    /// Set an order's status by order number.
    ///
    /// Moving to `paid` stamps `paid_at` if it is still empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this number.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET payment_status = $2,
                paid_at = CASE WHEN $2 = 'paid'::order_status AND paid_at IS NULL
                               THEN now() ELSE paid_at END
            WHERE order_number = $1
            ",
        )
        .bind(order_number)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Order detail rows for the profile modal.
    ///
    /// The id is concatenated into the SQL text as-is. Every column is cast
    /// to text so `UNION SELECT` payloads line up with eleven text columns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails, including
    /// when the injected text is not valid SQL.
    pub async fn detail_rows_raw(&self, order_id: &str) -> Result<Vec<OrderDetailRow>, RepositoryError> {
        let sql = String::from(
            "SELECT o.id::text AS id, o.order_number::text AS order_number, \
             to_char(o.generatetime, 'YYYY-MM-DD') AS generatetime, \
             o.total_amount::text AS total_amount, o.user_id::text AS user_id, \
             a.receiver::text AS receiver, a.phone::text AS phone, \
             a.addressname::text AS addressname, g.goodsname::text AS goodsname, \
             oi.unit_price::text AS unit_price, oi.quantity::text AS quantity \
             FROM orders o \
             LEFT JOIN addresses a ON a.id = o.address_id \
             LEFT JOIN order_items oi ON oi.order_id = o.id \
             LEFT JOIN goods g ON g.id = oi.goods_id \
             WHERE o.id = '",
        ) + order_id
            + "'";

        let rows = sqlx::query(&sql).fetch_all(self.pool).await?;

        rows.iter()
            .map(|row| {
                let text = |idx: usize| -> Result<Option<String>, sqlx::Error> {
                    row.try_get::<Option<String>, _>(idx)
                };
                Ok(OrderDetailRow {
                    id: text(0)?,
                    order_number: text(1)?,
                    generatetime: text(2)?,
                    total_amount: text(3)?,
                    user_id: text(4)?,
                    receiver: text(5)?,
                    phone: text(6)?,
                    addressname: text(7)?,
                    goodsname: text(8)?,
                    unit_price: text(9)?,
                    quantity: text(10)?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(RepositoryError::from)
    }
}
