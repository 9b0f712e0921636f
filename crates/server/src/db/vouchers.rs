//! Voucher repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use hackshop_core::UserId;

use super::RepositoryError;
use crate::models::{Pagination, RedeemOutcome, Voucher};

const VOUCHER_COLUMNS: &str =
    "id, code, amount, status, expires_at, used_at, used_by, created_at";

/// Repository for vouchers.
pub struct VoucherRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VoucherRepository<'a> {
    /// Create a new voucher repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of vouchers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn page(
        &self,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Voucher>, Pagination), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vouchers")
            .fetch_one(self.pool)
            .await?;
        let pagination = Pagination::new(page, per_page, total);

        let rows = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.per_page)
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;
        Ok((rows, pagination))
    }

    /// Look up a voucher by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Voucher>, RepositoryError> {
        let row = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Insert unused vouchers with the given codes in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails; nothing is kept.
    pub async fn create_many(
        &self,
        codes: &[String],
        amount: Decimal,
        expires_at: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for code in codes {
            sqlx::query(
                "INSERT INTO vouchers (code, amount, status, expires_at) VALUES ($1, $2, '0', $3)",
            )
            .bind(code)
            .bind(amount)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(codes.len())
    }

    /// Redeem a voucher into a user's balance.
    ///
    /// The status check and the write are separate steps: the voucher row is
    /// read, checked, and then updated without a lock or a status predicate,
    /// so concurrent requests with the same code can all succeed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user no longer exists.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn redeem(&self, code: &str, user_id: UserId) -> Result<RedeemOutcome, RepositoryError> {
        let Some(voucher) = self.get_by_code(code).await? else {
            return Ok(RedeemOutcome::NotFound);
        };
        if let Some(refusal) = voucher.redeem_block(Utc::now()) {
            return Ok(refusal);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE vouchers SET status = '1', used_by = $2, used_at = now() WHERE id = $1")
            .bind(voucher.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let balance: Option<Option<Decimal>> = sqlx::query_scalar(
            r"
            UPDATE users
            SET balance = COALESCE(balance, 0) + $2, updated_at = now()
            WHERE id = $1
            RETURNING balance
            ",
        )
        .bind(user_id)
        .bind(voucher.amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(balance) = balance else {
            return Err(RepositoryError::NotFound);
        };
        tx.commit().await?;

        Ok(RedeemOutcome::Redeemed {
            amount: voucher.amount,
            balance: balance.unwrap_or_default(),
        })
    }
}
