//! Simulated mailbox repository.

use sqlx::PgPool;

use hackshop_core::MailId;

use super::RepositoryError;
use crate::models::MailLog;

const MAIL_COLUMNS: &str = "id, subject, sender, receiver, content, created_at, is_read";

/// Repository for the lab inbox.
pub struct MailRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MailRepository<'a> {
    /// Create a new mail repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an outgoing mail.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        sender: &str,
        receiver: &str,
        subject: &str,
        content: &str,
    ) -> Result<MailId, RepositoryError> {
        let id: MailId = sqlx::query_scalar(
            r"
            INSERT INTO mail_logs (subject, sender, receiver, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(subject)
        .bind(sender)
        .bind(receiver)
        .bind(content)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Mails newer than `since_id` (all when `None`), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, since_id: Option<i32>) -> Result<Vec<MailLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, MailLog>(&format!(
            r"
            SELECT {MAIL_COLUMNS} FROM mail_logs
            WHERE ($1::int IS NULL OR id > $1)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(since_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Set the read flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the mail does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_read(&self, id: MailId, is_read: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE mail_logs SET is_read = $2 WHERE id = $1")
            .bind(id)
            .bind(is_read)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
