//! Simulated mailbox.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use hackshop_core::MailId;

/// Outgoing mail captured by the lab inbox instead of being delivered.
#[derive(Debug, Clone, FromRow)]
pub struct MailLog {
    pub id: MailId,
    pub subject: String,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// JSON shape served by the inbox polling API.
#[derive(Debug, Clone, Serialize)]
pub struct MailView {
    pub id: MailId,
    pub subject: String,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub created_at: String,
    pub is_read: bool,
}

impl From<MailLog> for MailView {
    fn from(mail: MailLog) -> Self {
        Self {
            id: mail.id,
            subject: mail.subject,
            sender: mail.sender,
            receiver: mail.receiver,
            content: mail.content,
            created_at: mail.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            is_read: mail.is_read,
        }
    }
}
