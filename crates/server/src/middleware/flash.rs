//! One-shot flash messages stored in the session.

use tower_sessions::Session;

use crate::models::session::keys;
use crate::models::{FlashLevel, FlashMessage};

/// Generic message shown when a form write fails.
pub const OPERATION_FAILED: &str = "Operation failed, please try again later";

/// Queue a message for the next rendered page.
///
/// Session failures are logged and the message is dropped.
pub async fn push_flash(session: &Session, level: FlashLevel, message: impl Into<String>) {
    let mut flashes = session
        .get::<Vec<FlashMessage>>(keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    flashes.push(FlashMessage {
        level,
        message: message.into(),
    });

    if let Err(e) = session.insert(keys::FLASHES, flashes).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Take and clear all pending messages.
pub async fn take_flashes(session: &Session) -> Vec<FlashMessage> {
    session
        .remove::<Vec<FlashMessage>>(keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Log a failed write and tell the user, the way every form handler does.
pub async fn flash_failure(
    session: &Session,
    context: &str,
    error: &(dyn std::error::Error + Send + Sync),
) {
    tracing::error!(error = %error, "{context} failed");
    push_flash(session, FlashLevel::Error, OPERATION_FAILED).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flashes_are_taken_once() {
        let session = session();
        push_flash(&session, FlashLevel::Success, "Saved").await;
        push_flash(&session, FlashLevel::Error, "Oops").await;

        let flashes = take_flashes(&session).await;
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].message, "Saved");
        assert_eq!(flashes[1].level, FlashLevel::Error);

        assert!(take_flashes(&session).await.is_empty());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_flash_failure_is_send_and_flashes_generic_message() {
        let session = session();
        let error = std::io::Error::other("disk full");

        let fut = flash_failure(&session, "upload", &error);
        assert_send(&fut);
        fut.await;

        let flashes = take_flashes(&session).await;
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].level, FlashLevel::Error);
        assert_eq!(flashes[0].message, OPERATION_FAILED);
    }
}
