//! Per-page layout data: the logged-in shopper, cart badge and flashes.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use hackshop_core::UserId;

use crate::db::{CartRepository, UserRepository};
use crate::middleware::auth::session_user_id;
use crate::middleware::flash::take_flashes;
use crate::models::FlashMessage;
use crate::state::AppState;

/// Shopper shown in the navigation bar.
#[derive(Debug, Clone)]
pub struct NavUser {
    pub id: UserId,
    pub username: String,
}

/// Data every storefront page template receives as `page`.
///
/// Extracting it drains the pending flash messages, so take it once per
/// rendered page.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<NavUser>,
    pub cart_count: i64,
    pub flashes: Vec<FlashMessage>,
}

impl PageContext {
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Name of the logged-in shopper, empty for guests.
    #[must_use]
    pub fn username(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.username.as_str())
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let flashes = take_flashes(session).await;
        let Some(user_id) = session_user_id(session).await else {
            return Ok(Self {
                flashes,
                ..Self::default()
            });
        };

        let user = match UserRepository::new(state.pool()).get_by_id(user_id).await {
            Ok(user) => user.map(|u| NavUser {
                id: u.id,
                username: u.username,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load navigation user");
                None
            }
        };

        let cart_count = if user.is_some() {
            CartRepository::new(state.pool())
                .count_for_user(user_id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "failed to count cart rows");
                    0
                })
        } else {
            0
        };

        Ok(Self {
            user,
            cart_count,
            flashes,
        })
    }
}

/// Flash messages alone, for the back office layout.
pub struct Flashes(pub Vec<FlashMessage>);

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flashes = match parts.extensions.get::<Session>() {
            Some(session) => take_flashes(session).await,
            None => Vec::new(),
        };
        Ok(Self(flashes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_guest() {
        let page = PageContext::default();
        assert!(!page.is_logged_in());
        assert_eq!(page.username(), "");
        assert_eq!(page.cart_count, 0);
    }
}
