//! Authentication extractors.
//!
//! - [`RequireUser`] redirects to the shopper login page when nobody is
//!   logged in.
//! - [`CartUser`] is the same check for the cart's JSON endpoints; it
//!   answers 401 with a `redirect` hint instead.
//! - [`OptionalUser`] never rejects.
//! - [`RequireAdmin`] redirects to the back office login page.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use hackshop_core::UserId;

use crate::db::UserRepository;
use crate::error::ApiError;
use crate::models::session::keys;
use crate::models::{CurrentAdmin, User};
use crate::state::AppState;

/// Extractor that requires a logged-in shopper.
///
/// The user row is loaded per request. A session pointing at a user that no
/// longer exists is cleared.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireUser(pub User);

/// Error returned when a page needs a shopper or admin who is not logged in.
pub enum AuthRejection {
    /// Redirect to the shopper login page.
    RedirectToLogin,
    /// Redirect to the back office login page.
    RedirectToAdminLogin,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/user/login").into_response(),
            Self::RedirectToAdminLogin => Redirect::to("/admin/login").into_response(),
        }
    }
}

/// Session user id, if any.
pub async fn session_user_id(session: &Session) -> Option<UserId> {
    session.get::<UserId>(keys::USER_ID).await.ok().flatten()
}

/// Load the session's user; clears a session whose user has gone.
async fn load_user(parts: &Parts, state: &AppState) -> Option<User> {
    let session = parts.extensions.get::<Session>()?;
    let user_id = session_user_id(session).await?;

    match UserRepository::new(state.pool()).get_by_id(user_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            if let Err(e) = session.flush().await {
                tracing::warn!(error = %e, "failed to clear stale session");
            }
            None
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "failed to load session user");
            None
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_user(parts, state)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Like [`RequireUser`], but rejects with a JSON 401.
pub struct CartUser(pub User);

impl FromRequestParts<AppState> for CartUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_user(parts, state)
            .await
            .map(Self)
            .ok_or_else(ApiError::login_required)
    }
}

/// Extractor that optionally gets the current shopper.
pub struct OptionalUser(pub Option<User>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(load_user(parts, state).await))
    }
}

/// Extractor that requires a logged-in back office account.
pub struct RequireAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::RedirectToAdminLogin)?;

        session
            .get::<CurrentAdmin>(keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .map(Self)
            .ok_or(AuthRejection::RedirectToAdminLogin)
    }
}

/// Log a shopper in.
///
/// The id is rotated to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user_id: UserId,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::USER_ID, user_id).await
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_ADMIN, admin).await
}
