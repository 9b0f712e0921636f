//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions.

use sqlx::PgPool;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "hackshop_session";

/// Lifetime of a "remember me" session in seconds (7 days).
const REMEMBER_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// Sessions end with the browser unless the login asked to be remembered.
/// The cookie is `SameSite=Lax` and not marked secure: the lab is served over
/// plain HTTP.
#[must_use]
pub fn create_session_layer(pool: &PgPool) -> SessionManagerLayer<PostgresStore> {
    // The sessions table is created by `hackshop-cli migrate`
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Keep this session alive across browser restarts for 7 days.
pub fn remember_session(session: &Session) {
    session.set_expiry(Some(Expiry::OnInactivity(Duration::seconds(REMEMBER_SECONDS))));
}
