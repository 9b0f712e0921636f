//! Back office login.
//!
//! The login form encrypts the password in the browser (`admin-login.js`)
//! and the server decrypts it with the same built-in key.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::AdminRepository;
use crate::extract::non_blank;
use crate::filters;
use crate::middleware::{Flashes, flash_failure, push_flash, set_current_admin};
use crate::models::session::keys;
use crate::models::{CurrentAdmin, FlashLevel, FlashMessage};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login form. `password` is the base64 AES ciphertext.
#[derive(Debug, Deserialize)]
pub struct AdminLoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub flashes: Vec<FlashMessage>,
}

/// Login page. Until the first admin login, the stored credentials are shown.
#[instrument(skip(state, session, flashes))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Flashes(mut flashes): Flashes,
) -> Response {
    if let Ok(Some(_)) = session.get::<CurrentAdmin>(keys::CURRENT_ADMIN).await {
        return Redirect::to("/admin/dashboard").into_response();
    }

    match AdminRepository::new(state.pool()).first().await {
        Ok(Some(admin)) if admin.last_login.is_none() => flashes.push(FlashMessage {
            level: FlashLevel::Info,
            message: format!(
                "Default account: {} / {}",
                admin.username, admin.password
            ),
        }),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to look up default admin"),
    }

    AdminLoginTemplate { flashes }.into_response()
}

/// Check the credentials and open a back office session.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AdminLoginForm>,
) -> Redirect {
    let (Some(username), Some(ciphertext)) = (
        non_blank(form.username.as_deref()),
        non_blank(form.password.as_deref()),
    ) else {
        push_flash(&session, FlashLevel::Error, "Please enter username and password").await;
        return Redirect::to("/admin/login");
    };

    match AuthService::new(state.pool(), state.store())
        .admin_auth(username, ciphertext)
        .await
    {
        Ok(Some(admin)) => {
            let current = CurrentAdmin {
                id: admin.id,
                username: admin.username,
            };
            if let Err(e) = set_current_admin(&session, &current).await {
                flash_failure(&session, "admin session", &e).await;
                return Redirect::to("/admin/login");
            }
            tracing::info!(admin = %current.username, "admin logged in");
            push_flash(&session, FlashLevel::Success, "Login successful").await;
            Redirect::to("/admin/dashboard")
        }
        Ok(None) => {
            tracing::warn!(username, "admin login failed");
            push_flash(&session, FlashLevel::Error, "Wrong username or password").await;
            Redirect::to("/admin/login")
        }
        Err(e) => {
            flash_failure(&session, "admin login", &e).await;
            Redirect::to("/admin/login")
        }
    }
}

/// Close the back office session; a shopper login in the same browser stays.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = session.remove::<CurrentAdmin>(keys::CURRENT_ADMIN).await {
        tracing::warn!(error = %e, "failed to clear admin session");
    }
    push_flash(&session, FlashLevel::Success, "Logged out").await;
    Redirect::to("/admin/login")
}
