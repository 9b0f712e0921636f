//! Shopper authentication route handlers.
//!
//! Every POST accepts JSON or a form. JSON and XHR callers get a JSON reply;
//! plain form posts get the page back with the error, or a redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use hackshop_core::Email;

use crate::error::{ApiError, clear_sentry_user, set_sentry_user};
use crate::extract::{JsonOrForm, non_blank, request_host, wants_json};
use crate::filters;
use crate::middleware::{PageContext, push_flash, remember_session, set_current_user};
use crate::models::{FlashLevel, User};
use crate::services::auth::AuthService;
use crate::services::ids::is_truthy;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
    /// `true` from JSON, `on`/`1`/`yes` from a checkbox.
    pub remember: Option<Value>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub email_code: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: Option<String>,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub page: PageContext,
    pub token: String,
    pub valid: bool,
    pub error: Option<String>,
}

/// Loose truthiness for a JSON or form value.
fn truthy_value(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => is_truthy(Some(s.as_str())),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn required(value: Option<&str>) -> Result<&str, ApiError> {
    non_blank(value).ok_or_else(|| ApiError::bad_request("Please fill in all required fields"))
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext) -> impl IntoResponse {
    LoginTemplate { page, error: None }
}

async fn try_login(state: &AppState, session: &Session, form: &LoginForm) -> Result<User, ApiError> {
    let email = required(form.email.as_deref())?;
    let password = required(form.password.as_deref())?;

    let user = AuthService::new(state.pool(), state.store())
        .authenticate_user(email, password)
        .await?;

    set_current_user(session, user.id).await?;
    if truthy_value(form.remember.as_ref()) {
        remember_session(session);
    }
    set_sentry_user(&user.id, Some(&user.email));
    Ok(user)
}

/// Handle login submission.
#[instrument(skip(state, session, headers, page, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    page: PageContext,
    JsonOrForm(form): JsonOrForm<LoginForm>,
) -> Response {
    let result = try_login(&state, &session, &form).await;
    if let Ok(user) = &result {
        tracing::info!(user_id = %user.id, "user logged in");
    }

    if wants_json(&headers) {
        return match result {
            Ok(user) => Json(json!({
                "success": true,
                "message": "Login successful",
                "username": user.username,
                "redirect": "/",
            }))
            .into_response(),
            Err(e) => e.into_response(),
        };
    }

    match result {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => (
            e.status(),
            LoginTemplate {
                page,
                error: Some(e.message().to_owned()),
            },
        )
            .into_response(),
    }
}

/// Log out and return to the home page.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to clear session on logout");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: PageContext) -> impl IntoResponse {
    RegisterTemplate { page, error: None }
}

async fn try_register(state: &AppState, form: &RegisterForm) -> Result<User, ApiError> {
    let username = required(form.username.as_deref())?;
    let email = required(form.email.as_deref())?;
    let password = required(form.password.as_deref())?;
    let confirm = required(form.confirm_password.as_deref())?;
    let email_code = required(form.email_code.as_deref())?;

    if password != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    let email = Email::parse(email).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let user = AuthService::new(state.pool(), state.store())
        .register(username, email.as_str(), password, email_code)
        .await?;
    Ok(user)
}

/// Handle registration submission.
#[instrument(skip(state, session, headers, page, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    page: PageContext,
    JsonOrForm(form): JsonOrForm<RegisterForm>,
) -> Response {
    let result = try_register(&state, &form).await;
    if let Ok(user) = &result {
        tracing::info!(user_id = %user.id, "user registered");
    }

    if wants_json(&headers) {
        return match result {
            Ok(_) => Json(json!({
                "success": true,
                "message": "Registration successful, please log in",
                "redirect": "/auth/user/login",
            }))
            .into_response(),
            Err(e) => e.into_response(),
        };
    }

    match result {
        Ok(_) => {
            push_flash(
                &session,
                FlashLevel::Success,
                "Registration successful, please log in",
            )
            .await;
            Redirect::to("/auth/user/login").into_response()
        }
        Err(e) => (
            e.status(),
            RegisterTemplate {
                page,
                error: Some(e.message().to_owned()),
            },
        )
            .into_response(),
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(page: PageContext) -> impl IntoResponse {
    ForgotPasswordTemplate {
        page,
        error: None,
        success: None,
    }
}

const RESET_SENT: &str = "Reset link sent, check the inbox";

/// Mail a reset link. The link is built from the request `Host`.
#[instrument(skip(state, headers, page, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    page: PageContext,
    JsonOrForm(form): JsonOrForm<ForgotPasswordForm>,
) -> Response {
    let host = request_host(&headers);
    let result = async {
        let email = non_blank(form.email.as_deref())
            .ok_or_else(|| ApiError::bad_request("Email is required"))?;
        AuthService::new(state.pool(), state.store())
            .send_reset_url(email, &host)
            .await?;
        Ok::<_, ApiError>(())
    }
    .await;

    if wants_json(&headers) {
        return match result {
            Ok(()) => Json(json!({ "success": true, "message": RESET_SENT })).into_response(),
            Err(e) => e.into_response(),
        };
    }

    match result {
        Ok(()) => ForgotPasswordTemplate {
            page,
            error: None,
            success: Some(RESET_SENT.to_owned()),
        }
        .into_response(),
        Err(e) => (
            e.status(),
            ForgotPasswordTemplate {
                page,
                error: Some(e.message().to_owned()),
                success: None,
            },
        )
            .into_response(),
    }
}

/// Display the reset form, or an error for an unknown token.
#[instrument(skip(state, page))]
pub async fn reset_password_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    page: PageContext,
) -> impl IntoResponse {
    let valid = AuthService::new(state.pool(), state.store())
        .reset_token_user(&token)
        .await
        .is_some();

    ResetPasswordTemplate {
        page,
        token,
        valid,
        error: (!valid).then(|| "Link is invalid or has expired".to_owned()),
    }
}

/// Set a new password for the token's user.
#[instrument(skip(state, session, headers, page, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    session: Session,
    headers: HeaderMap,
    page: PageContext,
    JsonOrForm(form): JsonOrForm<ResetPasswordForm>,
) -> Response {
    let result = async {
        let password = non_blank(form.password.as_deref())
            .ok_or_else(|| ApiError::bad_request("Password is required"))?;
        AuthService::new(state.pool(), state.store())
            .reset_password(&token, password)
            .await?;
        Ok::<_, ApiError>(())
    }
    .await;

    if wants_json(&headers) {
        return match result {
            Ok(()) => Json(json!({
                "success": true,
                "message": "Password updated, please log in",
                "redirect": "/auth/user/login",
            }))
            .into_response(),
            Err(e) => e.into_response(),
        };
    }

    match result {
        Ok(()) => {
            push_flash(&session, FlashLevel::Success, "Password updated, please log in").await;
            Redirect::to("/auth/user/login").into_response()
        }
        Err(e) => (
            e.status(),
            ResetPasswordTemplate {
                page,
                token,
                valid: true,
                error: Some(e.message().to_owned()),
            },
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_value_accepts_json_and_form_shapes() {
        assert!(truthy_value(Some(&json!(true))));
        assert!(truthy_value(Some(&json!("on"))));
        assert!(truthy_value(Some(&json!(1))));
        assert!(!truthy_value(Some(&json!(false))));
        assert!(!truthy_value(Some(&json!("off"))));
        assert!(!truthy_value(None));
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(Some("  ")).is_err());
        assert_eq!(required(Some(" a ")).ok(), Some("a"));
    }
}
