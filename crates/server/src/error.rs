//! Unified error handling with Sentry integration.
//!
//! Two response surfaces share the same capture rules:
//!
//! - [`AppError`] renders the HTML error page (or redirects to login).
//! - [`ApiError`] renders `{"success": false, "message": ..., ...}` for the
//!   JSON endpoints.
//!
//! Server-side failures are captured to Sentry and logged; the client only
//! sees a generic message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::filters;
use crate::middleware::PageContext;
use crate::services::auth::AuthError;

/// Application-level error type for HTML pages.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not logged in.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: PageContext,
    pub status: u16,
    pub message: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Unauthorized) {
            return Redirect::to("/auth/user/login").into_response();
        }

        let status = self.status();
        if status.is_server_error() {
            capture(&self);
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::NotFound(what) => format!("{what} not found"),
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::BadRequest(msg) => msg.clone(),
            _ => "Internal server error".to_owned(),
        };

        (
            status,
            ErrorTemplate {
                page: PageContext::default(),
                status: status.as_u16(),
                message,
            },
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON error body for the XHR endpoints.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    extra: Map<String, Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Login required; the client is told where to go.
    #[must_use]
    pub fn login_required() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Please log in first").with("redirect", "/auth/user/login")
    }

    /// Server-side failure: captured and logged, generic message to the client.
    #[must_use]
    pub fn internal(error: &(dyn std::error::Error + 'static)) -> Self {
        capture(error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// Attach an extra top-level field to the body.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("success".to_owned(), Value::Bool(false));
        body.insert("message".to_owned(), Value::String(self.message));
        body.extend(self.extra);
        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found("Not found"),
            RepositoryError::Conflict(what) => Self::conflict(format!("{what} already exists")),
            other => Self::internal(&other),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::internal(&err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Locked { lock_ttl } => {
                Self::new(StatusCode::FORBIDDEN, "Account locked, try again later")
                    .with("lock_ttl", lock_ttl)
            }
            AuthError::InvalidCredentials { fail_count } => {
                Self::new(StatusCode::UNAUTHORIZED, "Wrong email or password")
                    .with("fail_count", fail_count)
            }
            AuthError::InvalidEmailCode => Self::bad_request("Wrong email verification code"),
            AuthError::InvalidResetToken => Self::bad_request("Link is invalid or has expired"),
            AuthError::UserNotFound => Self::not_found("Email not found"),
            AuthError::UserAlreadyExists => Self::conflict("Username or email already registered"),
            AuthError::Repository(e) => Self::from(e),
        }
    }
}

/// JSON result alias.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

fn capture(error: &(dyn std::error::Error + 'static)) {
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "Request error"
    );
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product".to_string());
        assert_eq!(err.to_string(), "Not found: Product");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_api_error_body_carries_extras() {
        let response = ApiError::from(AuthError::InvalidCredentials { fail_count: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["success"], Value::Bool(false));
        assert_eq!(body["fail_count"], 3);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_locked_maps_to_forbidden() {
        let response = ApiError::from(AuthError::Locked { lock_ttl: 120 }).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["lock_ttl"], 120);
    }

    #[tokio::test]
    async fn test_login_required_points_to_login() {
        let response = ApiError::login_required().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["redirect"], "/auth/user/login");
    }
}
