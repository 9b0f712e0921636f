//! Back office route handlers.
//!
//! Every page except the login form requires an admin in the session
//! ([`RequireAdmin`](crate::middleware::RequireAdmin)). Form posts follow the
//! flash-and-redirect pattern.

mod auth;
mod batch;
mod dashboard;
mod orders;
mod products;
mod vouchers;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Deserialize;

use crate::models::{CurrentAdmin, FlashMessage};
use crate::state::AppState;

/// Largest accepted upload (product images, spreadsheets).
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Layout data shared by every back office page.
pub struct AdminLayout {
    pub admin: CurrentAdmin,
    pub flashes: Vec<FlashMessage>,
    /// Navigation entry to highlight.
    pub active: &'static str,
}

impl AdminLayout {
    #[must_use]
    pub const fn new(admin: CurrentAdmin, flashes: Vec<FlashMessage>, active: &'static str) -> Self {
        Self {
            admin,
            flashes,
            active,
        }
    }
}

/// `?page=` for the paginated lists.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `&key=value` pairs carried across pagination links; blank values are
/// dropped.
fn filter_suffix(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs.iter().filter(|(_, v)| !v.is_empty()) {
        serializer.append_pair(key, value);
    }
    let query = serializer.finish();
    if query.is_empty() {
        query
    } else {
        format!("&{query}")
    }
}

/// Build the back office router, mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/users", get(dashboard::users))
        .route("/settings", get(dashboard::settings))
        .route("/products", get(products::index))
        .route("/product/add", post(products::add))
        .route("/product/{id}/edit", post(products::edit))
        .route("/product/{id}/toggle", post(products::toggle))
        .route("/product/{id}/delete", post(products::delete))
        .route("/products/batch/template", get(batch::template))
        .route("/products/batch/upload", post(batch::upload))
        .route("/products/batch/import", post(batch::import))
        .route("/orders", get(orders::index))
        .route("/order/{order_number}/status", post(orders::update_status))
        .route("/vouchers", get(vouchers::index))
        .route("/vouchers/generate", post(vouchers::generate))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_suffix_skips_blank_and_encodes() {
        assert_eq!(filter_suffix(&[("keyword", ""), ("status", "")]), "");
        assert_eq!(
            filter_suffix(&[("keyword", "red mug"), ("status", "paid")]),
            "&keyword=red+mug&status=paid"
        );
    }
}
