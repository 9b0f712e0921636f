//! Dashboard and the read-only back office pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use tracing::instrument;

use hackshop_core::Price;

use super::{AdminLayout, PageQuery};
use crate::db::{AdminRepository, OrderRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{Flashes, RequireAdmin};
use crate::models::{Admin, DashboardStats, OrderSummary, Pagination};
use crate::services::ids::parse_positive_int;
use crate::state::AppState;

const RECENT_DAYS: i64 = 30;
const RECENT_PER_PAGE: i64 = 10;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: AdminLayout,
    pub stats: DashboardStats,
    pub total_sales: Price,
    pub orders: Vec<OrderSummary>,
    pub pagination: Pagination,
}

/// Admin accounts template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub layout: AdminLayout,
    pub admins: Vec<Admin>,
}

/// Settings template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/settings.html")]
pub struct SettingsTemplate {
    pub layout: AdminLayout,
}

/// Headline numbers and the last 30 days of orders.
#[instrument(skip(state, admin, flashes))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Flashes(flashes): Flashes,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool());
    let stats = orders.dashboard_stats().await?;
    let since = Utc::now() - Duration::days(RECENT_DAYS);
    let (recent, pagination) = orders
        .recent_page(
            since,
            parse_positive_int(query.page.as_deref(), 1),
            RECENT_PER_PAGE,
        )
        .await?;

    Ok(DashboardTemplate {
        layout: AdminLayout::new(admin, flashes, "dashboard"),
        total_sales: Price::new(stats.total_sales),
        stats,
        orders: recent,
        pagination,
    })
}

/// Back office accounts.
#[instrument(skip(state, admin, flashes))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Flashes(flashes): Flashes,
) -> Result<impl IntoResponse> {
    let admins = AdminRepository::new(state.pool()).list().await?;
    Ok(UsersTemplate {
        layout: AdminLayout::new(admin, flashes, "users"),
        admins,
    })
}

/// Static settings page.
pub async fn settings(
    RequireAdmin(admin): RequireAdmin,
    Flashes(flashes): Flashes,
) -> impl IntoResponse {
    SettingsTemplate {
        layout: AdminLayout::new(admin, flashes, "settings"),
    }
}
