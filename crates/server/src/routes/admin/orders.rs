//! Back office order list and status changes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hackshop_core::OrderStatus;

use super::{AdminLayout, filter_suffix};
use crate::db::{OrderRepository, RepositoryError};
use crate::error::Result;
use crate::extract::non_blank;
use crate::filters;
use crate::middleware::{Flashes, RequireAdmin, flash_failure, push_flash};
use crate::models::{FlashLevel, OrderSummary, Pagination};
use crate::services::ids::parse_positive_int;
use crate::state::AppState;

const PER_PAGE: i64 = 10;

/// Order list filters.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<String>,
    pub keyword: Option<String>,
    pub status: Option<String>,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub layout: AdminLayout,
    pub orders: Vec<OrderSummary>,
    pub pagination: Pagination,
    pub keyword: String,
    pub status: String,
    pub statuses: [OrderStatus; 5],
    pub page_suffix: String,
}

/// Paginated, filterable order list.
#[instrument(skip(state, admin, flashes))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Flashes(flashes): Flashes,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let keyword = non_blank(query.keyword.as_deref());
    // An unknown status is ignored rather than rejected.
    let status = query
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<OrderStatus>().ok());

    let (orders, pagination) = OrderRepository::new(state.pool())
        .admin_page(
            keyword,
            status,
            parse_positive_int(query.page.as_deref(), 1),
            PER_PAGE,
        )
        .await?;

    let keyword = keyword.unwrap_or_default().to_owned();
    let status = status.map(|s| s.as_str().to_owned()).unwrap_or_default();
    Ok(OrdersTemplate {
        layout: AdminLayout::new(admin, flashes, "orders"),
        orders,
        pagination,
        page_suffix: filter_suffix(&[("keyword", keyword.as_str()), ("status", status.as_str())]),
        keyword,
        status,
        statuses: OrderStatus::ALL,
    })
}

/// Move an order to another status.
#[instrument(skip(state, session, _admin, form))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    Path(order_number): Path<String>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let Some(status) = form
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<OrderStatus>().ok())
    else {
        push_flash(&session, FlashLevel::Error, "Invalid status").await;
        return Redirect::to("/admin/orders");
    };

    match OrderRepository::new(state.pool())
        .update_status(&order_number, status)
        .await
    {
        Ok(()) => {
            tracing::info!(order_number, status = %status, "order status changed");
            push_flash(
                &session,
                FlashLevel::Success,
                format!("Order {order_number} is now {}", status.label()),
            )
            .await;
        }
        Err(RepositoryError::NotFound) => {
            push_flash(&session, FlashLevel::Error, "Order not found").await;
        }
        Err(e) => flash_failure(&session, "order status update", &e).await,
    }
    Redirect::to("/admin/orders")
}
