//! Voucher list and generation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminLayout, PageQuery};
use crate::db::VoucherRepository;
use crate::error::Result;
use crate::extract::non_blank;
use crate::filters;
use crate::middleware::{Flashes, RequireAdmin, flash_failure, push_flash};
use crate::models::{FlashLevel, Pagination, Voucher};
use crate::services::ids::{generate_uuid_hex, parse_positive_int};
use crate::state::AppState;

const PER_PAGE: i64 = 10;
const VALID_DAYS: i64 = 365;

/// Generation form.
#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    pub amount: Option<String>,
    pub count: Option<String>,
}

/// Voucher list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/vouchers.html")]
pub struct VouchersTemplate {
    pub layout: AdminLayout,
    pub vouchers: Vec<Voucher>,
    pub pagination: Pagination,
}

/// Vouchers, newest first.
#[instrument(skip(state, admin, flashes))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Flashes(flashes): Flashes,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let (vouchers, pagination) = VoucherRepository::new(state.pool())
        .page(parse_positive_int(query.page.as_deref(), 1), PER_PAGE)
        .await?;

    Ok(VouchersTemplate {
        layout: AdminLayout::new(admin, flashes, "vouchers"),
        vouchers,
        pagination,
    })
}

/// Parse a positive voucher amount rounded to cents.
fn parse_amount(raw: Option<&str>) -> Option<Decimal> {
    non_blank(raw)?
        .parse::<Decimal>()
        .ok()
        .map(|d| d.round_dp(2))
        .filter(|d| *d > Decimal::ZERO)
}

/// Create `count` vouchers worth `amount`, valid for a year.
#[instrument(skip(state, session, _admin))]
pub async fn generate(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    Form(form): Form<GenerateForm>,
) -> Redirect {
    let Some(amount) = parse_amount(form.amount.as_deref()) else {
        push_flash(&session, FlashLevel::Error, "Please enter a voucher amount").await;
        return Redirect::to("/admin/vouchers");
    };
    let count = parse_positive_int(form.count.as_deref(), 1);
    let codes: Vec<String> = (0..count).map(|_| generate_uuid_hex()).collect();
    let expires_at = Utc::now() + Duration::days(VALID_DAYS);

    match VoucherRepository::new(state.pool())
        .create_many(&codes, amount, expires_at)
        .await
    {
        Ok(created) => {
            tracing::info!(created, %amount, "vouchers generated");
            push_flash(
                &session,
                FlashLevel::Success,
                format!("Generated {created} vouchers, ¥{amount:.2}"),
            )
            .await;
        }
        Err(e) => flash_failure(&session, "voucher generation", &e).await,
    }
    Redirect::to("/admin/vouchers")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(Some("50")), Some(Decimal::new(50, 0)));
        assert_eq!(parse_amount(Some(" 9.999 ")), Some(Decimal::new(1000, 2)));
        assert_eq!(parse_amount(Some("0")), None);
        assert_eq!(parse_amount(Some("-5")), None);
        assert_eq!(parse_amount(Some("abc")), None);
        assert_eq!(parse_amount(None), None);
    }
}
