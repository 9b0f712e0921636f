//! Shopper profile route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::{Environment, context};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use hackshop_core::{AddressId, GoodsId};

use crate::db::{
    AddressRepository, GoodsRepository, OrderRepository, RepositoryError, UserRepository,
    VoucherRepository,
};
use crate::error::{ApiError, ApiResult, AppError, Result};
use crate::extract::non_blank;
use crate::filters;
use crate::middleware::{CartUser, PageContext, RequireUser, flash_failure, push_flash};
use crate::models::{
    Address, AddressForm, FlashLevel, Goods, Order, OrderDetail, RedeemOutcome, User,
};
use crate::state::AppState;

/// Name used in the order detail greeting when nothing better is known.
const DEFAULT_GREETING_NAME: &str = "HackShop user";

// =============================================================================
// Profile
// =============================================================================

/// Profile tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Orders,
    Address,
    Assets,
    Info,
    Favorites,
}

impl Section {
    /// Parse a `?section=` value; anything unknown shows the orders tab.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("address") => Self::Address,
            Some("assets") => Self::Assets,
            Some("info") => Self::Info,
            Some("favorites") => Self::Favorites,
            _ => Self::Orders,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Address => "address",
            Self::Assets => "assets",
            Self::Info => "info",
            Self::Favorites => "favorites",
        }
    }
}

/// Profile query.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub section: Option<String>,
}

/// Account details form.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub section: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "user/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub user: User,
    pub section: &'static str,
    pub orders: Vec<Order>,
    pub addresses: Vec<Address>,
    pub favorites: Vec<Goods>,
}

fn profile_redirect(section: Section) -> Redirect {
    Redirect::to(&format!("/user/profile?section={}", section.as_str()))
}

/// Profile page; loads only what the selected tab shows.
#[instrument(skip(state, user, page))]
pub async fn profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<ProfileQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let section = Section::parse(query.section.as_deref());

    let mut template = ProfileTemplate {
        page,
        user,
        section: section.as_str(),
        orders: Vec::new(),
        addresses: Vec::new(),
        favorites: Vec::new(),
    };

    match section {
        Section::Orders => {
            template.orders = OrderRepository::new(state.pool())
                .list_for_user(template.user.id)
                .await?;
        }
        Section::Address => {
            template.addresses = AddressRepository::new(state.pool())
                .list_for_user(template.user.id)
                .await?;
        }
        Section::Favorites => {
            template.favorites = GoodsRepository::new(state.pool())
                .favorites(template.user.id)
                .await?;
        }
        Section::Assets | Section::Info => {}
    }

    Ok(template)
}

/// Update username and/or password from the info tab.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Query(query): Query<ProfileQuery>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let section = Section::parse(form.section.as_deref().or(query.section.as_deref()));
    if section != Section::Info {
        return profile_redirect(section).into_response();
    }

    let username = non_blank(form.username.as_deref());
    let password = non_blank(form.password.as_deref());
    if username.is_none() && password.is_none() {
        push_flash(&session, FlashLevel::Warning, "Nothing to update").await;
        return profile_redirect(section).into_response();
    }

    match UserRepository::new(state.pool())
        .update_profile(user.id, username, password)
        .await
    {
        Ok(()) => push_flash(&session, FlashLevel::Success, "Profile updated").await,
        Err(RepositoryError::Conflict(_)) => {
            push_flash(&session, FlashLevel::Error, "That username is already taken").await;
        }
        Err(e) => flash_failure(&session, "profile update", &e).await,
    }
    profile_redirect(section).into_response()
}

// =============================================================================
// Wallet
// =============================================================================

/// Wallet balance.
#[instrument(skip(user))]
pub async fn balance(CartUser(user): CartUser) -> Json<Value> {
    Json(json!({ "success": true, "balance": user.balance().plain() }))
}

/// Voucher code, from the query string or the form body.
#[derive(Debug, Default, Deserialize)]
pub struct VoucherQuery {
    pub code: Option<String>,
}

fn form_value(body: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Redeem a voucher into the caller's wallet.
///
/// The status check and the credit are separate statements.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn redeem_voucher(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    Query(query): Query<VoucherQuery>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let code = form_value(&body, "code")
        .filter(|c| !c.trim().is_empty())
        .or(query.code)
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Please enter a voucher code"))?;

    match VoucherRepository::new(state.pool())
        .redeem(&code, user.id)
        .await?
    {
        RedeemOutcome::Redeemed { amount, balance } => {
            tracing::info!(%amount, "voucher redeemed");
            Ok(Json(json!({
                "success": true,
                "message": format!("Redeemed ¥{amount:.2}"),
                "amount": format!("{amount:.2}"),
                "balance": format!("{balance:.2}"),
            })))
        }
        RedeemOutcome::NotFound => Err(ApiError::not_found("Voucher code not found")),
        RedeemOutcome::AlreadyUsed => Err(ApiError::conflict("This voucher has already been used")),
        RedeemOutcome::Expired => Err(ApiError::bad_request("This voucher has expired")),
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// The caller's addresses as JSON.
#[instrument(skip(state, user))]
pub async fn address_list(
    State(state): State<AppState>,
    CartUser(user): CartUser,
) -> ApiResult<Json<Value>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(json!({ "success": true, "addresses": addresses })))
}

const ADDRESS_REQUIRED: &str = "Please fill in receiver, phone and address";

/// Add an address for the caller.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn address_add(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<AddressForm>,
) -> Redirect {
    let Some(form) = form.validated() else {
        push_flash(&session, FlashLevel::Error, ADDRESS_REQUIRED).await;
        return profile_redirect(Section::Address);
    };

    match AddressRepository::new(state.pool()).create(user.id, &form).await {
        Ok(_) => push_flash(&session, FlashLevel::Success, "Address added").await,
        Err(e) => flash_failure(&session, "address create", &e).await,
    }
    profile_redirect(Section::Address)
}

/// Edit an address by id.
#[instrument(skip(state, session, _user, form))]
pub async fn address_edit(
    State(state): State<AppState>,
    session: Session,
    RequireUser(_user): RequireUser,
    Path(id): Path<i32>,
    Form(form): Form<AddressForm>,
) -> Redirect {
    let Some(form) = form.validated() else {
        push_flash(&session, FlashLevel::Error, ADDRESS_REQUIRED).await;
        return profile_redirect(Section::Address);
    };

    let repo = AddressRepository::new(state.pool());
    let id = AddressId::new(id);
    match repo.get(id).await {
        Ok(Some(_)) => match repo.update(id, &form).await {
            Ok(()) => push_flash(&session, FlashLevel::Success, "Address updated").await,
            Err(e) => flash_failure(&session, "address update", &e).await,
        },
        Ok(None) => push_flash(&session, FlashLevel::Error, "Address not found").await,
        Err(e) => flash_failure(&session, "address lookup", &e).await,
    }
    profile_redirect(Section::Address)
}

/// Delete an address by id.
#[instrument(skip(state, session, _user))]
pub async fn address_delete(
    State(state): State<AppState>,
    session: Session,
    RequireUser(_user): RequireUser,
    Path(id): Path<i32>,
) -> Redirect {
    let repo = AddressRepository::new(state.pool());
    let id = AddressId::new(id);
    match repo.get(id).await {
        Ok(Some(_)) => match repo.delete(id).await {
            Ok(()) => push_flash(&session, FlashLevel::Success, "Address deleted").await,
            Err(e) => flash_failure(&session, "address delete", &e).await,
        },
        Ok(None) => push_flash(&session, FlashLevel::Error, "Address not found").await,
        Err(e) => flash_failure(&session, "address lookup", &e).await,
    }
    profile_redirect(Section::Address)
}

// =============================================================================
// Favourites
// =============================================================================

/// Add or remove a favourite.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    Path(goods_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let repo = GoodsRepository::new(state.pool());
    let goods_id = GoodsId::new(goods_id);
    if repo.get(goods_id).await?.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    let favorited = repo.toggle_favorite(user.id, goods_id).await?;
    Ok(Json(json!({ "success": true, "favorited": favorited })))
}

// =============================================================================
// Order detail fragment
// =============================================================================

/// Order detail query.
#[derive(Debug, Deserialize)]
pub struct OrderDetailQuery {
    pub username: Option<String>,
}

const ORDER_DETAIL_HEAD: &str = r#"<div class="order-modal">
  <div class="order-modal-header">
    <h3>Order {{ order.id }}</h3>
    <p class="order-greeting">Hello, "#;

const ORDER_DETAIL_BODY: &str = r#"</p>
  </div>
  <table class="order-modal-items">
    <thead><tr><th>Product</th><th>Price</th><th>Qty</th></tr></thead>
    <tbody>
    {% for p in order.products %}
      <tr><td>{{ p.name }}</td><td>¥{{ p.price }}</td><td>{{ p.quantity }}</td></tr>
    {% endfor %}
    </tbody>
  </table>
  <dl class="order-modal-meta">
    <dt>Total</dt><dd>¥{{ order.total }}</dd>
    <dt>Placed</dt><dd>{{ order.date }}</dd>
    <dt>Ship to</dt><dd>{% if order.shipping_info %}{{ order.shipping_info }}{% else %}No address selected{% endif %}</dd>
  </dl>
</div>
"#;

/// Build the fragment's template source around the greeting name.
///
/// The name becomes part of the template itself, not a value passed to it.
#[must_use]
pub fn order_detail_source(name: &str) -> String {
    [ORDER_DETAIL_HEAD, name, ORDER_DETAIL_BODY].concat()
}

/// Render the fragment for an already-loaded order.
///
/// # Errors
///
/// Returns the template error when the source does not parse or render.
pub fn render_order_detail(
    name: &str,
    order: &OrderDetail,
) -> std::result::Result<String, minijinja::Error> {
    let env = Environment::new();
    env.render_str(&order_detail_source(name), context! { order => order })
}

/// Order detail modal fragment.
///
/// The lookup concatenates the path segment into SQL; the greeting name is
/// spliced into the template source.
#[instrument(skip(state, user))]
pub async fn order_detail(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<String>,
    Query(query): Query<OrderDetailQuery>,
) -> Result<Response> {
    let rows = OrderRepository::new(state.pool())
        .detail_rows_raw(&order_id)
        .await?;
    let detail =
        OrderDetail::from_rows(rows).ok_or_else(|| AppError::NotFound("Order".to_owned()))?;

    let name = query
        .username
        .filter(|n| !n.is_empty())
        .or_else(|| Some(user.username.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| DEFAULT_GREETING_NAME.to_owned());

    match render_order_detail(&name, &detail) {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "order detail template failed");
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(e.to_string())).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::models::DetailProduct;

    use super::*;

    fn detail() -> OrderDetail {
        OrderDetail {
            id: "202610190000000001123456".into(),
            products: vec![DetailProduct {
                name: "Mug".into(),
                price: "12.50".into(),
                quantity: "2".into(),
            }],
            total: "25.00".into(),
            date: "2026-10-19".into(),
            shipping_info: String::new(),
        }
    }

    #[test]
    fn test_section_parse_defaults_to_orders() {
        assert_eq!(Section::parse(None), Section::Orders);
        assert_eq!(Section::parse(Some("bogus")), Section::Orders);
        assert_eq!(Section::parse(Some("favorites")), Section::Favorites);
        assert_eq!(Section::parse(Some("info")).as_str(), "info");
    }

    #[test]
    fn test_order_detail_renders_products() {
        let html = render_order_detail("alice", &detail()).unwrap();
        assert!(html.contains("Hello, alice"));
        assert!(html.contains("<td>Mug</td>"));
        assert!(html.contains("No address selected"));
    }

    #[test]
    fn test_greeting_name_is_evaluated_as_template() {
        let html = render_order_detail("{{ 7 * 7 }}", &detail()).unwrap();
        assert!(html.contains("Hello, 49"));
    }

    #[test]
    fn test_voucher_code_from_form_body() {
        assert_eq!(form_value(b"code=abc&x=1", "code").as_deref(), Some("abc"));
        assert_eq!(form_value(b"", "code"), None);
    }
}
