//! Cart and order route handlers.
//!
//! The cart endpoints are JSON (called from `cart.js`); checkout and payment
//! are server-rendered pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use hackshop_core::{AddressId, CartItemId, GoodsId, OrderStatus, Price, UserId};

use crate::db::{AddressRepository, CartRepository, GoodsRepository, OrderRepository};
use crate::error::{ApiError, ApiResult, AppError, Result};
use crate::extract::JsonOrForm;
use crate::filters;
use crate::middleware::{CartUser, PageContext, RequireUser};
use crate::models::{Address, CartLine, Order, OrderLine, PaymentOutcome, User};
use crate::services::ids::{generate_order_number, parse_positive_int};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Add to cart body.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub goods_id: i32,
    /// Number or numeric string; see [`cart_quantity`].
    pub quantity: Option<Value>,
    #[serde(default)]
    pub check_exists: bool,
}

/// Decrease quantity body.
#[derive(Debug, Deserialize)]
pub struct DecreaseForm {
    pub goods_id: i32,
    pub quantity: Option<Value>,
}

/// Set quantity body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: i32,
    pub quantity: Option<Value>,
}

/// Remove one row body.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub item_id: i32,
}

/// Body carrying a selection of cart rows.
#[derive(Debug, Deserialize)]
pub struct ItemIdsForm {
    #[serde(default)]
    pub item_ids: Vec<i32>,
}

impl ItemIdsForm {
    fn ids(&self) -> Vec<CartItemId> {
        self.item_ids.iter().copied().map(CartItemId::new).collect()
    }
}

/// A requested cart quantity.
///
/// Missing, unparsable, non-positive and out-of-range values all become 1.
fn cart_quantity(raw: Option<&Value>) -> i32 {
    let text = match raw {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return 1,
    };
    i32::try_from(parse_positive_int(Some(text.as_str()), 1)).unwrap_or(1)
}

/// `current + quantity`, if the product has that much stock.
fn raised_quantity(current: i32, quantity: i32, stock: i32) -> ApiResult<i32> {
    current
        .checked_add(quantity)
        .filter(|total| *total <= stock)
        .ok_or_else(|| ApiError::bad_request("Insufficient stock"))
}

/// `current - quantity`, floored at 1.
fn lowered_quantity(current: i32, quantity: i32) -> i32 {
    current.saturating_sub(quantity).max(1)
}

/// Payment form.
#[derive(Debug, Deserialize)]
pub struct PayForm {
    pub address_id: Option<String>,
    pub payment_method: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/cart.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub lines: Vec<CartLine>,
    pub total: Price,
}

/// Order confirmation and payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/checkout.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub addresses: Vec<Address>,
    pub balance: Price,
    pub error: Option<String>,
}

/// Payment success page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/success.html")]
pub struct SuccessTemplate {
    pub page: PageContext,
    pub order_number: String,
    pub total: Price,
}

// =============================================================================
// Cart
// =============================================================================

fn cart_total(lines: &[CartLine]) -> Price {
    Price::new(
        lines
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum(),
    )
}

async fn cart_count(state: &AppState, user_id: UserId) -> ApiResult<i64> {
    Ok(CartRepository::new(state.pool())
        .count_for_user(user_id)
        .await?)
}

/// Cart page.
#[instrument(skip(state, user, page))]
pub async fn cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let lines = CartRepository::new(state.pool())
        .lines_for_user(user.id)
        .await?;
    let total = cart_total(&lines);
    Ok(CartTemplate { page, lines, total })
}

/// Add a product, accumulating onto an existing row.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    JsonOrForm(form): JsonOrForm<AddToCartForm>,
) -> ApiResult<Json<Value>> {
    let quantity = cart_quantity(form.quantity.as_ref());

    let goods_id = GoodsId::new(form.goods_id);
    let goods = GoodsRepository::new(state.pool())
        .get(goods_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let cart = CartRepository::new(state.pool());
    let existing = cart.find(user.id, goods_id).await?;

    // Stock is checked before the duplicate flag
    let current = existing.as_ref().map_or(0, |row| row.quantity);
    let new_quantity = raised_quantity(current, quantity, goods.stock)?;

    if form.check_exists && existing.is_some() {
        return Ok(Json(json!({
            "success": false,
            "code": "ALREADY_EXISTS",
            "message": "This product is already in your cart",
        })));
    }

    match existing {
        Some(row) => cart.set_quantity(row.id, new_quantity).await?,
        None => {
            cart.insert(user.id, goods_id, quantity).await?;
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "Added to cart",
        "quantity": new_quantity,
        "cart_count": cart_count(&state, user.id).await?,
    })))
}

/// Lower a row's quantity, never below 1.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn decrease(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    JsonOrForm(form): JsonOrForm<DecreaseForm>,
) -> ApiResult<Json<Value>> {
    let cart = CartRepository::new(state.pool());
    let row = cart
        .find(user.id, GoodsId::new(form.goods_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Item not in cart"))?;

    let new_quantity = lowered_quantity(row.quantity, cart_quantity(form.quantity.as_ref()));
    cart.set_quantity(row.id, new_quantity).await?;

    Ok(Json(json!({
        "success": true,
        "quantity": new_quantity,
        "cart_count": cart_count(&state, user.id).await?,
    })))
}

/// Set a row's quantity after a stock check.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    JsonOrForm(form): JsonOrForm<UpdateCartForm>,
) -> ApiResult<Json<Value>> {
    let quantity = form
        .quantity
        .as_ref()
        .map(|raw| cart_quantity(Some(raw)))
        .ok_or_else(|| ApiError::bad_request("Missing parameters"))?;

    let cart = CartRepository::new(state.pool());
    let row = cart
        .get_owned(CartItemId::new(form.item_id), user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not in cart"))?;

    let goods = GoodsRepository::new(state.pool())
        .get(row.goods_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let quantity = raised_quantity(0, quantity, goods.stock)?;

    cart.set_quantity(row.id, quantity).await?;
    let lines = cart.lines_for_user(user.id).await?;
    let item_subtotal = goods.price * Decimal::from(quantity);

    Ok(Json(json!({
        "success": true,
        "quantity": quantity,
        "item_subtotal": Price::new(item_subtotal).plain(),
        "cart_total": cart_total(&lines).plain(),
    })))
}

/// Remove one of the caller's rows.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    JsonOrForm(form): JsonOrForm<RemoveForm>,
) -> ApiResult<Json<Value>> {
    CartRepository::new(state.pool())
        .delete_many(user.id, &[CartItemId::new(form.item_id)])
        .await?;

    Ok(Json(json!({
        "success": true,
        "cart_count": cart_count(&state, user.id).await?,
    })))
}

/// Remove several of the caller's rows.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn batch_remove(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    Json(form): Json<ItemIdsForm>,
) -> ApiResult<Json<Value>> {
    if form.item_ids.is_empty() {
        return Err(ApiError::bad_request("Please select items"));
    }

    let removed = CartRepository::new(state.pool())
        .delete_many(user.id, &form.ids())
        .await?;

    Ok(Json(json!({
        "success": true,
        "removed": removed,
        "cart_count": cart_count(&state, user.id).await?,
    })))
}

/// Turn the selected rows into a pending order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    CartUser(user): CartUser,
    Json(form): Json<ItemIdsForm>,
) -> ApiResult<Json<Value>> {
    if form.item_ids.is_empty() {
        return Err(ApiError::bad_request("Please select items"));
    }

    let lines = CartRepository::new(state.pool())
        .selected_lines(user.id, &form.ids())
        .await?;
    if lines.is_empty() {
        return Err(ApiError::bad_request("Selected items are no longer in your cart"));
    }

    let order_id = OrderRepository::new(state.pool())
        .create_from_cart(user.id, &generate_order_number(user.id), &lines)
        .await?;

    tracing::info!(order_id = %order_id, lines = lines.len(), "order created");
    Ok(Json(json!({
        "success": true,
        "order_id": order_id,
        "redirect": format!("/order/check/{order_id}"),
    })))
}

// =============================================================================
// Payment
// =============================================================================

async fn checkout_page(
    state: &AppState,
    page: PageContext,
    order: Order,
    user: &User,
    error: Option<String>,
) -> Result<CheckoutTemplate> {
    let lines = OrderRepository::new(state.pool()).lines(&order.id).await?;
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(CheckoutTemplate {
        page,
        order,
        lines,
        addresses,
        balance: user.balance(),
        error,
    })
}

/// Order confirmation page, scoped to the caller.
#[instrument(skip(state, user, page))]
pub async fn check_page(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    RequireUser(user): RequireUser,
    page: PageContext,
) -> Result<Response> {
    let order = OrderRepository::new(state.pool())
        .get_owned(&order_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))?;

    Ok(checkout_page(&state, page, order, &user, None)
        .await?
        .into_response())
}

/// Pay for an order.
///
/// The order is looked up by id alone and the caller's wallet is charged,
/// whoever placed it. A short balance or stock re-renders the order page
/// with the reason.
#[instrument(skip(state, user, page, form), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    RequireUser(user): RequireUser,
    page: PageContext,
    Form(form): Form<PayForm>,
) -> Result<Response> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))?;

    if order.payment_status != OrderStatus::Pending {
        return Err(AppError::BadRequest("This order is not awaiting payment".to_owned()));
    }

    let address_id = form
        .address_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .map(AddressId::new);
    let method = form
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("balance");

    let error = match orders.pay(&order, user.id, address_id, method).await? {
        PaymentOutcome::Paid { total } => {
            tracing::info!(order_id = %order.id, %total, "order paid");
            return Ok(SuccessTemplate {
                page,
                order_number: order.order_number,
                total: Price::new(total),
            }
            .into_response());
        }
        PaymentOutcome::InsufficientBalance => "Insufficient balance".to_owned(),
        PaymentOutcome::InsufficientStock { goodsname } => {
            format!("Insufficient stock for {goodsname}")
        }
    };

    tracing::info!(order_id = %order.id, reason = %error, "payment refused");
    Ok(checkout_page(&state, page, order, &user, Some(error))
        .await?
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32) -> CartLine {
        CartLine {
            id: CartItemId::new(1),
            goods_id: GoodsId::new(1),
            quantity,
            goodsname: "Mug".into(),
            mainimg: String::new(),
            price: Decimal::new(price, 2),
            stock: 10,
        }
    }

    #[test]
    fn test_cart_total_sums_lines() {
        let total = cart_total(&[line(1000, 2), line(250, 3)]);
        assert_eq!(total.to_string(), "¥27.50");
    }

    #[test]
    fn test_cart_quantity_falls_back_to_one() {
        assert_eq!(cart_quantity(Some(&json!(3))), 3);
        assert_eq!(cart_quantity(Some(&json!("4"))), 4);
        assert_eq!(cart_quantity(Some(&json!(-500))), 1);
        assert_eq!(cart_quantity(Some(&json!(0))), 1);
        assert_eq!(cart_quantity(Some(&json!("abc"))), 1);
        assert_eq!(cart_quantity(Some(&json!(i64::from(i32::MAX) + 1))), 1);
        assert_eq!(cart_quantity(None), 1);
    }

    #[test]
    fn test_raised_quantity_checks_stock_and_overflow() {
        assert_eq!(raised_quantity(2, 3, 5).unwrap(), 5);
        assert!(raised_quantity(2, 4, 5).is_err());
        assert!(raised_quantity(1, i32::MAX, i32::MAX).is_err());
        assert_eq!(
            raised_quantity(0, 101, 100).unwrap_err().message(),
            "Insufficient stock"
        );
    }

    #[test]
    fn test_lowered_quantity_floors_at_one() {
        assert_eq!(lowered_quantity(5, 2), 3);
        assert_eq!(lowered_quantity(2, 5), 1);
        assert_eq!(lowered_quantity(2, cart_quantity(Some(&json!(-500)))), 1);
        assert_eq!(lowered_quantity(1, i32::MAX), 1);
    }

    #[test]
    fn test_update_form_accepts_string_quantity() {
        let form: UpdateCartForm = serde_json::from_str(r#"{"item_id": 7, "quantity": "2"}"#).unwrap();
        assert_eq!(cart_quantity(form.quantity.as_ref()), 2);
        let form: UpdateCartForm = serde_json::from_str(r#"{"item_id": 7}"#).unwrap();
        assert!(form.quantity.is_none());
    }

    #[test]
    fn test_item_ids_form_accepts_missing_list() {
        let form: ItemIdsForm = serde_json::from_str("{}").unwrap();
        assert!(form.ids().is_empty());
    }
}
