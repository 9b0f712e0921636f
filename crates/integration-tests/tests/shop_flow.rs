//! Cart, checkout, payment and wallet flows for a logged-in shopper.

use hackshop_integration_tests::{
    balance, base_url, client, first_product_id, fresh_shopper, shopper_client,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn add_to_cart(client: &Client, goods_id: i32, quantity: i32) -> Value {
    client
        .post(format!("{}/order/cart/add", base_url()))
        .json(&json!({ "goods_id": goods_id, "quantity": quantity }))
        .send()
        .await
        .expect("Failed to add to cart")
        .json()
        .await
        .expect("Reply is not JSON")
}

async fn post_json(client: &Client, path: &str, body: &Value) -> (StatusCode, Value) {
    let resp = client
        .post(format!("{}{path}", base_url()))
        .json(body)
        .send()
        .await
        .expect("Failed to post");
    let status = resp.status();
    (status, resp.json().await.expect("Reply is not JSON"))
}

/// Id of the first row on the cart page.
async fn first_cart_item(client: &Client) -> i32 {
    let html = client
        .get(format!("{}/order/cart", base_url()))
        .send()
        .await
        .expect("Failed to get cart")
        .text()
        .await
        .expect("Failed to read cart");
    html.split("data-item-id=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .and_then(|id| id.parse().ok())
        .expect("No cart row on the page")
}

/// Put one product in the cart and check it out; returns the order id.
async fn place_order(client: &Client) -> String {
    let goods_id = first_product_id(client).await;
    let added = add_to_cart(client, goods_id, 1).await;
    assert_eq!(added["success"], true, "add failed: {added}");
    let item_id = first_cart_item(client).await;

    let resp = client
        .post(format!("{}/order/cart/checkout", base_url()))
        .json(&json!({ "item_ids": [item_id] }))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Reply is not JSON");
    body["order_id"]
        .as_str()
        .map(str::to_string)
        .or_else(|| body["order_id"].as_i64().map(|id| id.to_string()))
        .expect("No order id")
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_requires_login_for_json() {
    let resp = client()
        .post(format!("{}/order/cart/add", base_url()))
        .json(&json!({ "goods_id": 1 }))
        .send()
        .await
        .expect("Failed to add to cart");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Reply is not JSON");
    assert_eq!(body["redirect"], "/auth/user/login");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_add_accumulates_quantity() {
    let client = fresh_shopper().await;
    let goods_id = first_product_id(&client).await;

    let first = add_to_cart(&client, goods_id, 1).await;
    assert_eq!(first["quantity"], 1);
    let second = add_to_cart(&client, goods_id, 2).await;
    assert_eq!(second["quantity"], 3);
    assert_eq!(second["cart_count"], 1);

    let resp = client
        .post(format!("{}/order/cart/add", base_url()))
        .json(&json!({ "goods_id": goods_id, "check_exists": true }))
        .send()
        .await
        .expect("Failed to add to cart");
    let body: Value = resp.json().await.expect("Reply is not JSON");
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_checkout_with_no_selection_is_rejected() {
    let client = fresh_shopper().await;
    let resp = client
        .post(format!("{}/order/cart/checkout", base_url()))
        .json(&json!({ "item_ids": [] }))
        .send()
        .await
        .expect("Failed to check out");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_checkout_and_pay_from_balance() {
    let client = shopper_client().await;
    let order_id = place_order(&client).await;

    let resp = client
        .get(format!("{}/order/check/{order_id}", base_url()))
        .send()
        .await
        .expect("Failed to get checkout page");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/order/check/{order_id}", base_url()))
        .form(&[("payment_method", "balance")])
        .send()
        .await
        .expect("Failed to pay");
    assert_eq!(resp.status(), StatusCode::OK);

    // Paying twice is refused.
    let resp = client
        .post(format!("{}/order/check/{order_id}", base_url()))
        .form(&[("payment_method", "balance")])
        .send()
        .await
        .expect("Failed to pay");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_new_shopper_cannot_afford_order() {
    let client = fresh_shopper().await;
    let order_id = place_order(&client).await;

    let resp = client
        .post(format!("{}/order/check/{order_id}", base_url()))
        .form(&[("payment_method", "balance")])
        .send()
        .await
        .expect("Failed to pay");
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.expect("Failed to read checkout page");
    assert!(html.contains("Insufficient balance"));

    assert_eq!(balance(&client).await, "0.00");
    let html = client
        .get(format!("{}/order/check/{order_id}", base_url()))
        .send()
        .await
        .expect("Failed to get checkout page")
        .text()
        .await
        .expect("Failed to read checkout page");
    assert!(html.contains("Pending payment"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_decrease_never_goes_below_one() {
    let client = fresh_shopper().await;
    let goods_id = first_product_id(&client).await;
    let added = add_to_cart(&client, goods_id, 2).await;
    assert_eq!(added["quantity"], 2);

    // Negative and non-numeric amounts count as one.
    let (status, body) = post_json(
        &client,
        "/order/cart/del",
        &json!({ "goods_id": goods_id, "quantity": -500 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 1);

    let (_, body) = post_json(
        &client,
        "/order/cart/del",
        &json!({ "goods_id": goods_id, "quantity": "lots" }),
    )
    .await;
    assert_eq!(body["quantity"], 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_add_beyond_stock_is_rejected() {
    let client = fresh_shopper().await;
    let goods_id = first_product_id(&client).await;

    for quantity in [1_000_000_000, i32::MAX] {
        let (status, body) = post_json(
            &client,
            "/order/cart/add",
            &json!({ "goods_id": goods_id, "quantity": quantity }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{quantity}");
        assert_eq!(body["message"], "Insufficient stock");
    }

    // An existing row cannot be pushed past stock or overflow either.
    let added = add_to_cart(&client, goods_id, 1).await;
    assert_eq!(added["success"], true);
    let (status, _) = post_json(
        &client,
        "/order/cart/add",
        &json!({ "goods_id": goods_id, "quantity": i32::MAX }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let again = add_to_cart(&client, goods_id, 1).await;
    assert_eq!(again["quantity"], 2);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_update_beyond_stock_is_rejected() {
    let client = fresh_shopper().await;
    let goods_id = first_product_id(&client).await;
    add_to_cart(&client, goods_id, 1).await;
    let item_id = first_cart_item(&client).await;

    let (status, body) = post_json(
        &client,
        "/order/cart/update",
        &json!({ "item_id": item_id, "quantity": "1000000000" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient stock");

    let (status, _) = post_json(&client, "/order/cart/update", &json!({ "item_id": item_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &client,
        "/order/cart/update",
        &json!({ "item_id": item_id, "quantity": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 2);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_voucher_is_404() {
    let client = fresh_shopper().await;
    let resp = client
        .post(format!("{}/user/voucher/redeem?code=NOPE-NOT-A-CODE", base_url()))
        .send()
        .await
        .expect("Failed to redeem");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_balance_reports_wallet() {
    let client = shopper_client().await;
    let body: Value = client
        .get(format!("{}/user/balance", base_url()))
        .send()
        .await
        .expect("Failed to get balance")
        .json()
        .await
        .expect("Reply is not JSON");

    assert_eq!(body["success"], true);
    assert!(body["balance"].is_string() || body["balance"].is_number());
}
