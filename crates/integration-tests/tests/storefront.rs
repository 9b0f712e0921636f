//! Storefront pages, the inbox and health checks.
//!
//! These tests require:
//! - A migrated and seeded database (`hackshop-cli reset --yes`)
//! - The server running (`cargo run -p hackshop-server`)

use hackshop_integration_tests::{base_url, client};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health_endpoints() {
    let client = client();
    let base_url = base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to get /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to get /health/ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_home_lists_seeded_product() {
    let resp = client()
        .get(base_url())
        .send()
        .await
        .expect("Failed to get home page");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Demo Product"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_missing_product_is_404() {
    let resp = client()
        .get(format!("{}/product-detail/999999", base_url()))
        .send()
        .await
        .expect("Failed to get product");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_search_echoes_escaped_query() {
    let resp = client()
        .get(format!("{}/search/%3Cb%3Edemo%3C%2Fb%3E", base_url()))
        .send()
        .await
        .expect("Failed to search");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("&#60;b&#62;demo"));
    assert!(!body.contains("<b>demo"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_send_mail_requires_email() {
    let resp = client()
        .post(format!("{}/send_mail", base_url()))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to post send_mail");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Reply is not JSON");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_mail_read_unknown_is_404() {
    let resp = client()
        .post(format!("{}/api/mail/999999/read", base_url()))
        .json(&json!({ "is_read": true }))
        .send()
        .await
        .expect("Failed to mark mail read");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_setup_page_reports_state() {
    let resp = client()
        .get(format!("{}/setup", base_url()))
        .send()
        .await
        .expect("Failed to get setup");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Catalogue file"));
}
