//! Back office login, pages, voucher generation and batch import.

use hackshop_integration_tests::{admin_client, base_url, client, fresh_shopper, generate_voucher};
use reqwest::StatusCode;
use serde_json::Value;

use hackshop_server::services::crypto::encrypt_admin_password;

fn location(resp: &reqwest::Response) -> Option<&str> {
    resp.headers().get("location").and_then(|v| v.to_str().ok())
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_pages_redirect_anonymous() {
    let resp = client()
        .get(format!("{}/admin/dashboard", base_url()))
        .send()
        .await
        .expect("Failed to get dashboard");

    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), Some("/admin/login"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_login_rejects_plaintext_password() {
    let resp = client()
        .post(format!("{}/admin/login", base_url()))
        .form(&[("username", "admin"), ("password", "admin123")])
        .send()
        .await
        .expect("Failed to post admin login");

    assert_eq!(location(&resp), Some("/admin/login"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_login_rejects_wrong_password() {
    let resp = client()
        .post(format!("{}/admin/login", base_url()))
        .form(&[
            ("username", "admin".to_string()),
            ("password", encrypt_admin_password("not-the-password")),
        ])
        .send()
        .await
        .expect("Failed to post admin login");

    assert_eq!(location(&resp), Some("/admin/login"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_pages_render() {
    let client = admin_client().await;
    for path in [
        "/admin/dashboard",
        "/admin/users",
        "/admin/settings",
        "/admin/products",
        "/admin/orders?status=paid",
        "/admin/vouchers",
    ] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to get admin page");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_generated_voucher_redeems_once() {
    let admin = admin_client().await;
    let code = generate_voucher(&admin, "12.50").await;

    let shopper = fresh_shopper().await;
    let redeem = |code: String| {
        let shopper = shopper.clone();
        async move {
            shopper
                .post(format!("{}/user/voucher/redeem", base_url()))
                .form(&[("code", code)])
                .send()
                .await
                .expect("Failed to redeem")
        }
    };

    let resp = redeem(code.clone()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Reply is not JSON");
    assert_eq!(body["amount"], "12.50");
    assert_eq!(body["balance"], "12.50");

    let resp = redeem(code).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_batch_template_is_xlsx() {
    let resp = admin_client()
        .await
        .get(format!("{}/admin/products/batch/template", base_url()))
        .send()
        .await
        .expect("Failed to download template");

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("spreadsheetml"));
    let bytes = resp.bytes().await.expect("Failed to read template");
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_batch_import_requires_url() {
    let resp = admin_client()
        .await
        .post(format!("{}/admin/products/batch/import", base_url()))
        .form(&[("url", "")])
        .send()
        .await
        .expect("Failed to post import");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Reply is not JSON");
    assert_eq!(body["success"], false);
}
