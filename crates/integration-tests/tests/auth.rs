//! Shopper registration, login, lockout and password reset.

use hackshop_integration_tests::{base_url, client, latest_mail, login, register, unique};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_then_login() {
    let client = client();
    let id = unique();
    let email = format!("user-{id}@test.com");
    register(&client, &format!("user-{id}"), &email, "pass123").await;

    let (status, body) = login(&client, &email, "pass123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], format!("user-{id}"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_rejects_wrong_code() {
    let id = unique();
    let resp = client()
        .post(format!("{}/auth/user/register", base_url()))
        .json(&json!({
            "username": format!("user-{id}"),
            "email": format!("user-{id}@test.com"),
            "password": "pass123",
            "confirm_password": "pass123",
            "email_code": "000000x",
        }))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_email_locks_after_five_failures() {
    let client = client();
    let id = unique();
    let email = format!("lock-{id}@test.com");
    register(&client, &format!("lock-{id}"), &email, "right").await;

    for attempt in 1..=4 {
        let (status, body) = login(&client, &email, "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["fail_count"], attempt);
    }
    let (status, _) = login(&client, &email, "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The right password no longer helps: the email itself is locked.
    let (status, body) = login(&client, &email, "right").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["lock_ttl"].as_i64().unwrap_or(0) > 0);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_reset_link_uses_request_host() {
    let client = client();
    let id = unique();
    let email = format!("reset-{id}@test.com");
    register(&client, &format!("reset-{id}"), &email, "before").await;

    let resp = client
        .post(format!("{}/auth/user/forgot-password", base_url()))
        .header("Host", "attacker.example")
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to request reset");
    assert_eq!(resp.status(), StatusCode::OK);

    let mail = latest_mail(&client, &email).await.expect("No reset mail");
    let content = mail["content"].as_str().unwrap_or_default();
    assert!(content.contains("http://attacker.example/auth/user/reset-password/"));

    let token = content
        .split("/reset-password/")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("No token in mail")
        .to_string();
    let resp = client
        .post(format!("{}/auth/user/reset-password/{token}", base_url()))
        .json(&json!({ "password": "after" }))
        .send()
        .await
        .expect("Failed to reset");
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = login(&client, &email, "after").await;
    assert_eq!(status, StatusCode::OK);
}
