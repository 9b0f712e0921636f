//! Integration test helpers for HackShop.
//!
//! # Running Tests
//!
//! ```bash
//! hackshop-cli reset --yes
//! cargo run -p hackshop-server
//! cargo test -p hackshop-integration-tests -- --ignored
//! ```
//!
//! The tests expect the seeded accounts (`admin`/`admin123` and
//! `alice@test.com`/`alice123`) and a server at `HACKSHOP_BASE_URL`
//! (default `http://localhost:5000`).
//!
//! Every [`client`] sends its own `X-Forwarded-For` address, so the
//! `/send_mail` limiter buckets each test separately. Raise
//! `HACKSHOP_MAIL_RATE_BURST` on the server if a single test needs more.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, redirect};
use serde_json::{Value, json};

use hackshop_server::services::crypto::encrypt_admin_password;

pub const SEED_ADMIN: (&str, &str) = ("admin", "admin123");
pub const SEED_USER_EMAIL: &str = "alice@test.com";
pub const SEED_USER_PASSWORD: &str = "alice123";

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("HACKSHOP_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A random private address for the `X-Forwarded-For` header.
fn client_address() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    format!("10.{}.{}.{}", bytes[0], bytes[1], bytes[2])
}

/// A client with its own cookie jar that does not follow redirects.
#[must_use]
pub fn client() -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&client_address()).expect("Address is a valid header"),
    );
    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Short random suffix for unique usernames and emails.
#[must_use]
pub fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Log a shopper in through the JSON API and return the reply.
pub async fn login(client: &Client, email: &str, password: &str) -> (reqwest::StatusCode, Value) {
    let resp = client
        .post(format!("{}/auth/user/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to post login");
    let status = resp.status();
    let body = resp.json().await.expect("Login reply is not JSON");
    (status, body)
}

/// A client logged in as the seeded shopper.
pub async fn shopper_client() -> Client {
    let client = client();
    let (status, body) = login(&client, SEED_USER_EMAIL, SEED_USER_PASSWORD).await;
    assert!(status.is_success(), "seed login failed: {body}");
    client
}

/// A client logged in to the back office as the seeded admin.
pub async fn admin_client() -> Client {
    let client = client();
    let (username, password) = SEED_ADMIN;
    let resp = client
        .post(format!("{}/admin/login", base_url()))
        .form(&[
            ("username", username.to_string()),
            ("password", encrypt_admin_password(password)),
        ])
        .send()
        .await
        .expect("Failed to post admin login");
    assert_eq!(
        resp.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/admin/dashboard")
    );
    client
}

/// Newest inbox mail addressed to `email`.
pub async fn latest_mail(client: &Client, email: &str) -> Option<Value> {
    let body: Value = client
        .get(format!("{}/api/mails", base_url()))
        .send()
        .await
        .expect("Failed to poll inbox")
        .json()
        .await
        .expect("Inbox reply is not JSON");

    body["mails"]
        .as_array()?
        .iter()
        .find(|mail| mail["receiver"] == email)
        .cloned()
}

/// Register a new shopper through the inbox code flow.
pub async fn register(client: &Client, username: &str, email: &str, password: &str) {
    let base_url = base_url();
    let resp = client
        .post(format!("{base_url}/send_mail"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to send code");
    assert!(resp.status().is_success());

    let mail = latest_mail(client, email)
        .await
        .expect("No verification mail");
    let code = extract_code(mail["content"].as_str().unwrap_or_default())
        .expect("No code in mail");

    let resp = client
        .post(format!("{base_url}/auth/user/register"))
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "confirm_password": password,
            "email_code": code,
        }))
        .send()
        .await
        .expect("Failed to register");
    let status = resp.status();
    let body: Value = resp.json().await.expect("Register reply is not JSON");
    assert!(status.is_success(), "register failed: {body}");
}

/// A client logged in as a freshly registered shopper.
pub async fn fresh_shopper() -> Client {
    let client = client();
    let id = unique();
    let email = format!("shopper-{id}@test.com");
    register(&client, &format!("shopper-{id}"), &email, "pass123").await;
    let (status, body) = login(&client, &email, "pass123").await;
    assert!(status.is_success(), "login failed: {body}");
    client
}

/// The caller's wallet balance as a `0.00` string.
pub async fn balance(client: &Client) -> String {
    let body: Value = client
        .get(format!("{}/user/balance", base_url()))
        .send()
        .await
        .expect("Failed to get balance")
        .json()
        .await
        .expect("Balance reply is not JSON");
    body["balance"]
        .as_str()
        .expect("Balance is not a string")
        .to_string()
}

/// Generate one voucher as admin and return its code.
pub async fn generate_voucher(admin: &Client, amount: &str) -> String {
    let resp = admin
        .post(format!("{}/admin/vouchers/generate", base_url()))
        .form(&[("amount", amount), ("count", "1")])
        .send()
        .await
        .expect("Failed to generate vouchers");
    assert!(resp.status().is_redirection());

    let html = admin
        .get(format!("{}/admin/vouchers", base_url()))
        .send()
        .await
        .expect("Failed to list vouchers")
        .text()
        .await
        .expect("Failed to read vouchers page");
    html.split("<code>")
        .nth(1)
        .and_then(|rest| rest.split("</code>").next())
        .expect("No voucher on the page")
        .to_string()
}

/// Id of the first product linked from the home page.
pub async fn first_product_id(client: &Client) -> i32 {
    let html = client
        .get(base_url())
        .send()
        .await
        .expect("Failed to get home page")
        .text()
        .await
        .expect("Failed to read home page");
    html.split("/product-detail/")
        .nth(1)
        .and_then(|rest| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .expect("No product on the home page")
}

/// The code in a verification mail.
#[must_use]
pub fn extract_code(content: &str) -> Option<String> {
    let code: String = content
        .split_once("code is ")?
        .1
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    (!code.is_empty()).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_address_is_private_ipv4() {
        let address: std::net::Ipv4Addr = client_address().parse().expect("not an IPv4 address");
        assert!(address.is_private());
        assert_ne!(client_address(), client_address());
    }

    #[test]
    fn test_extract_code() {
        assert_eq!(
            extract_code("bob123456@test.com, your verification code is 042917.").as_deref(),
            Some("042917")
        );
        assert_eq!(extract_code("no digits here"), None);
    }
}
