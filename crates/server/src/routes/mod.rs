//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /product-detail/{id}           - Product detail
//! GET  /search/{query}                - Search results
//! GET  /inbox                         - Lab mail inbox (POST renders it too)
//! POST /send_mail                     - Send a verification code (rate limited)
//! GET  /api/mails                     - Inbox poll (JSON)
//! POST /api/mail/{id}/read            - Mark a mail read
//! GET  /setup                         - Setup status
//! POST /setup                         - Create admin, import catalogue
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness
//!
//! # Auth
//! GET  /auth/user/login               - Login page
//! POST /auth/user/login               - Login action
//! GET  /auth/user/logout              - Logout
//! GET  /auth/user/register            - Register page
//! POST /auth/user/register            - Register action
//! GET  /auth/user/forgot-password     - Forgot password page
//! POST /auth/user/forgot-password     - Mail a reset link
//! GET  /auth/user/reset-password/{t}  - Reset form
//! POST /auth/user/reset-password/{t}  - Set the new password
//!
//! # Cart and orders (login required)
//! GET  /order/cart                    - Cart page
//! POST /order/cart/add                - Add or increment a line
//! POST /order/cart/del                - Decrement a line
//! POST /order/cart/update             - Set a line's quantity
//! POST /order/cart/remove             - Remove a line
//! POST /order/cart/batch_remove       - Remove selected lines
//! POST /order/cart/checkout           - Create an order from selected lines
//! GET  /order/check/{order_id}        - Checkout page
//! POST /order/check/{order_id}        - Pay
//!
//! # User centre (login required)
//! GET  /user/profile                  - Profile sections
//! POST /user/profile                  - Update username or password
//! GET  /user/balance                  - Balance (JSON)
//! POST /user/voucher/redeem           - Redeem a voucher
//! GET  /user/address/list             - Addresses (JSON)
//! POST /user/address/add              - Add an address
//! POST /user/address/edit/{id}        - Edit an address
//! POST /user/address/delete/{id}      - Delete an address
//! GET  /user/order/{order_id}         - Order detail fragment
//! POST /user/favorite/{goods_id}      - Toggle a favourite
//!
//! # Back office
//! /admin/...                          - See `admin::router`
//! ```

pub mod admin;
pub mod auth;
pub mod home;
pub mod order;
pub mod user;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::MailRateConfig;
use crate::middleware::mail_rate_limiter;
use crate::state::AppState;

/// Create the shopper auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password/{token}",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the cart and order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(order::cart))
        .route("/cart/add", post(order::add))
        .route("/cart/del", post(order::decrease))
        .route("/cart/update", post(order::update))
        .route("/cart/remove", post(order::remove))
        .route("/cart/batch_remove", post(order::batch_remove))
        .route("/cart/checkout", post(order::checkout))
        .route("/check/{order_id}", get(order::check_page).post(order::pay))
}

/// Create the user centre routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(user::profile).post(user::update_profile))
        .route("/balance", get(user::balance))
        .route("/voucher/redeem", post(user::redeem_voucher))
        .route("/address/list", get(user::address_list))
        .route("/address/add", post(user::address_add))
        .route("/address/edit/{id}", post(user::address_edit))
        .route("/address/delete/{id}", post(user::address_delete))
        .route("/order/{order_id}", get(user::order_detail))
        .route("/favorite/{goods_id}", post(user::toggle_favorite))
}

/// Create all application routes.
///
/// `mail_rate` sets the `/send_mail` limiter.
pub fn routes(mail_rate: MailRateConfig) -> Router<AppState> {
    Router::new()
        // Storefront
        .route("/", get(home::index))
        .route("/product-detail/{id}", get(home::product_detail))
        .route("/search/{query}", get(home::search))
        // Lab inbox
        .route("/inbox", get(home::inbox).post(home::inbox))
        .route(
            "/send_mail",
            post(home::send_mail).layer(mail_rate_limiter(mail_rate)),
        )
        .route("/api/mails", get(home::api_mails))
        .route("/api/mail/{id}/read", post(home::mail_read))
        // Setup
        .route("/setup", get(home::setup_page).post(home::setup))
        // Health
        .route("/health", get(home::health))
        .route("/health/ready", get(home::health_ready))
        .nest("/auth/user", auth_routes())
        .nest("/order", order_routes())
        .nest("/user", user_routes())
        .nest("/admin", admin::router())
}
