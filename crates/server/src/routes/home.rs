//! Storefront pages, the lab inbox and one-shot setup.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use hackshop_core::{GoodsId, MailId};

use crate::db::{AdminRepository, GoodsRepository, MailRepository};
use crate::error::{ApiError, ApiResult, AppError, Result};
use crate::extract::{JsonOrForm, non_blank, request_host};
use crate::filters;
use crate::middleware::{PageContext, push_flash};
use crate::models::{FlashLevel, FlashMessage, Goods, GoodsImage, GoodsSpec, MailView};
use crate::services::auth::AuthService;
use crate::services::ids::is_truthy;
use crate::services::setup::{
    DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, SetupState, load_catalogue, run_setup,
};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "main/index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub goods: Vec<Goods>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "main/product_detail.html")]
pub struct ProductDetailTemplate {
    pub page: PageContext,
    pub goods: Goods,
    pub images: Vec<GoodsImage>,
    pub specs: Vec<GoodsSpec>,
}

/// Search results template.
#[derive(Template, WebTemplate)]
#[template(path = "main/search.html")]
pub struct SearchTemplate {
    pub page: PageContext,
    pub query: String,
    pub goods: Vec<Goods>,
}

/// Lab inbox template.
#[derive(Template, WebTemplate)]
#[template(path = "main/inbox.html")]
pub struct InboxTemplate {
    pub page: PageContext,
    pub mails: Vec<MailView>,
}

/// Setup page template.
#[derive(Template, WebTemplate)]
#[template(path = "main/setup.html")]
pub struct SetupTemplate {
    pub page: PageContext,
    pub state: SetupState,
    pub goods_count: i64,
    pub has_admin: bool,
    pub default_username: &'static str,
    pub default_password: &'static str,
}

// =============================================================================
// Storefront
// =============================================================================

/// Home page: every product on sale.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> Result<impl IntoResponse> {
    let goods = GoodsRepository::new(state.pool()).list_on_sale().await?;
    Ok(IndexTemplate { page, goods })
}

/// Product detail page.
#[instrument(skip(state, page))]
pub async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let repo = GoodsRepository::new(state.pool());
    let id = GoodsId::new(id);
    let goods = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;
    let images = repo.images(id).await?;
    let specs = repo.specs(id).await?;

    Ok(ProductDetailTemplate {
        page,
        goods,
        images,
        specs,
    })
}

/// Search page: echoes the query and lists matching products.
#[instrument(skip(state, page))]
pub async fn search(
    State(state): State<AppState>,
    Path(query): Path<String>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let goods = match non_blank(Some(query.as_str())) {
        Some(term) => GoodsRepository::new(state.pool()).search_on_sale(term).await?,
        None => Vec::new(),
    };
    Ok(SearchTemplate { page, query, goods })
}

// =============================================================================
// Lab inbox
// =============================================================================

/// Every captured mail, newest first.
#[instrument(skip(state, page))]
pub async fn inbox(State(state): State<AppState>, page: PageContext) -> Result<impl IntoResponse> {
    let mails = MailRepository::new(state.pool())
        .list(None)
        .await?
        .into_iter()
        .map(MailView::from)
        .collect();
    Ok(InboxTemplate { page, mails })
}

/// Verification code request body.
#[derive(Debug, Deserialize)]
pub struct SendMailForm {
    pub email: Option<String>,
}

/// Generate a verification code and drop it in the inbox.
#[instrument(skip(state, form))]
pub async fn send_mail(
    State(state): State<AppState>,
    JsonOrForm(form): JsonOrForm<SendMailForm>,
) -> ApiResult<Json<Value>> {
    let email = non_blank(form.email.as_deref())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    AuthService::new(state.pool(), state.store())
        .send_mail_code(email)
        .await?;

    tracing::info!(email, "verification code sent");
    Ok(Json(json!({
        "success": true,
        "message": "Verification code sent, check the inbox",
        "email": email,
    })))
}

/// Mail polling query.
#[derive(Debug, Deserialize)]
pub struct MailsQuery {
    pub since_id: Option<i32>,
}

/// Mails as JSON for the inbox poller.
#[instrument(skip(state))]
pub async fn api_mails(
    State(state): State<AppState>,
    Query(query): Query<MailsQuery>,
) -> ApiResult<Json<Value>> {
    let mails: Vec<MailView> = MailRepository::new(state.pool())
        .list(query.since_id)
        .await?
        .into_iter()
        .map(MailView::from)
        .collect();
    Ok(Json(json!({ "success": true, "mails": mails })))
}

/// Read flag update body.
#[derive(Debug, Default, Deserialize)]
pub struct MailReadBody {
    pub is_read: Option<bool>,
}

/// Mark a mail read (or unread).
#[instrument(skip(state, body))]
pub async fn mail_read(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<MailReadBody>>,
) -> ApiResult<Json<Value>> {
    let is_read = body.and_then(|Json(b)| b.is_read).unwrap_or(true);
    MailRepository::new(state.pool())
        .set_read(MailId::new(id), is_read)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => ApiError::not_found("Mail not found"),
            other => ApiError::from(other),
        })?;
    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// Setup
// =============================================================================

const ALREADY_INITIALISED: &str = "The lab is already initialised";

/// Setup form.
#[derive(Debug, Deserialize)]
pub struct SetupForm {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub init_products: Option<String>,
}

async fn render_setup(
    state: &AppState,
    page: PageContext,
    setup: SetupState,
) -> Result<SetupTemplate> {
    let goods_count = GoodsRepository::new(state.pool()).count().await?;
    let has_admin = AdminRepository::new(state.pool()).count().await? > 0;

    Ok(SetupTemplate {
        page,
        state: setup,
        goods_count,
        has_admin,
        default_username: DEFAULT_ADMIN_USERNAME,
        default_password: DEFAULT_ADMIN_PASSWORD,
    })
}

/// Setup status page.
#[instrument(skip(state, page))]
pub async fn setup_page(
    State(state): State<AppState>,
    mut page: PageContext,
) -> Result<impl IntoResponse> {
    let config = state.config();
    let setup = SetupState::probe(&config.product_json, &config.setup_lock_path()).await;
    if setup.is_locked {
        page.flashes.push(FlashMessage {
            level: FlashLevel::Info,
            message: ALREADY_INITIALISED.to_owned(),
        });
    }
    render_setup(&state, page, setup).await
}

/// Create the admin and import the catalogue, then lock setup.
#[instrument(skip(state, session, headers, form))]
pub async fn setup(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    JsonOrForm(form): JsonOrForm<SetupForm>,
) -> Response {
    let config = state.config();
    let lock_path = config.setup_lock_path();
    let setup = SetupState::probe(&config.product_json, &lock_path).await;

    if !setup.can_init {
        push_flash(&session, FlashLevel::Warning, ALREADY_INITIALISED).await;
        return Redirect::to("/setup").into_response();
    }

    let username = non_blank(form.admin_username.as_deref()).unwrap_or(DEFAULT_ADMIN_USERNAME);
    let password = non_blank(form.admin_password.as_deref()).unwrap_or(DEFAULT_ADMIN_PASSWORD);
    let init_products = is_truthy(Some(form.init_products.as_deref().unwrap_or("on")));

    let catalogue = if init_products {
        match load_catalogue(&config.product_json).await {
            Ok(products) => products,
            Err(e) => {
                tracing::error!(error = %e, "failed to load catalogue");
                push_flash(&session, FlashLevel::Error, format!("Setup failed: {e}")).await;
                return Redirect::to("/setup").into_response();
            }
        }
    } else {
        Vec::new()
    };

    let report = match run_setup(state.pool(), username, password, &catalogue).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "setup failed");
            push_flash(&session, FlashLevel::Error, format!("Setup failed: {e}")).await;
            return Redirect::to("/setup").into_response();
        }
    };

    if let Err(e) = tokio::fs::rename(&config.product_json, &lock_path).await {
        tracing::error!(error = %e, "failed to lock setup");
    }

    tracing::info!(
        admin = username,
        imported = report.imported,
        skipped = report.skipped,
        "lab initialised"
    );

    let verb = if report.admin_created { "created" } else { "updated" };
    push_flash(
        &session,
        FlashLevel::Success,
        format!(
            "Admin {verb}; imported {}, skipped {}",
            report.imported, report.skipped
        ),
    )
    .await;
    push_flash(
        &session,
        FlashLevel::Info,
        format!(
            "Admin console: http://{}/admin/login (username: {username}, password: {password})",
            request_host(&headers)
        ),
    )
    .await;

    Redirect::to("/setup").into_response()
}

// =============================================================================
// Health
// =============================================================================

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: the database answers.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => "ok".into_response(),
        Err(e) => {
            tracing::error!(error = %e, "readiness check failed");
            (axum::http::StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response()
        }
    }
}
