//! Spreadsheet batch import.
//!
//! The import step fetches the workbook from whatever URL it is given, so an
//! uploaded file is imported by handing back its own `/uploads/` URL.

use axum::{
    Form, Json,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::extract::{non_blank, request_host};
use crate::middleware::RequireAdmin;
use crate::services::import::{body_preview, import_goods, map_rows, read_sheet, template_xlsx};
use crate::services::uploads::{is_xlsx, save_upload, upload_url};
use crate::state::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": message.into() }))).into_response()
}

/// Download the import template workbook.
#[instrument(skip(_admin))]
pub async fn template(RequireAdmin(_admin): RequireAdmin) -> Response {
    match template_xlsx() {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"product_import_template.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to build import template");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Store an uploaded `.xlsx` and return its absolute URL.
#[instrument(skip(state, _admin, headers, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes)),
                    Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    let Some((filename, bytes)) = upload.filter(|(name, _)| !name.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "No file selected");
    };
    if !is_xlsx(&filename) {
        return json_error(StatusCode::BAD_REQUEST, "Only .xlsx files are accepted");
    }

    match save_upload(&state.config().upload_dir, &filename, &bytes).await {
        Ok(stored) => {
            let url = format!("http://{}{}", request_host(&headers), upload_url(&stored));
            Json(json!({ "success": true, "url": url })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to store spreadsheet");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file")
        }
    }
}

/// Import form.
#[derive(Debug, Deserialize)]
pub struct ImportForm {
    pub url: Option<String>,
}

fn import_failure(message: String, url: &str, preview: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": message,
            "url": url,
            "preview": preview,
        })),
    )
        .into_response()
}

/// Fetch a workbook from `url` and import its rows.
///
/// The URL is fetched server-side with no restriction on scheme, host or
/// port. On a parse failure the start of the fetched body is returned.
#[instrument(skip(state, _admin, form))]
pub async fn import(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Form(form): Form<ImportForm>,
) -> Response {
    let Some(url) = non_blank(form.url.as_deref()) else {
        return json_error(StatusCode::BAD_REQUEST, "Please provide a file URL");
    };
    tracing::info!(url, "fetching import workbook");

    let body = match state.http().get(url).send().await {
        Ok(response) => match response.bytes().await {
            Ok(body) => body,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("Fetch failed: {e}")),
        },
        Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("Fetch failed: {e}")),
    };
    let preview = body_preview(&body);

    let rows = match read_sheet(&body) {
        Ok(rows) => rows,
        Err(e) => return import_failure(format!("Could not read workbook: {e}"), url, &preview),
    };
    let goods = map_rows(&rows);
    if goods.is_empty() {
        return import_failure("No importable rows".to_owned(), url, &preview);
    }

    match import_goods(state.pool(), &goods).await {
        Ok(imported) => {
            tracing::info!(imported, "batch import finished");
            Json(json!({
                "success": true,
                "imported": imported,
                "message": format!("Imported {imported} products"),
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "batch import failed");
            import_failure(format!("Import failed: {e}"), url, &preview)
        }
    }
}
