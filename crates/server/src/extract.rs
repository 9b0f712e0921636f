//! Request body helpers shared by handlers that accept JSON or forms.

use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::{HeaderMap, header},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Body extractor accepting `application/json` or a urlencoded form.
///
/// The storefront scripts post JSON while the no-JS fallbacks submit forms;
/// both land in the same struct. Any other content type is read as a form.
pub struct JsonOrForm<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

/// Whether the request declares a JSON body.
#[must_use]
pub fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Whether the caller expects a JSON reply: a JSON body or an XHR request.
#[must_use]
pub fn wants_json(headers: &HeaderMap) -> bool {
    is_json(headers)
        || headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// `Host` header value, falling back to `localhost`.
///
/// Taken verbatim from the request; links built from it follow whatever the
/// client sent.
#[must_use]
pub fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_owned()
}

/// Trimmed, non-empty form value.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct EmailBody {
        email: Option<String>,
    }

    fn request(content_type: &str, body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_reads_json_body() {
        let req = request("application/json", r#"{"email":"a@b.c"}"#);
        let JsonOrForm(body) = JsonOrForm::<EmailBody>::from_request(req, &()).await.unwrap();
        assert_eq!(body.email.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_reads_form_body() {
        let req = request("application/x-www-form-urlencoded", "email=a%40b.c");
        let JsonOrForm(body) = JsonOrForm::<EmailBody>::from_request(req, &()).await.unwrap();
        assert_eq!(body.email.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let req = request("application/json", "{not json");
        let err = JsonOrForm::<EmailBody>::from_request(req, &()).await.err().unwrap();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_wants_json_for_xhr() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn test_request_host_is_verbatim() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_host(&headers), "localhost");
        headers.insert(header::HOST, HeaderValue::from_static("evil.example:8080"));
        assert_eq!(request_host(&headers), "evil.example:8080");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
