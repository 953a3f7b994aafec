//! CSRF protection for the storefront's own state-changing routes.
//!
//! A random token is kept in the session under `form_token` and rendered in
//! a `<meta name="csrf-token">` tag. HTMX sends it back as the
//! `X-CSRF-TOKEN` header (`hx-headers` on `<body>`); plain HTML forms send
//! it as the `_csrf` field.
//!
//! This token is unrelated to the CSRF token the backend issues at login,
//! which is forwarded by the API client.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Request},
    http::{Method, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use crate::models::session_keys;

/// Header carrying the token on HTMX requests.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Form field carrying the token on plain form posts.
pub const CSRF_FIELD: &str = "_csrf";

/// Largest form body buffered while looking for the token.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// The session's CSRF token, generated on first use.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn form_token(session: &Session) -> Result<String, SessionError> {
    if let Some(token) = session.get::<String>(session_keys::FORM_TOKEN).await? {
        return Ok(token);
    }
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    session.insert(session_keys::FORM_TOKEN, &token).await?;
    Ok(token)
}

/// Extractor for the session's CSRF token, for rendering forms.
#[derive(Debug, Clone)]
pub struct FormToken(pub String);

impl<S> FromRequestParts<S> for FormToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
        form_token(session).await.map(Self).map_err(|e| {
            tracing::error!(error = %e, "Failed to read CSRF token from session");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}

/// Reject state-changing requests that do not carry the session's token.
///
/// Requires the session layer to run first.
pub async fn verify_csrf(request: Request, next: Next) -> Response {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::error!("CSRF check ran without a session layer");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let expected = match session.get::<String>(session_keys::FORM_TOKEN).await {
        Ok(Some(token)) => token,
        Ok(None) => return forbidden(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read CSRF token from session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(token) = header_token {
        if tokens_match(&token, &expected) {
            return next.run(request).await;
        }
        return forbidden();
    }

    if !is_form(&request) {
        return forbidden();
    }

    let (parts, body) = request.into_parts();
    let bytes: Bytes = match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let submitted = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned());

    match submitted {
        Some(token) if tokens_match(&token, &expected) => {
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        _ => forbidden(),
    }
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

fn forbidden() -> Response {
    tracing::warn!("Rejected request with missing or invalid CSRF token");
    (StatusCode::FORBIDDEN, "Invalid or missing CSRF token").into_response()
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(submitted: &str, expected: &str) -> bool {
    submitted.len() == expected.len()
        && submitted
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, middleware::from_fn, routing::post};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abd", "abc"));
        assert!(!tokens_match("ab", "abc"));
    }

    #[tokio::test]
    async fn test_form_token_is_stable_per_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let first = form_token(&session).await.unwrap();
        let second = form_token(&session).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 43);
    }

    #[tokio::test]
    async fn test_post_without_session_token_is_forbidden() {
        let app = Router::new()
            .route("/cart/add", post(|| async { "ok" }))
            .layer(from_fn(verify_csrf))
            .layer(SessionManagerLayer::new(MemoryStore::default()));

        let response = app
            .oneshot(
                axum::http::Request::post("/cart/add")
                    .header(CSRF_HEADER, "guess")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_get_is_not_checked() {
        let app = Router::new()
            .route("/", axum::routing::get(|| async { "ok" }))
            .layer(from_fn(verify_csrf))
            .layer(SessionManagerLayer::new(MemoryStore::default()));

        let response = app
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
