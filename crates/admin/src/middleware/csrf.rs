//! CSRF protection for the admin panel's state-changing routes.
//!
//! The session holds a random token that `base.html` renders into a
//! `<meta>` tag and into `hx-headers` on `<body>`, so every HTMX request
//! carries it as `X-CSRF-TOKEN`. The login form posts it as `_csrf`.

use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode, header},
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

const MAX_FORM_BYTES: usize = 16 * 1024;

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

/// Reject POST, PUT and DELETE requests that do not carry the session's token.
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

    if let Some(token) = request.headers().get(CSRF_HEADER) {
        return if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            next.run(request).await
        } else {
            forbidden()
        };
    }

    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return forbidden();
    }

    let (parts, body) = request.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, MAX_FORM_BYTES).await else {
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    };
    let valid = url::form_urlencoded::parse(&bytes).any(|(key, value)| {
        key == CSRF_FIELD && constant_time_eq(value.as_bytes(), expected.as_bytes())
    });
    if valid {
        next.run(Request::from_parts(parts, Body::from(bytes))).await
    } else {
        forbidden()
    }
}

fn forbidden() -> Response {
    tracing::warn!("Rejected admin request with missing or invalid CSRF token");
    (StatusCode::FORBIDDEN, "Invalid or missing CSRF token").into_response()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
