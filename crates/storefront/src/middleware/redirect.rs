//! Redirect handling for HTMX requests and expired logins.

use axum::{
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::ExpiredLogin;
use crate::htmx::{HX_REDIRECT, is_htmx};
use crate::models::SessionUser;

/// Post-process responses:
///
/// - a response marked [`ExpiredLogin`] clears the session's login
/// - a redirect answering an HTMX request becomes `HX-Redirect`, since the
///   browser would otherwise follow it inside the XHR and swap the target
///   page into a fragment slot
pub async fn htmx_redirects(request: Request, next: Next) -> Response {
    let htmx = is_htmx(request.headers());
    let session = request.extensions().get::<Session>().cloned();

    let response = next.run(request).await;

    if response.extensions().get::<ExpiredLogin>().is_some() {
        if let Some(session) = &session {
            if let Err(e) = SessionUser::clear(session).await {
                tracing::warn!(error = %e, "Failed to clear expired login");
            }
        }
    }

    if htmx && response.status().is_redirection() {
        if let Some(location) = response.headers().get(header::LOCATION).cloned() {
            let mut converted = StatusCode::OK.into_response();
            converted.headers_mut().insert(HX_REDIRECT, location);
            return converted;
        }
    }

    response
}
