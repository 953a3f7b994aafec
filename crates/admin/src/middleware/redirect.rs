//! Expired-login cleanup and HTMX redirect conversion.

use axum::{
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::ExpiredLogin;
use crate::htmx::{HX_REDIRECT, is_htmx};
use crate::middleware::auth::clear_current_admin;

/// Clear the admin from the session when the backend rejected the token,
/// and turn redirects answering HTMX requests into `HX-Redirect`.
pub async fn htmx_redirects(request: Request, next: Next) -> Response {
    let htmx = is_htmx(request.headers());
    let session = request.extensions().get::<Session>().cloned();

    let response = next.run(request).await;

    if response.extensions().get::<ExpiredLogin>().is_some() {
        if let Some(session) = &session {
            if let Err(e) = clear_current_admin(session).await {
                tracing::warn!(error = %e, "Failed to clear expired admin login");
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
