//! Authentication extractors.
//!
//! Provides extractors for requiring a logged-in marketplace user in route handlers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::fragments;
use crate::htmx::is_htmx;
use crate::middleware::csrf::form_token;
use crate::models::SessionUser;

/// Extractor that requires a logged-in user.
///
/// Full-page requests are redirected to `/login`; HTMX requests get the
/// login modal instead.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {:?}!", user.username)
/// }
/// ```
pub struct RequireUser(pub SessionUser);

/// Why [`RequireUser`] rejected a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to `next` afterwards.
    RedirectToLogin { next: String },
    /// Show the login modal (HTMX requests).
    LoginModal { csrf_token: String, next: String },
    /// The session could not be read.
    SessionUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::LoginModal { csrf_token, next } => {
                match fragments::login_required(csrf_token, next) {
                    Ok(fragments) => fragments.into_response(),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to render login modal");
                        StatusCode::UNAUTHORIZED.into_response()
                    }
                }
            }
            Self::SessionUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// `/login?next=...` for a path to come back to.
#[must_use]
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/login?next={encoded}")
}

/// Path the user was on, used as the post-login destination.
///
/// HTMX requests report the page in `HX-Current-URL`; fragment endpoints
/// themselves are not worth returning to. Inside a nested router `parts.uri`
/// has lost its prefix, so the full path comes from [`OriginalUri`].
fn return_path(parts: &Parts) -> String {
    if is_htmx(&parts.headers) {
        return parts
            .headers
            .get("hx-current-url")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| url::Url::parse(v).ok())
            .map_or_else(|| "/marketplace".to_string(), |url| url.path().to_string());
    }
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
        .path_and_query()
        .map_or_else(|| "/".to_string(), ToString::to_string)
}

fn session(parts: &Parts) -> Result<&Session, AuthRejection> {
    parts.extensions.get::<Session>().ok_or_else(|| {
        tracing::error!("Auth extractor ran without a session layer");
        AuthRejection::SessionUnavailable
    })
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session(parts)?;

        match SessionUser::load(session).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => {
                let next = return_path(parts);
                if is_htmx(&parts.headers) {
                    let csrf_token = form_token(session)
                        .await
                        .map_err(|_| AuthRejection::SessionUnavailable)?;
                    Err(AuthRejection::LoginModal { csrf_token, next })
                } else {
                    Err(AuthRejection::RedirectToLogin { next })
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read user from session");
                Err(AuthRejection::SessionUnavailable)
            }
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, this does not reject the request if nobody is logged in.
pub struct OptionalUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => SessionUser::load(session).await.ok().flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// A post-login destination that stays on this site.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/marketplace",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_return_path_prefers_original_uri() {
        let mut nested = parts("/?page=2");
        nested
            .extensions
            .insert(OriginalUri("/cart?page=2".parse().unwrap()));
        assert_eq!(return_path(&nested), "/cart?page=2");

        assert_eq!(return_path(&parts("/checkout/success")), "/checkout/success");
    }

    #[test]
    fn test_return_path_of_htmx_request_is_current_page() {
        let mut request = parts("/cart/add");
        request.headers.insert("hx-request", "true".parse().unwrap());
        request.headers.insert(
            "hx-current-url",
            "http://localhost:3000/marketplace?x=1".parse().unwrap(),
        );
        assert_eq!(return_path(&request), "/marketplace");
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/cart?x=1"), "/login?next=%2Fcart%3Fx%3D1");
    }

    #[test]
    fn test_safe_next_rejects_other_hosts() {
        assert_eq!(safe_next(Some("/cart")), "/cart");
        assert_eq!(safe_next(Some("//evil.example")), "/marketplace");
        assert_eq!(safe_next(Some("https://evil.example")), "/marketplace");
        assert_eq!(safe_next(None), "/marketplace");
    }
}
