//! Authentication middleware and extractors for admin.
//!
//! Only accounts holding the backend's admin role can log in; the session
//! stores the resulting [`CurrentAdmin`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::htmx::{HX_REDIRECT, is_htmx};
use crate::models::{CurrentAdmin, session_keys};

/// Where unauthenticated admins are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Extractor that requires admin authentication.
///
/// If the admin is not logged in, returns a redirect to the login page.
/// HTMX requests get an `HX-Redirect` so the whole page navigates.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.username)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required but the user is not logged in.
pub enum AdminAuthRejection {
    /// Redirect to login page (full page loads).
    RedirectToLogin,
    /// Client-side redirect to the login page (HTMX requests).
    HtmxRedirectToLogin,
    /// The session layer is missing or the store failed.
    SessionUnavailable,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::HtmxRedirectToLogin => {
                let mut response = StatusCode::OK.into_response();
                response
                    .headers_mut()
                    .insert(HX_REDIRECT, HeaderValue::from_static(LOGIN_PATH));
                response
            }
            Self::SessionUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::SessionUnavailable)?;

        match current_admin(session).await {
            Ok(Some(admin)) => Ok(Self(admin)),
            Ok(None) if is_htmx(&parts.headers) => Err(AdminAuthRejection::HtmxRedirectToLogin),
            Ok(None) => Err(AdminAuthRejection::RedirectToLogin),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read admin from session");
                Err(AdminAuthRejection::SessionUnavailable)
            }
        }
    }
}

/// Extractor that optionally gets the current admin.
///
/// Unlike `RequireAdminAuth`, this does not reject the request if the admin is not logged in.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => current_admin(session).await.ok().flatten(),
            None => None,
        };

        Ok(Self(admin))
    }
}

/// The admin stored in the session, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn current_admin(
    session: &Session,
) -> Result<Option<CurrentAdmin>, tower_sessions::session::Error> {
    session.get(session_keys::CURRENT_ADMIN).await
}

/// Helper to set the current admin in the session.
///
/// The session id is cycled first to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::header;
    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_set_then_clear() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let admin = CurrentAdmin {
            token: "jwt".to_string(),
            csrf_token: None,
            user_id: None,
            username: "ops".to_string(),
        };
        set_current_admin(&session, &admin).await.unwrap();
        assert_eq!(current_admin(&session).await.unwrap().unwrap().username, "ops");

        clear_current_admin(&session).await.unwrap();
        assert!(current_admin(&session).await.unwrap().is_none());
    }

    #[test]
    fn test_rejections() {
        let response = AdminAuthRejection::RedirectToLogin.into_response();
        assert_eq!(response.headers()[header::LOCATION], LOGIN_PATH);

        let response = AdminAuthRejection::HtmxRedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HX_REDIRECT], LOGIN_PATH);
    }
}
