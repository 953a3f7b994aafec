//! Per-page data rendered by `base.html`.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::auth::current_admin;
use crate::middleware::csrf::form_token;

/// Header, navigation and `<meta>` data every admin page needs.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub csrf_token: String,
    /// Logged-in admin's display name; empty on the login page.
    pub username: String,
    /// Request path, for highlighting the active navigation link.
    pub current_path: String,
}

impl PageContext {
    /// Whether the navigation link for `prefix` is the current section.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            return self.current_path == "/";
        }
        self.current_path.starts_with(prefix)
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        Ok(Self {
            csrf_token: form_token(session).await?,
            username: current_admin(session)
                .await?
                .map(|admin| admin.username)
                .unwrap_or_default(),
            current_path: parts.uri.path().to_string(),
        })
    }
}
