//! Per-page data rendered by `base.html`.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use crate::error::AppError;
use crate::middleware::csrf::form_token;
use crate::models::SessionUser;
use crate::models::session::{cart_count, set_cart_count};
use crate::models::session_keys;
use crate::state::AppState;

/// Header and `<meta>` data every full page needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub csrf_token: String,
    pub logged_in: bool,
    /// Display name of the logged-in user; empty when anonymous.
    pub username: String,
    pub cart_count: u32,
}

/// Apply a cart clear that finished in the background to this session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn apply_cart_cleared(
    state: &AppState,
    session: &Session,
    user: &SessionUser,
) -> Result<(), SessionError> {
    if state.take_cart_cleared(user).await {
        session.insert(session_keys::CART_CLEARED, true).await?;
        set_cart_count(session, 0).await;
    }
    Ok(())
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let csrf_token = form_token(session).await?;
        let user = SessionUser::load(session).await?;
        let cart_count = match &user {
            Some(user) => {
                apply_cart_cleared(&state, session, user).await?;
                cart_count(session).await
            }
            None => 0,
        };

        Ok(Self {
            csrf_token,
            logged_in: user.is_some(),
            username: user
                .and_then(|u| u.username)
                .unwrap_or_default(),
            cart_count,
        })
    }
}
