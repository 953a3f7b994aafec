//! Authentication route handlers for admin.
//!
//! Admins log in with their marketplace username and password; the backend
//! session is accepted only when it carries the admin role.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use marketplace_client::{ApiError, LoginRequest};
use marketplace_core::Role;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::auth::{LOGIN_PATH, clear_current_admin, set_current_admin};
use crate::middleware::{OptionalAdminAuth, PageContext};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub username: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

/// Render the login page, or go to the dashboard when already logged in.
///
/// GET /auth/login
#[instrument(skip_all)]
async fn login_page(OptionalAdminAuth(admin): OptionalAdminAuth, ctx: PageContext) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        ctx,
        error: None,
        username: String::new(),
    }
    .into_response()
}

/// Log in against the backend.
///
/// POST /auth/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let username = form.username.trim().to_string();
    let rejected = |ctx: PageContext, message: &str| {
        LoginTemplate {
            ctx,
            error: Some(message.to_string()),
            username: username.clone(),
        }
        .into_response()
    };

    if username.is_empty() || form.password.is_empty() {
        return Ok(rejected(ctx, "Enter your username and password"));
    }

    let request = LoginRequest {
        username: username.clone(),
        password: SecretString::from(form.password),
    };
    let auth = match state.api().auth().login(&request).await {
        Ok(auth) => auth,
        Err(ApiError::Unauthorized) => {
            tracing::info!("Admin login rejected");
            return Ok(rejected(ctx, "Invalid username or password"));
        }
        Err(e) if e.status().is_some_and(|s| s.is_client_error()) => {
            tracing::info!(error = %e, "Admin login rejected");
            return Ok(rejected(ctx, "Invalid username or password"));
        }
        Err(e) => {
            tracing::error!(error = %e, "Admin login failed");
            return Ok(rejected(ctx, &e.user_message()));
        }
    };

    if !auth.has_role(Role::Admin) {
        tracing::warn!(roles = ?auth.roles, "Non-admin account tried to log in");
        if let Err(e) = state.api().auth().logout(&auth.credentials()).await {
            tracing::debug!(error = %e, "Backend logout after refused login failed");
        }
        return Ok(rejected(ctx, "This account is not an admin"));
    }

    let admin = CurrentAdmin::from_login(&auth, &username);
    set_current_admin(&session, &admin).await?;
    set_sentry_user(admin.user_id.as_ref(), &admin.username);
    tracing::info!(username = %admin.username, "Admin logged in");

    Ok(Redirect::to("/").into_response())
}

/// Logout and clear session.
///
/// POST /auth/logout
#[instrument(skip_all)]
async fn logout(
    OptionalAdminAuth(admin): OptionalAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect> {
    if let Some(admin) = admin {
        if let Err(e) = state.api().auth().logout(&admin.credentials()).await {
            tracing::warn!(error = %e, "Backend logout failed");
        }
        tracing::info!(username = %admin.username, "Admin logged out");
    }
    clear_current_admin(&session).await?;
    clear_sentry_user();

    Ok(Redirect::to(LOGIN_PATH))
}
