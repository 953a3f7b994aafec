//! Authentication route handlers.
//!
//! Handles login, registration and logout against the marketplace
//! backend's `/api/auth` endpoints.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use marketplace_client::{ApiError, LoginRequest, RegisterRequest};
use marketplace_core::validation::{FormErrors, optional};
use marketplace_core::{CartSummary, Role};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, PageContext, safe_next};
use crate::models::SessionUser;
use crate::models::session::set_cart_count;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
}

impl RegisterForm {
    fn role(&self) -> Role {
        match self.role.as_deref().map(str::parse) {
            Some(Ok(Role::Seller)) => Role::Seller,
            _ => Role::Buyer,
        }
    }

    /// Check every field, collecting all messages.
    fn validate(&self) -> std::result::Result<RegisterRequest, FormErrors> {
        let mut errors = FormErrors::new();
        let username = errors.required("username", &self.username);
        let email = errors.email("email", &self.email);
        let password = errors.password("password", &self.password);
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match");
        }
        let role = self.role();
        let store_name = optional(self.store_name.as_deref());
        if role == Role::Seller && store_name.is_none() {
            errors.add("store_name", "Sellers need a store name");
        }

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => {
                Ok(RegisterRequest {
                    username,
                    email,
                    password: SecretString::from(password),
                    first_name: optional(self.first_name.as_deref()),
                    last_name: optional(self.last_name.as_deref()),
                    role,
                    store_name: store_name.filter(|_| role == Role::Seller),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Values echoed back into a rejected registration form.
#[derive(Debug, Clone, Default)]
pub struct RegisterValues {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub store_name: String,
    pub is_seller: bool,
}

impl From<&RegisterForm> for RegisterValues {
    fn from(form: &RegisterForm) -> Self {
        Self {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            first_name: form.first_name.clone().unwrap_or_default(),
            last_name: form.last_name.clone().unwrap_or_default(),
            store_name: form.store_name.clone().unwrap_or_default(),
            is_seller: form.role() == Role::Seller,
        }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    #[serde(default)]
    pub registered: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub username: String,
    pub next: String,
    pub registered: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub errors: FormErrors,
    pub values: RegisterValues,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    ctx: PageContext,
    OptionalUser(user): OptionalUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if user.is_some() {
        return Redirect::to(&next).into_response();
    }
    LoginTemplate {
        ctx,
        error: None,
        username: String::new(),
        next,
        registered: query.registered.is_some(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, ctx, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref()).to_string();
    let request = LoginRequest {
        username: form.username.trim().to_string(),
        password: SecretString::from(form.password),
    };

    let auth = match state.api().auth().login(&request).await {
        Ok(auth) => auth,
        Err(e) => {
            let message = match &e {
                ApiError::Unauthorized => "Invalid username or password".to_string(),
                ApiError::Status { status, .. } if status.is_client_error() => {
                    "Invalid username or password".to_string()
                }
                other => {
                    tracing::warn!(error = %other, "Login failed");
                    other.user_message()
                }
            };
            return Ok(LoginTemplate {
                ctx,
                error: Some(message),
                username: request.username,
                next,
                registered: false,
            }
            .into_response());
        }
    };

    SessionUser::store(&session, &auth).await?;
    let Some(user) = SessionUser::load(&session).await? else {
        return Err(AppError::Internal(
            "login was not stored in the session".to_string(),
        ));
    };
    state.forget_cart_sync(&user).await;

    if let Some(user_id) = user.user_id {
        set_sentry_user(&user_id, user.username.as_deref());
    }
    tracing::info!(user_id = ?user.user_id, roles = ?user.roles, "User logged in");

    if user.has_role(Role::Buyer) {
        match state.cart_sync(&user).await.load().await {
            Ok(items) => set_cart_count(&session, CartSummary::of(&items).item_count).await,
            Err(e) => tracing::warn!(error = %e, "Failed to load cart count after login"),
        }
    }

    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(ctx: PageContext, OptionalUser(user): OptionalUser) -> Response {
    if user.is_some() {
        return Redirect::to("/marketplace").into_response();
    }
    RegisterTemplate {
        ctx,
        error: None,
        errors: FormErrors::new(),
        values: RegisterValues::default(),
    }
    .into_response()
}

/// Handle registration form submission.
///
/// Invalid input re-renders the form with a message per field; nothing is
/// sent to the backend until every field passes.
#[instrument(skip(state, ctx, form))]
pub async fn register(
    State(state): State<AppState>,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => {
            return Ok(RegisterTemplate {
                ctx,
                error: None,
                errors,
                values: RegisterValues::from(&form),
            }
            .into_response());
        }
    };

    match state.api().auth().register(&request).await {
        Ok(()) => {
            tracing::info!(role = %request.role, "Account registered");
            Ok(Redirect::to("/login?registered=1").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Ok(RegisterTemplate {
                ctx,
                error: Some(e.user_message()),
                errors: FormErrors::new(),
                values: RegisterValues::from(&form),
            }
            .into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// The backend logout is best effort; the local session is always cleared.
#[instrument(skip(state, session, user))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Result<Response> {
    if let Some(user) = user {
        if let Err(e) = state.api().auth().logout(&user.credentials()).await {
            tracing::warn!(error = %e, "Backend logout failed");
        }
        state.forget_cart_sync(&user).await;
    }
    SessionUser::clear(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/login").into_response())
}
