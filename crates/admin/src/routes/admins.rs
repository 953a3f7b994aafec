//! Admins manager: list, create and delete admin accounts.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::{delete, get},
};
use marketplace_client::{ApiError, NewAdmin};
use marketplace_core::AccountKind;
use marketplace_core::validation::{FormErrors, optional};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use crate::components::{DataTableConfig, TableColumn, TableQuery};
use crate::error::Result;
use crate::fragments::{Fragments, Toast};
use crate::htmx::is_htmx;
use crate::middleware::{PageContext, RequireAdminAuth};
use crate::routes::accounts::{self, AccountCollection};
use crate::state::AppState;

/// Admin accounts. Admins cannot be deactivated, only deleted.
pub struct Admins;

impl AccountCollection for Admins {
    const KIND: AccountKind = AccountKind::Admin;
    const TITLE: &'static str = "Admins";
    const BASE_PATH: &'static str = "/admins";
    const TOGGLES: bool = false;

    fn table() -> DataTableConfig {
        DataTableConfig::new("admins", Self::BASE_PATH)
            .column(TableColumn::sortable("username", "Username"))
            .column(TableColumn::sortable("name", "Name"))
            .column(TableColumn::sortable("email", "Email"))
            .column(TableColumn::sortable("joined", "Joined"))
            .column(TableColumn::new("status", "Status"))
            .search_placeholder("Search admins...")
            .empty_state("No admins found")
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// New admin form data.
#[derive(Debug, Default, Deserialize)]
pub struct AdminForm {
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
}

impl AdminForm {
    fn validate(&self) -> std::result::Result<NewAdmin, FormErrors> {
        let mut errors = FormErrors::new();
        let username = errors.required("username", &self.username);
        let email = errors.email("email", &self.email);
        let password = errors.password("password", &self.password);
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match");
        }

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => Ok(NewAdmin {
                username,
                email,
                password: SecretString::from(password),
                first_name: optional(self.first_name.as_deref()),
                last_name: optional(self.last_name.as_deref()),
            }),
            _ => Err(errors),
        }
    }
}

/// Values echoed back into a rejected form. Passwords are never echoed.
#[derive(Debug, Clone, Default)]
pub struct AdminValues {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&AdminForm> for AdminValues {
    fn from(form: &AdminForm) -> Self {
        Self {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            first_name: form.first_name.clone().unwrap_or_default(),
            last_name: form.last_name.clone().unwrap_or_default(),
        }
    }
}

/// New admin panel.
#[derive(Debug, Clone, Default, Template)]
#[template(path = "partials/admin_form.html")]
pub struct AdminFormTemplate {
    pub values: AdminValues,
    pub errors: FormErrors,
    pub error: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Admins page with the new-admin form above the table.
#[instrument(skip(admin, state, ctx, headers))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ctx: PageContext,
    headers: HeaderMap,
    Query(query): Query<TableQuery>,
) -> Result<Response> {
    if is_htmx(&headers) {
        return accounts::index::<Admins>(
            RequireAdminAuth(admin),
            State(state),
            ctx,
            headers,
            Query(query),
        )
        .await;
    }
    let mut page = accounts::page::<Admins>(&state, &admin, ctx, &query).await?;
    page.form_html = Some(AdminFormTemplate::default().render()?);
    Ok(page.into_response())
}

/// Create an admin. Invalid input re-renders the form in place; success
/// answers with a blank form and the refreshed table.
#[instrument(skip(admin, state, form))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<AdminForm>,
) -> Result<Response> {
    let new_admin = match form.validate() {
        Ok(new_admin) => new_admin,
        Err(errors) => {
            return Ok(AdminFormTemplate {
                values: AdminValues::from(&form),
                errors,
                error: None,
            }
            .render()
            .map(Html)?
            .into_response());
        }
    };

    match state.accounts(&admin).create_admin(&new_admin).await {
        Ok(()) => {
            tracing::info!(username = %new_admin.username, "Admin created");
            let mut fragments = Fragments::new()
                .push(&AdminFormTemplate::default())?
                .push(&Toast::success(format!("Admin {} created", new_admin.username)))?;
            match accounts::refreshed_body::<Admins>(&state, &admin).await {
                Ok(body) => fragments = fragments.push(&body)?,
                Err(e) => tracing::warn!(error = %e, "Failed to refresh admins table"),
            }
            Ok(fragments.into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create admin");
            Ok(AdminFormTemplate {
                values: AdminValues::from(&form),
                errors: FormErrors::new(),
                error: Some(e.user_message()),
            }
            .render()
            .map(Html)?
            .into_response())
        }
    }
}

/// `/admins` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(Admins::BASE_PATH, get(index).post(create))
        .route("/admins/{id}", delete(accounts::remove::<Admins>))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::{UserAccount, UserId};
    use secrecy::ExposeSecret;

    use super::*;
    use crate::routes::accounts::{AccountRowTemplate, AccountRowView};

    fn form() -> AdminForm {
        AdminForm {
            username: " ops ".to_string(),
            email: "ops@example.com".to_string(),
            password: "long enough".to_string(),
            password_confirm: "long enough".to_string(),
            ..AdminForm::default()
        }
    }

    #[test]
    fn test_valid_admin() {
        let admin = form().validate().unwrap();
        assert_eq!(admin.username, "ops");
        assert_eq!(admin.password.expose_secret(), "long enough");
        assert!(admin.first_name.is_none());
    }

    #[test]
    fn test_invalid_admin_collects_messages() {
        let errors = AdminForm {
            email: "ops".to_string(),
            password: "short".to_string(),
            ..form()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("email"), Some("Enter a valid email address"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 8 characters")
        );
        assert_eq!(errors.get("password_confirm"), Some("Passwords do not match"));
    }

    #[test]
    fn test_form_never_echoes_password() {
        let html = AdminFormTemplate {
            values: AdminValues::from(&form()),
            errors: FormErrors::new(),
            error: Some("Username already taken".to_string()),
        }
        .render()
        .unwrap();
        assert!(html.contains("Username already taken"));
        assert!(html.contains(r#"value="ops""#));
        assert!(!html.contains("long enough"));
    }

    #[test]
    fn test_admin_row_has_fade_out_delete_and_no_toggle() {
        let account: UserAccount =
            serde_json::from_str(r#"{"id":7,"username":"ops"}"#).unwrap();
        let row = AccountRowView::new::<Admins>(&account);
        assert_eq!(row.id, UserId::new(7));
        let html = AccountRowTemplate { row }.render().unwrap();
        assert!(html.contains(r#"hx-delete="/admins/7""#));
        assert!(html.contains(r#"hx-swap="outerHTML swap:500ms""#));
        assert!(!html.contains("/status"));
    }
}
