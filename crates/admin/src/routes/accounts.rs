//! Account table handlers shared by the buyers, sellers and admins managers.
//!
//! Each manager is an [`AccountCollection`]; its module only describes the
//! table and mounts [`routes`] for its own type.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, put},
};
use marketplace_client::ApiError;
use marketplace_core::{AccountKind, UserAccount, UserId};
use serde::Deserialize;
use tracing::instrument;

use crate::components::{DataTableConfig, SortKey, TableBody, TableQuery, TableRow, TableView};
use crate::error::Result;
use crate::filters;
use crate::fragments::{Fragments, Toast, toast_only};
use crate::htmx::is_htmx;
use crate::middleware::{PageContext, RequireAdminAuth};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// One kind of account managed through the shared table.
pub trait AccountCollection: Send + Sync + 'static {
    const KIND: AccountKind;
    /// Page heading, e.g. "Buyers".
    const TITLE: &'static str;
    const BASE_PATH: &'static str;
    /// Whether rows offer an activate/deactivate toggle.
    const TOGGLES: bool;

    fn table() -> DataTableConfig;
}

// =============================================================================
// View Types
// =============================================================================

/// Account row display data.
#[derive(Debug, Clone)]
pub struct AccountRowView {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub store: String,
    /// Raw creation timestamp; the row renders it through `joined_date`.
    pub created_at: String,
    pub active: bool,
    pub label: &'static str,
    pub base_path: &'static str,
    pub toggles: bool,
    pub show_phone: bool,
    pub show_store: bool,
}

impl AccountRowView {
    #[must_use]
    pub fn new<C: AccountCollection>(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            name: account.display_name(),
            email: account.email.clone(),
            phone: account.phone.clone().unwrap_or_else(|| "-".to_string()),
            store: account.store_name.clone().unwrap_or_else(|| "-".to_string()),
            created_at: account.created_at.clone().unwrap_or_default(),
            active: account.is_active,
            label: C::KIND.label(),
            base_path: C::BASE_PATH,
            toggles: C::TOGGLES,
            show_phone: C::KIND == AccountKind::Buyer,
            show_store: C::KIND == AccountKind::Seller,
        }
    }
}

impl TableRow for AccountRowView {
    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.username, self.name, self.email, self.store)
    }

    fn sort_key(&self, key: &str) -> SortKey {
        match key {
            "name" => SortKey::text(&self.name),
            "email" => SortKey::text(&self.email),
            "store" => SortKey::text(&self.store),
            "joined" => SortKey::Text(self.created_at.clone()),
            "status" => SortKey::Number(i64::from(self.active)),
            _ => SortKey::text(&self.username),
        }
    }
}

/// One account row.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/account_row.html")]
pub struct AccountRowTemplate {
    pub row: AccountRowView,
}

/// Status cell data, swapped after a toggle.
#[derive(Debug, Clone)]
pub struct AccountStatusView {
    pub id: UserId,
    pub active: bool,
    pub label: &'static str,
    pub base_path: &'static str,
    pub toggles: bool,
}

/// Status cell with its toggle button.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/account_status.html")]
pub struct AccountStatusTemplate {
    pub row: AccountStatusView,
}

/// Account manager page.
#[derive(Template, WebTemplate)]
#[template(path = "accounts/index.html")]
pub struct AccountsTemplate {
    pub ctx: PageContext,
    pub title: &'static str,
    pub base_path: &'static str,
    pub table: TableView,
    pub error: Option<String>,
    /// Extra panel above the table, e.g. the new-admin form.
    pub form_html: Option<String>,
}

/// Status toggle submission.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub active: bool,
}

// =============================================================================
// Loading
// =============================================================================

async fn load_rows<C: AccountCollection>(
    state: &AppState,
    admin: &CurrentAdmin,
    query: &TableQuery,
) -> std::result::Result<Vec<AccountRowTemplate>, ApiError> {
    let accounts = state.accounts(admin).list(C::KIND).await?;
    let rows = accounts.iter().map(AccountRowView::new::<C>).collect();
    Ok(query
        .apply(&C::table(), rows)
        .into_iter()
        .map(|row| AccountRowTemplate { row })
        .collect())
}

/// The manager page, or its error panel when the list cannot be loaded.
///
/// # Errors
///
/// Returns an error if the backend rejected the admin's login or a template
/// fails to render.
pub async fn page<C: AccountCollection>(
    state: &AppState,
    admin: &CurrentAdmin,
    ctx: PageContext,
    query: &TableQuery,
) -> Result<AccountsTemplate> {
    let config = C::table();
    let (rows, error) = match load_rows::<C>(state, admin, query).await {
        Ok(rows) => (rows, None),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::error!(error = %e, kind = C::KIND.collection(), "Failed to load accounts");
            (Vec::new(), Some(format!("Failed to load {}", C::KIND.collection())))
        }
    };
    let body = config.body(&rows)?;
    Ok(AccountsTemplate {
        ctx,
        title: C::TITLE,
        base_path: C::BASE_PATH,
        table: config.view(query, &body)?,
        error,
        form_html: None,
    })
}

/// Freshly loaded table body, sent out of band after a change elsewhere on
/// the page.
///
/// # Errors
///
/// Returns the backend or render error.
pub async fn refreshed_body<C: AccountCollection>(
    state: &AppState,
    admin: &CurrentAdmin,
) -> Result<TableBody> {
    let rows = load_rows::<C>(state, admin, &TableQuery::default()).await?;
    Ok(C::table().body(&rows)?.out_of_band())
}

// =============================================================================
// Handlers
// =============================================================================

/// List accounts; HTMX searches get only the table body.
#[instrument(skip(admin, state, ctx, headers))]
pub async fn index<C: AccountCollection>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ctx: PageContext,
    headers: HeaderMap,
    Query(query): Query<TableQuery>,
) -> Result<Response> {
    if is_htmx(&headers) {
        return match load_rows::<C>(&state, &admin, &query).await {
            Ok(rows) => Ok(Html(C::table().body(&rows)?.render()?).into_response()),
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
            Err(e) => Ok(toast_only(&Toast::error(format!(
                "Failed to load {}: {}",
                C::KIND.collection(),
                e.user_message()
            )))?
            .into_response()),
        };
    }
    Ok(page::<C>(&state, &admin, ctx, &query).await?.into_response())
}

/// Activate or deactivate an account, answering with the new status cell.
#[instrument(skip(admin, state, form))]
pub async fn set_status<C: AccountCollection>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    match state.accounts(&admin).set_active(C::KIND, id, form.active).await {
        Ok(()) => {
            let verb = if form.active { "activated" } else { "deactivated" };
            tracing::info!(
                %id,
                kind = C::KIND.label(),
                active = form.active,
                "Account status changed"
            );
            let cell = AccountStatusTemplate {
                row: AccountStatusView {
                    id,
                    active: form.active,
                    label: C::KIND.label(),
                    base_path: C::BASE_PATH,
                    toggles: C::TOGGLES,
                },
            };
            Ok(Fragments::new()
                .push(&cell)?
                .push(&Toast::success(format!("{} {verb}", capitalized(C::KIND.label()))))?
                .into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, %id, "Failed to change account status");
            Ok(toast_only(&Toast::error(format!(
                "Failed to update {}: {}",
                C::KIND.label(),
                e.user_message()
            )))?
            .into_response())
        }
    }
}

/// Delete an account. Success answers with an empty body, so the row's
/// `outerHTML swap:500ms` fades it out and removes it.
#[instrument(skip(admin, state))]
pub async fn remove<C: AccountCollection>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Response> {
    match state.accounts(&admin).delete(C::KIND, id).await {
        Ok(()) => {
            tracing::info!(%id, kind = C::KIND.label(), "Account deleted");
            Ok(Html("").into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, %id, "Failed to delete account");
            Ok(toast_only(&Toast::error(format!(
                "Failed to delete {}: {}",
                C::KIND.label(),
                e.user_message()
            )))?
            .into_response())
        }
    }
}

/// List, delete and (when the collection toggles) status routes.
pub fn routes<C: AccountCollection>() -> Router<AppState> {
    let item = format!("{}/{{id}}", C::BASE_PATH);
    let router = Router::new()
        .route(C::BASE_PATH, get(index::<C>))
        .route(&item, delete(remove::<C>));
    if C::TOGGLES {
        router.route(&format!("{item}/status"), put(set_status::<C>))
    } else {
        router
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::components::TableColumn;

    use super::*;

    struct Buyers;

    impl AccountCollection for Buyers {
        const KIND: AccountKind = AccountKind::Buyer;
        const TITLE: &'static str = "Buyers";
        const BASE_PATH: &'static str = "/buyers";
        const TOGGLES: bool = true;

        fn table() -> DataTableConfig {
            DataTableConfig::new("buyers", "/buyers")
                .column(TableColumn::sortable("username", "Username"))
        }
    }

    fn account(json: &str) -> UserAccount {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_row_renders_actions() {
        let row = AccountRowView::new::<Buyers>(&account(
            r#"{"id":7,"username":"sam","email":"sam@example.com","active":true,
                "createdAt":"2025-01-05T10:00:00Z"}"#,
        ));
        let html = AccountRowTemplate { row }.render().unwrap();
        assert!(html.contains(r#"id="buyer-row-7""#));
        assert!(html.contains("<td>Jan 05, 2025</td>"));
        assert!(html.contains(r#"hx-delete="/buyers/7""#));
        assert!(html.contains(r#"hx-swap="outerHTML swap:500ms""#));
        assert!(html.contains(r#"hx-put="/buyers/7/status""#));
        assert!(html.contains("Deactivate"));
    }

    #[test]
    fn test_status_cell_offers_opposite_action() {
        let html = AccountStatusTemplate {
            row: AccountStatusView {
                id: UserId::new(3),
                active: false,
                label: "seller",
                base_path: "/sellers",
                toggles: true,
            },
        }
        .render()
        .unwrap();
        assert!(html.contains("Inactive"));
        assert!(html.contains(r#""active": "true""#));
        assert!(html.contains(r#"id="seller-status-3""#));
    }

    #[test]
    fn test_row_without_timestamp_shows_dash() {
        let row = AccountRowView::new::<Buyers>(&account(r#"{"id":8,"username":"lina"}"#));
        let html = AccountRowTemplate { row }.render().unwrap();
        assert!(html.contains("<td>-</td>"));
    }

    #[test]
    fn test_search_matches_store_name() {
        let rows = vec![
            AccountRowView::new::<Buyers>(&account(
                r#"{"id":1,"username":"a","storeName":"Oasis"}"#,
            )),
            AccountRowView::new::<Buyers>(&account(r#"{"id":2,"username":"b"}"#)),
        ];
        let query = TableQuery {
            q: Some("oasis".to_string()),
            ..TableQuery::default()
        };
        let found = query.apply(&Buyers::table(), rows);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, UserId::new(1));
    }

    #[test]
    fn test_capitalized() {
        assert_eq!(capitalized("buyer"), "Buyer");
        assert_eq!(capitalized(""), "");
    }
}
