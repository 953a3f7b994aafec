//! Categories manager.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::{get, put},
};
use marketplace_client::{ApiError, CategoryInput};
use marketplace_core::validation::{FormErrors, optional};
use marketplace_core::{Category, CategoryId};
use serde::Deserialize;
use tracing::instrument;

use crate::components::{
    DataTableConfig, RemoveEmptyRow, SortKey, TableColumn, TableQuery, TableRow,
};
use crate::error::Result;
use crate::fragments::{CloseModal, Fragments, Toast, toast_only};
use crate::htmx::is_htmx;
use crate::middleware::{PageContext, RequireAdminAuth};
use crate::models::CurrentAdmin;
use crate::routes::catalog::{CatalogPageTemplate, load_failure, toast_message};
use crate::state::AppState;

const BASE_PATH: &str = "/categories";

fn table() -> DataTableConfig {
    DataTableConfig::new("categories", BASE_PATH)
        .column(TableColumn::sortable("id", "ID"))
        .column(TableColumn::sortable("name_en", "Name (English)"))
        .column(TableColumn::sortable("name_ar", "Name (Arabic)"))
        .column(TableColumn::new("description", "Description"))
        .search_placeholder("Search categories...")
        .empty_state("No categories yet")
}

/// Category row display data.
#[derive(Debug, Clone)]
pub struct CategoryRowView {
    pub id: CategoryId,
    pub name_en: String,
    pub name_ar: String,
    pub description: String,
}

impl From<&Category> for CategoryRowView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name_en: category.name_en.clone(),
            name_ar: category.name_ar.clone().unwrap_or_default(),
            description: category.description.clone().unwrap_or_default(),
        }
    }
}

impl TableRow for CategoryRowView {
    fn search_text(&self) -> String {
        format!("{} {} {}", self.name_en, self.name_ar, self.description)
    }

    fn sort_key(&self, key: &str) -> SortKey {
        match key {
            "id" => SortKey::Number(self.id.as_i64()),
            "name_ar" => SortKey::text(&self.name_ar),
            _ => SortKey::text(&self.name_en),
        }
    }
}

#[derive(Debug, Clone, Template)]
#[template(path = "partials/category_row.html")]
pub struct CategoryRowTemplate {
    pub row: CategoryRowView,
}

/// Values shown in the category form.
#[derive(Debug, Clone, Default)]
pub struct CategoryValues {
    pub name_en: String,
    pub name_ar: String,
    pub description: String,
}

/// Create or edit modal.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/category_form.html")]
pub struct CategoryFormTemplate {
    pub heading: &'static str,
    pub method: &'static str,
    pub action: String,
    pub values: CategoryValues,
    pub errors: FormErrors,
    pub error: Option<String>,
}

impl CategoryFormTemplate {
    fn new_category(values: CategoryValues) -> Self {
        Self {
            heading: "New category",
            method: "hx-post",
            action: BASE_PATH.to_string(),
            values,
            errors: FormErrors::new(),
            error: None,
        }
    }

    fn edit_category(id: CategoryId, values: CategoryValues) -> Self {
        Self {
            heading: "Edit category",
            method: "hx-put",
            action: format!("{BASE_PATH}/{id}"),
            values,
            errors: FormErrors::new(),
            error: None,
        }
    }

    fn render_response(&self) -> Result<Response> {
        Ok(Html(self.render()?).into_response())
    }
}

/// Category form data.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryForm {
    fn validate(&self) -> std::result::Result<CategoryInput, FormErrors> {
        let mut errors = FormErrors::new();
        match errors.required("name_en", &self.name_en) {
            Some(name_en) => Ok(CategoryInput {
                name_en,
                name_ar: optional(self.name_ar.as_deref()),
                description: optional(self.description.as_deref()),
            }),
            None => Err(errors),
        }
    }

    fn values(&self) -> CategoryValues {
        CategoryValues {
            name_en: self.name_en.trim().to_string(),
            name_ar: self.name_ar.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
        }
    }
}

async fn load_rows(
    state: &AppState,
    admin: &CurrentAdmin,
    query: &TableQuery,
) -> std::result::Result<Vec<CategoryRowTemplate>, ApiError> {
    let categories = state.catalog(admin).list_categories().await?;
    let rows = categories.iter().map(CategoryRowView::from).collect();
    Ok(query
        .apply(&table(), rows)
        .into_iter()
        .map(|row| CategoryRowTemplate { row })
        .collect())
}

/// Categories page; HTMX searches get only the table body.
#[instrument(skip(admin, state, ctx, headers))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ctx: PageContext,
    headers: HeaderMap,
    Query(query): Query<TableQuery>,
) -> Result<Response> {
    let config = table();
    let (rows, error) = match load_rows(&state, &admin, &query).await {
        Ok(rows) => (rows, None),
        Err(e) if is_htmx(&headers) => {
            let message = toast_message(e, "load categories")?;
            return Ok(toast_only(&Toast::error(message))?.into_response());
        }
        Err(e) => (Vec::new(), Some(load_failure(e, "categories")?)),
    };
    let body = config.body(&rows)?;
    if is_htmx(&headers) {
        return Ok(Html(body.render()?).into_response());
    }

    Ok(CatalogPageTemplate {
        ctx,
        title: "Categories",
        base_path: BASE_PATH,
        new_label: "New category",
        table: config.view(&query, &body)?,
        error,
    }
    .into_response())
}

#[instrument(skip_all)]
pub async fn new_form(RequireAdminAuth(_admin): RequireAdminAuth) -> Result<Response> {
    CategoryFormTemplate::new_category(CategoryValues::default()).render_response()
}

/// Edit modal. The backend has no single-category endpoint, so the category
/// is looked up in the (cached) list.
#[instrument(skip(admin, state))]
pub async fn edit_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    let categories = match state.catalog(&admin).list_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            let message = toast_message(e, "load category")?;
            return Ok(toast_only(&Toast::error(message))?.into_response());
        }
    };
    let Some(category) = categories.iter().find(|c| c.id == id) else {
        return Ok(toast_only(&Toast::error("Category not found"))?.into_response());
    };

    let row = CategoryRowView::from(category);
    CategoryFormTemplate::edit_category(
        id,
        CategoryValues {
            name_en: row.name_en,
            name_ar: row.name_ar,
            description: row.description,
        },
    )
    .render_response()
}

/// Create a category and insert its row at the top of the table.
#[instrument(skip(admin, state, form))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let mut modal = CategoryFormTemplate::new_category(form.values());
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            modal.errors = errors;
            return modal.render_response();
        }
    };

    match state.catalog(&admin).create_category(&input).await {
        Ok(category) => {
            tracing::info!(id = %category.id, name = %category.name_en, "Category created");
            Ok(Fragments::new()
                .push(&CategoryRowTemplate {
                    row: CategoryRowView::from(&category),
                })?
                .push(&RemoveEmptyRow {
                    table_id: "categories",
                })?
                .push(&CloseModal)?
                .push(&Toast::success(format!("Category {} created", category.name_en)))?
                .retarget("#categories-body", "afterbegin")
                .into_response())
        }
        Err(e) => {
            modal.error = Some(toast_message(e, "create category")?);
            modal.render_response()
        }
    }
}

/// Save an edited category and swap its row.
#[instrument(skip(admin, state, form))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let mut modal = CategoryFormTemplate::edit_category(id, form.values());
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            modal.errors = errors;
            return modal.render_response();
        }
    };

    match state.catalog(&admin).update_category(id, &input).await {
        Ok(category) => {
            tracing::info!(%id, "Category updated");
            Ok(Fragments::new()
                .push(&CategoryRowTemplate {
                    row: CategoryRowView::from(&category),
                })?
                .push(&CloseModal)?
                .push(&Toast::success(format!("Category {} saved", category.name_en)))?
                .retarget(&format!("#category-row-{id}"), "outerHTML")
                .into_response())
        }
        Err(e) => {
            modal.error = Some(toast_message(e, "save category")?);
            modal.render_response()
        }
    }
}

/// Delete a category; the empty body removes its row after the fade-out.
#[instrument(skip(admin, state))]
pub async fn remove(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    match state.catalog(&admin).delete_category(id).await {
        Ok(()) => {
            tracing::info!(%id, "Category deleted");
            Ok(Html("").into_response())
        }
        Err(e) => {
            let message = toast_message(e, "delete category")?;
            Ok(toast_only(&Toast::error(message))?.into_response())
        }
    }
}

/// `/categories` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(BASE_PATH, get(index).post(create))
        .route("/categories/new", get(new_form))
        .route("/categories/{id}", put(update).delete(remove))
        .route("/categories/{id}/edit", get(edit_form))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_english_name_required() {
        let errors = CategoryForm {
            name_en: " ".to_string(),
            name_ar: Some("فاكهة".to_string()),
            ..CategoryForm::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("name_en"), Some("This field is required"));
    }

    #[test]
    fn test_blank_optional_fields_are_omitted() {
        let input = CategoryForm {
            name_en: "Fruit".to_string(),
            name_ar: Some("  ".to_string()),
            description: None,
        }
        .validate()
        .unwrap();
        assert_eq!(input.name_en, "Fruit");
        assert!(input.name_ar.is_none());
        assert!(input.description.is_none());
    }

    #[test]
    fn test_row_renders_both_names_and_actions() {
        let category: Category =
            serde_json::from_str(r#"{"categoryId":4,"categoryNameEn":"Dates","categoryNameAr":"تمر"}"#)
                .unwrap();
        let html = CategoryRowTemplate {
            row: CategoryRowView::from(&category),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"id="category-row-4""#));
        assert!(html.contains(r#"dir="rtl""#));
        assert!(html.contains("تمر"));
        assert!(html.contains(r#"hx-get="/categories/4/edit""#));
        assert!(html.contains(r#"hx-swap="outerHTML swap:500ms""#));
    }

    #[test]
    fn test_sort_by_id_is_numeric() {
        let categories: Vec<Category> =
            serde_json::from_str(r#"[{"id":10,"nameEn":"A"},{"id":9,"nameEn":"B"}]"#).unwrap();
        let rows = categories.iter().map(CategoryRowView::from).collect();
        let query = TableQuery {
            sort: Some("id".to_string()),
            ..TableQuery::default()
        };
        let sorted = query.apply(&table(), rows);
        assert_eq!(sorted[0].id, CategoryId::new(9));
    }

    #[test]
    fn test_edit_form_puts_to_category() {
        let html = CategoryFormTemplate::edit_category(CategoryId::new(4), CategoryValues::default())
            .render()
            .unwrap();
        assert!(html.contains(r#"hx-put="/categories/4""#));
    }
}
