//! Products manager: list, create, edit and delete products.

use std::collections::HashMap;

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::{get, put},
};
use marketplace_client::{ApiError, ProductInput, ProductQuery};
use marketplace_core::validation::{FormErrors, optional};
use marketplace_core::{Category, CategoryId, Product, ProductId, StoreId};
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

const BASE_PATH: &str = "/products";

/// Products fetched for the manager table. Search and sort run on this list.
const ADMIN_PAGE_SIZE: u32 = 200;

fn table() -> DataTableConfig {
    DataTableConfig::new("products", BASE_PATH)
        .column(TableColumn::sortable("name", "Name"))
        .column(TableColumn::sortable("category", "Category"))
        .column(TableColumn::sortable("price", "Price"))
        .column(TableColumn::sortable("quantity", "Stock"))
        .column(TableColumn::new("organic", "Organic"))
        .column(TableColumn::sortable("status", "Status"))
        .search_placeholder("Search products...")
        .empty_state("No products found")
}

// =============================================================================
// View Types
// =============================================================================

/// Product row display data.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub stock: String,
    pub organic: bool,
    pub available: bool,
    pub store: String,
}

impl ProductRowView {
    #[must_use]
    pub fn new(product: &Product, category_names: &HashMap<CategoryId, String>) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            category: product
                .category_id
                .and_then(|id| category_names.get(&id).cloned())
                .unwrap_or_else(|| "-".to_string()),
            price: product.price.display(),
            price_cents: product.price.to_cents(),
            quantity: product.quantity,
            stock: format!("{} {}", product.quantity, product.unit_label()),
            organic: product.is_organic,
            available: product.is_available,
            store: product.store_name.clone().unwrap_or_default(),
        }
    }
}

impl TableRow for ProductRowView {
    fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.category, self.store)
    }

    fn sort_key(&self, key: &str) -> SortKey {
        match key {
            "category" => SortKey::text(&self.category),
            "price" => SortKey::Number(self.price_cents),
            "quantity" => SortKey::Number(i64::from(self.quantity)),
            "status" => SortKey::Number(i64::from(self.available)),
            _ => SortKey::text(&self.name),
        }
    }
}

/// One product row.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/product_row.html")]
pub struct ProductRowTemplate {
    pub row: ProductRowView,
}

/// A category in the form's select box.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub id: CategoryId,
    pub name: String,
    pub selected: bool,
}

/// Values shown in the product form.
#[derive(Debug, Clone, Default)]
pub struct ProductValues {
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
    pub unit: String,
    pub category_id: String,
    pub store_id: String,
    pub image_url: String,
    pub is_organic: bool,
    pub is_available: bool,
}

impl ProductValues {
    fn blank() -> Self {
        Self {
            quantity: "0".to_string(),
            is_available: true,
            ..Self::default()
        }
    }
}

impl From<&Product> for ProductValues {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.amount().to_string(),
            quantity: product.quantity.to_string(),
            unit: product.unit.clone().unwrap_or_default(),
            category_id: product
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            store_id: product.store_id.map(|id| id.to_string()).unwrap_or_default(),
            image_url: product.image_url.clone().unwrap_or_default(),
            is_organic: product.is_organic,
            is_available: product.is_available,
        }
    }
}

/// Create or edit modal.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/product_form.html")]
pub struct ProductFormTemplate {
    pub heading: &'static str,
    /// `hx-post` for new products, `hx-put` for edits.
    pub method: &'static str,
    pub action: String,
    pub values: ProductValues,
    pub categories: Vec<CategoryOption>,
    pub errors: FormErrors,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new_product(values: ProductValues, categories: &[Category]) -> Self {
        Self {
            heading: "New product",
            method: "hx-post",
            action: BASE_PATH.to_string(),
            categories: category_options(categories, &values.category_id),
            values,
            errors: FormErrors::new(),
            error: None,
        }
    }

    fn edit_product(id: ProductId, values: ProductValues, categories: &[Category]) -> Self {
        Self {
            heading: "Edit product",
            method: "hx-put",
            action: format!("{BASE_PATH}/{id}"),
            categories: category_options(categories, &values.category_id),
            values,
            errors: FormErrors::new(),
            error: None,
        }
    }
}

fn category_options(categories: &[Category], selected: &str) -> Vec<CategoryOption> {
    categories
        .iter()
        .map(|category| CategoryOption {
            id: category.id,
            name: category.name_en.clone(),
            selected: category.id.to_string() == selected,
        })
        .collect()
}

// =============================================================================
// Form Types
// =============================================================================

/// Product form data. Checkboxes are absent when unticked.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_organic: Option<String>,
    #[serde(default)]
    pub is_available: Option<String>,
}

impl ProductForm {
    fn validate(&self) -> std::result::Result<ProductInput, FormErrors> {
        let mut errors = FormErrors::new();
        let name = errors.required("name", &self.name);
        let price = errors.price("price", &self.price);
        let quantity = errors.quantity("quantity", &self.quantity);
        let category_id = self.category_id.parse::<CategoryId>().ok();
        if category_id.is_none() {
            errors.add("category_id", "Choose a category");
        }
        let store_id = match optional(self.store_id.as_deref()) {
            None => None,
            Some(raw) => {
                let parsed = raw.parse::<StoreId>().ok();
                if parsed.is_none() {
                    errors.add("store_id", "Enter a numeric store ID");
                }
                parsed
            }
        };

        match (name, price, quantity, category_id) {
            (Some(name), Some(price), Some(quantity), Some(category_id)) if errors.is_empty() => {
                Ok(ProductInput {
                    name,
                    description: optional(self.description.as_deref()),
                    price,
                    quantity,
                    unit: optional(self.unit.as_deref()),
                    category_id,
                    is_organic: self.is_organic.is_some(),
                    is_available: self.is_available.is_some(),
                    store_id,
                    image_url: optional(self.image_url.as_deref()),
                })
            }
            _ => Err(errors),
        }
    }
}

impl From<&ProductForm> for ProductValues {
    fn from(form: &ProductForm) -> Self {
        Self {
            name: form.name.trim().to_string(),
            description: form.description.clone().unwrap_or_default(),
            price: form.price.trim().to_string(),
            quantity: form.quantity.trim().to_string(),
            unit: form.unit.clone().unwrap_or_default(),
            category_id: form.category_id.clone(),
            store_id: form.store_id.clone().unwrap_or_default(),
            image_url: form.image_url.clone().unwrap_or_default(),
            is_organic: form.is_organic.is_some(),
            is_available: form.is_available.is_some(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Categories for labels and the select box. A failure only costs the
/// labels, so it is logged rather than raised.
async fn categories(state: &AppState, admin: &CurrentAdmin) -> Result<Vec<Category>> {
    match state.catalog(admin).list_categories().await {
        Ok(categories) => Ok(categories),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories for products");
            Ok(Vec::new())
        }
    }
}

fn category_names(categories: &[Category]) -> HashMap<CategoryId, String> {
    categories
        .iter()
        .map(|category| (category.id, category.name_en.clone()))
        .collect()
}

async fn load_rows(
    state: &AppState,
    admin: &CurrentAdmin,
    query: &TableQuery,
) -> std::result::Result<Vec<ProductRowTemplate>, ApiError> {
    let catalog = state.catalog(admin);
    let listing = ProductQuery {
        size: ADMIN_PAGE_SIZE,
        ..ProductQuery::default()
    };
    let (products, categories) = tokio::join!(
        catalog.list_products(&listing),
        catalog.list_categories()
    );
    let names = category_names(&categories.unwrap_or_default());
    let rows = products?
        .items
        .iter()
        .map(|product| ProductRowView::new(product, &names))
        .collect();
    Ok(query
        .apply(&table(), rows)
        .into_iter()
        .map(|row| ProductRowTemplate { row })
        .collect())
}

fn form_response(form: &ProductFormTemplate) -> Result<Response> {
    Ok(Html(form.render()?).into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Products page; HTMX searches get only the table body.
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
            let message = toast_message(e, "load products")?;
            return Ok(toast_only(&Toast::error(message))?.into_response());
        }
        Err(e) => (Vec::new(), Some(load_failure(e, "products")?)),
    };
    let body = config.body(&rows)?;
    if is_htmx(&headers) {
        return Ok(Html(body.render()?).into_response());
    }

    Ok(CatalogPageTemplate {
        ctx,
        title: "Products",
        base_path: BASE_PATH,
        new_label: "New product",
        table: config.view(&query, &body)?,
        error,
    }
    .into_response())
}

/// Empty create modal.
#[instrument(skip(admin, state))]
pub async fn new_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Response> {
    let categories = categories(&state, &admin).await?;
    form_response(&ProductFormTemplate::new_product(
        ProductValues::blank(),
        &categories,
    ))
}

/// Edit modal filled from the backend's current product.
#[instrument(skip(admin, state))]
pub async fn edit_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = match state.catalog(&admin).get_product(id).await {
        Ok(product) => product,
        Err(e) => {
            let message = toast_message(e, "load product")?;
            return Ok(toast_only(&Toast::error(message))?.into_response());
        }
    };
    let categories = categories(&state, &admin).await?;
    form_response(&ProductFormTemplate::edit_product(
        id,
        ProductValues::from(&product),
        &categories,
    ))
}

/// Create a product and insert its row at the top of the table.
#[instrument(skip(admin, state, form))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let categories = categories(&state, &admin).await?;
    let mut modal = ProductFormTemplate::new_product(ProductValues::from(&form), &categories);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            modal.errors = errors;
            return form_response(&modal);
        }
    };

    match state.catalog(&admin).create_product(&input).await {
        Ok(product) => {
            tracing::info!(id = %product.id, name = %product.name, "Product created");
            let row = ProductRowTemplate {
                row: ProductRowView::new(&product, &category_names(&categories)),
            };
            Ok(Fragments::new()
                .push(&row)?
                .push(&RemoveEmptyRow {
                    table_id: "products",
                })?
                .push(&CloseModal)?
                .push(&Toast::success(format!("Product {} created", product.name)))?
                .retarget("#products-body", "afterbegin")
                .into_response())
        }
        Err(e) => {
            modal.error = Some(toast_message(e, "create product")?);
            form_response(&modal)
        }
    }
}

/// Save an edited product and swap its row.
#[instrument(skip(admin, state, form))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let categories = categories(&state, &admin).await?;
    let mut modal = ProductFormTemplate::edit_product(id, ProductValues::from(&form), &categories);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            modal.errors = errors;
            return form_response(&modal);
        }
    };

    match state.catalog(&admin).update_product(id, &input).await {
        Ok(product) => {
            tracing::info!(%id, "Product updated");
            let row = ProductRowTemplate {
                row: ProductRowView::new(&product, &category_names(&categories)),
            };
            Ok(Fragments::new()
                .push(&row)?
                .push(&CloseModal)?
                .push(&Toast::success(format!("Product {} saved", product.name)))?
                .retarget(&format!("#product-row-{id}"), "outerHTML")
                .into_response())
        }
        Err(e) => {
            modal.error = Some(toast_message(e, "save product")?);
            form_response(&modal)
        }
    }
}

/// Delete a product; the empty body removes its row after the fade-out.
#[instrument(skip(admin, state))]
pub async fn remove(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    match state.catalog(&admin).delete_product(id).await {
        Ok(()) => {
            tracing::info!(%id, "Product deleted");
            Ok(Html("").into_response())
        }
        Err(e) => {
            let message = toast_message(e, "delete product")?;
            Ok(toast_only(&Toast::error(message))?.into_response())
        }
    }
}

/// `/products` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(BASE_PATH, get(index).post(create))
        .route("/products/new", get(new_form))
        .route("/products/{id}", put(update).delete(remove))
        .route("/products/{id}/edit", get(edit_form))
}
