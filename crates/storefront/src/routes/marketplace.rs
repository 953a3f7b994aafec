//! Marketplace listing route handlers.
//!
//! The buyer's filters and page live in the session as a [`ListingState`],
//! so paging and filtering fragments build on each other.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use marketplace_client::ApiError;
use marketplace_core::{CartItem, CategoryId, Page, Product, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalUser, PageContext};
use crate::models::{SessionUser, session_keys};
use crate::services::marketplace::{
    CartButton, ListingState, Pagination, ProductFilters, button_states,
};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// A product card's cart button; also sent out of band after cart changes.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/cart_button.html")]
pub struct CartButtonFragment {
    pub product_id: ProductId,
    pub in_cart: bool,
    pub quantity: u32,
    pub purchasable: bool,
    pub oob: bool,
}

impl CartButtonFragment {
    #[must_use]
    pub const fn new(product_id: ProductId, button: CartButton, purchasable: bool) -> Self {
        let (in_cart, quantity) = match button {
            CartButton::AddToCart => (false, 0),
            CartButton::InCart { quantity } => (true, quantity),
        };
        Self {
            product_id,
            in_cart,
            quantity,
            purchasable,
            oob: false,
        }
    }

    #[must_use]
    pub const fn out_of_band(mut self) -> Self {
        self.oob = true;
        self
    }
}

/// Product card display data.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub unit: String,
    pub stock: u32,
    pub image: Option<String>,
    pub organic: bool,
    pub store_name: Option<String>,
    pub button_html: String,
}

impl ProductCardView {
    fn new(product: &Product, button: CartButton) -> std::result::Result<Self, askama::Error> {
        let button_html =
            CartButtonFragment::new(product.id, button, product.is_purchasable()).render()?;
        Ok(Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone().filter(|d| !d.is_empty()),
            price: product.price.display(),
            unit: product.unit_label().to_string(),
            stock: product.quantity,
            image: product.image_url.clone(),
            organic: product.is_organic,
            store_name: product.store_name.clone(),
            button_html,
        })
    }
}

/// Category filter option.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub id: CategoryId,
    pub name: String,
    pub selected: bool,
}

/// Product grid fragment (HTMX target `#product-grid`).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub cards: Vec<ProductCardView>,
    pub pagination: Pagination,
    pub total_items: u64,
    pub error: Option<String>,
}

/// Marketplace page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketplace/index.html")]
pub struct MarketplaceTemplate {
    pub ctx: PageContext,
    pub search: String,
    pub categories: Vec<CategoryOption>,
    pub organic: &'static str,
    pub grid_html: String,
}

/// Filter form as submitted; empty selects arrive as empty strings.
#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub organic: Option<String>,
}

impl From<FilterForm> for ProductFilters {
    fn from(form: FilterForm) -> Self {
        Self {
            search: form.search,
            category_id: form
                .category_id
                .as_deref()
                .and_then(|id| id.trim().parse().ok()),
            organic: match form.organic.as_deref().map(str::trim) {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
        }
        .normalized()
    }
}

const fn organic_value(organic: Option<bool>) -> &'static str {
    match organic {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn load_listing(session: &Session) -> ListingState {
    session
        .get::<ListingState>(session_keys::LISTING_STATE)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn save_listing(session: &Session, listing: &ListingState) -> Result<()> {
    session.insert(session_keys::LISTING_STATE, listing).await?;
    Ok(())
}

// =============================================================================
// Grid Rendering
// =============================================================================

/// Cart lines for button states; anonymous users and failures show every
/// product as addable.
async fn cart_items(state: &AppState, user: Option<&SessionUser>) -> Vec<CartItem> {
    let Some(user) = user else {
        return Vec::new();
    };
    match state.cart_sync(user).await.items().await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load cart for button states");
            Vec::new()
        }
    }
}

async fn fetch_products(
    state: &AppState,
    user: Option<&SessionUser>,
    listing: &ListingState,
) -> std::result::Result<Page<Product>, ApiError> {
    state
        .api()
        .catalog(user.map(SessionUser::credentials))
        .list_products(&listing.query())
        .await
}

async fn build_grid(
    state: &AppState,
    user: Option<&SessionUser>,
    listing: &ListingState,
) -> Result<ProductGridTemplate> {
    let page = match fetch_products(state, user, listing).await {
        Ok(page) => page,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products");
            return Ok(ProductGridTemplate {
                cards: Vec::new(),
                pagination: Pagination::new(listing.current_page, 1),
                total_items: 0,
                error: Some("Failed to load products".to_string()),
            });
        }
    };

    let items = cart_items(state, user).await;
    let states = button_states(&page.items, &items);
    let cards = page
        .items
        .iter()
        .zip(states)
        .map(|(product, (_, button))| ProductCardView::new(product, button))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ProductGridTemplate {
        cards,
        pagination: Pagination::new(listing.current_page, page.total_pages),
        total_items: page.total_items,
        error: None,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the marketplace page.
#[instrument(skip(state, session, ctx, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    OptionalUser(user): OptionalUser,
) -> Result<Response> {
    let listing = load_listing(&session).await;
    let grid = build_grid(&state, user.as_ref(), &listing).await?;

    let categories = match state.api().catalog(None).list_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories");
            Vec::new()
        }
    };

    Ok(MarketplaceTemplate {
        ctx,
        search: listing.filters.search.clone().unwrap_or_default(),
        categories: categories
            .into_iter()
            .map(|category| CategoryOption {
                selected: listing.filters.category_id == Some(category.id),
                id: category.id,
                name: category.name_en,
            })
            .collect(),
        organic: organic_value(listing.filters.organic),
        grid_html: grid.render()?,
    }
    .into_response())
}

/// Apply filters and return the first page of results (HTMX).
#[instrument(skip(state, session, user))]
pub async fn filter(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Query(form): Query<FilterForm>,
) -> Result<Response> {
    let mut listing = load_listing(&session).await;
    listing.apply_filters(form.into());
    save_listing(&session, &listing).await?;

    let grid = build_grid(&state, user.as_ref(), &listing).await?;
    Ok(grid.into_response())
}

/// Go to a page of the current results (HTMX).
#[instrument(skip(state, session, user))]
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Path(page): Path<u32>,
) -> Result<Response> {
    let mut listing = load_listing(&session).await;
    listing.go_to_page(page);
    save_listing(&session, &listing).await?;

    let grid = build_grid(&state, user.as_ref(), &listing).await?;
    Ok(grid.into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_form_parses_empty_selects_as_unset() {
        let filters: ProductFilters = FilterForm {
            search: Some(String::new()),
            category_id: Some(String::new()),
            organic: Some(String::new()),
        }
        .into();
        assert_eq!(filters, ProductFilters::default());
    }

    #[test]
    fn test_filter_form_parses_values() {
        let filters: ProductFilters = FilterForm {
            search: Some(" tomatoes ".to_string()),
            category_id: Some("4".to_string()),
            organic: Some("false".to_string()),
        }
        .into();
        assert_eq!(filters.search.as_deref(), Some("tomatoes"));
        assert_eq!(filters.category_id, Some(CategoryId::new(4)));
        assert_eq!(filters.organic, Some(false));
    }

    #[test]
    fn test_cart_button_states_render() {
        let add = CartButtonFragment::new(ProductId::new(3), CartButton::AddToCart, true)
            .render()
            .unwrap();
        assert!(add.contains(r#"hx-post="/cart/add""#));
        assert!(add.contains(r#"id="cart-button-3""#));

        let in_cart =
            CartButtonFragment::new(ProductId::new(3), CartButton::InCart { quantity: 2 }, true)
                .out_of_band()
                .render()
                .unwrap();
        assert!(in_cart.contains("In cart (2)"));
        assert!(in_cart.contains(r#"hx-swap-oob="true""#));

        let sold_out = CartButtonFragment::new(ProductId::new(3), CartButton::AddToCart, false)
            .render()
            .unwrap();
        assert!(sold_out.contains("Out of stock"));
    }

    #[test]
    fn test_grid_counts_products() {
        let product: Product =
            serde_json::from_str(r#"{"id":5,"name":"Tomatoes","price":"3.25","quantity":4}"#)
                .unwrap();
        let render = |total_items| {
            ProductGridTemplate {
                cards: vec![ProductCardView::new(&product, CartButton::AddToCart).unwrap()],
                pagination: Pagination::new(1, 1),
                total_items,
                error: None,
            }
            .render()
            .unwrap()
        };
        assert!(render(1).contains(">1 product<"));
        assert!(render(26).contains(">26 products<"));
    }

    #[test]
    fn test_grid_error_panel() {
        let html = ProductGridTemplate {
            cards: Vec::new(),
            pagination: Pagination::new(2, 1),
            total_items: 0,
            error: Some("Failed to load products".to_string()),
        }
        .render()
        .unwrap();
        assert!(html.contains("Failed to load products"));
        assert!(!html.contains("pagination"));
    }
}
