//! Marketplace listing state, filtering and cart button states.

use std::collections::HashMap;

use marketplace_client::ProductQuery;
use marketplace_core::{CartItem, CategoryId, Product, ProductId};
use serde::{Deserialize, Serialize};

/// Products per page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Filters chosen in the marketplace sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilters {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub organic: Option<bool>,
}

impl ProductFilters {
    /// Trim the search text; blank text means no search.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ..self
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.search.is_some() || self.category_id.is_some() || self.organic.is_some()
    }
}

/// One buyer's marketplace view: filters plus the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingState {
    pub filters: ProductFilters,
    /// 1-based.
    pub current_page: u32,
    pub page_size: u32,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            filters: ProductFilters::default(),
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListingState {
    /// Replace the filters and go back to the first page.
    pub fn apply_filters(&mut self, filters: ProductFilters) {
        self.filters = filters.normalized();
        self.current_page = 1;
    }

    pub fn go_to_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    /// The backend request for the current state.
    #[must_use]
    pub fn query(&self) -> ProductQuery {
        ProductQuery {
            search: self.filters.search.clone(),
            category_id: self.filters.category_id,
            organic: self.filters.organic,
            page: self.current_page,
            size: self.page_size,
        }
    }
}

/// State of a product card's cart button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartButton {
    AddToCart,
    InCart { quantity: u32 },
}

/// Button state for each product, by matching product ids against the cart.
#[must_use]
pub fn button_states(products: &[Product], cart_items: &[CartItem]) -> Vec<(ProductId, CartButton)> {
    let in_cart: HashMap<ProductId, u32> = cart_items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();

    products
        .iter()
        .map(|product| {
            let button = in_cart
                .get(&product.id)
                .map_or(CartButton::AddToCart, |&quantity| CartButton::InCart { quantity });
            (product.id, button)
        })
        .collect()
}

/// One numbered page link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLink {
    pub number: u32,
    pub current: bool,
}

/// Page links under the product grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current: u32,
    pub total: u32,
    pub pages: Vec<PageLink>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl Pagination {
    #[must_use]
    pub fn new(current: u32, total_pages: u32) -> Self {
        let total = total_pages.max(1);
        let current = current.clamp(1, total);
        Self {
            current,
            total,
            pages: (1..=total)
                .map(|number| PageLink {
                    number,
                    current: number == current,
                })
                .collect(),
            prev: (current > 1).then(|| current - 1),
            next: (current < total).then(|| current + 1),
        }
    }

    /// Whether there is more than one page to link.
    #[must_use]
    pub const fn is_needed(&self) -> bool {
        self.total > 1
    }
}
