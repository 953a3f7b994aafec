//! Cart display data for templates.

use marketplace_core::{CartItem, CartItemId, CartSummary, ProductId};

/// One cart row as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRowView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub max_quantity: u32,
    pub line_total: String,
    /// Quantity the minus button sends.
    pub decrement: u32,
    /// Quantity the plus button sends.
    pub increment: u32,
    pub minus_disabled: bool,
    pub plus_disabled: bool,
    /// An update for this row is waiting to be sent.
    pub pending: bool,
}

impl CartRowView {
    #[must_use]
    pub fn new(item: &CartItem, pending: bool) -> Self {
        let max_quantity = item.max_quantity();
        Self {
            id: item.id,
            product_id: item.product_id,
            name: item.product_name.clone(),
            image: item.product_image.clone(),
            unit_price: item.product_price.display(),
            quantity: item.quantity,
            max_quantity,
            line_total: item.line_total().display(),
            decrement: item.quantity.saturating_sub(1).max(1),
            increment: item.quantity.saturating_add(1).min(max_quantity),
            minus_disabled: item.quantity <= 1,
            plus_disabled: item.quantity >= max_quantity,
            pending,
        }
    }
}

/// Order summary panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    pub subtotal: String,
    pub total: String,
    pub item_count: u32,
}

impl From<CartSummary> for SummaryView {
    fn from(summary: CartSummary) -> Self {
        Self {
            subtotal: summary.subtotal.display(),
            total: summary.total.display(),
            item_count: summary.item_count,
        }
    }
}

/// The whole cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub rows: Vec<CartRowView>,
    pub summary: SummaryView,
}

impl CartView {
    #[must_use]
    pub fn new(items: &[CartItem]) -> Self {
        Self {
            rows: items.iter().map(|item| CartRowView::new(item, false)).collect(),
            summary: CartSummary::of(items).into(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(&[])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
