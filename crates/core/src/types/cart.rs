//! Cart DTOs and the quantity rules shared by the cart page and the API client.

use serde::{Deserialize, Serialize};

use super::id::{CartItemId, ProductId};
use super::price::Price;

/// Upper bound used when the backend does not report available stock.
pub const DEFAULT_MAX_QUANTITY: u32 = 99;

/// A line in a buyer's cart, as returned by `GET /api/cart`.
///
/// The cart item ID is distinct from the product ID it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Cart item ID (`id` or `cartItemId`).
    #[serde(alias = "cartItemId")]
    pub id: CartItemId,
    /// Product ID, coerced to an integer.
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    /// Product display name.
    #[serde(alias = "name")]
    pub product_name: String,
    /// Unit price.
    #[serde(alias = "price")]
    pub product_price: Price,
    /// Quantity in the cart.
    pub quantity: u32,
    /// Stock available for this product, when the backend reports it.
    #[serde(default, alias = "stock", alias = "availableStock")]
    pub available_quantity: Option<u32>,
    /// Product image URL.
    #[serde(default, alias = "imageUrl", alias = "image")]
    pub product_image: Option<String>,
}

impl CartItem {
    /// Price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product_price.times(self.quantity)
    }

    /// Largest quantity this line may be set to (never below 1).
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.available_quantity
            .unwrap_or(DEFAULT_MAX_QUANTITY)
            .max(1)
    }

    /// Clamp a requested quantity into `[1, max_quantity()]`.
    #[must_use]
    pub fn clamp(&self, requested: i64) -> u32 {
        clamp_quantity(requested, self.max_quantity())
    }
}

/// Clamp a requested quantity into `[1, available]`.
///
/// `available` of 0 still yields 1; a quantity below 1 is never produced.
#[must_use]
pub fn clamp_quantity(requested: i64, available: u32) -> u32 {
    let upper = i64::from(available.max(1));
    let clamped = requested.clamp(1, upper);
    u32::try_from(clamped).unwrap_or(1)
}

/// Totals computed from the cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    /// Sum of line totals.
    pub subtotal: Price,
    /// Amount due. Tax and shipping are computed by the backend at checkout.
    pub total: Price,
    /// Sum of quantities.
    pub item_count: u32,
}

impl CartSummary {
    /// Compute the summary for a set of cart lines.
    #[must_use]
    pub fn of(items: &[CartItem]) -> Self {
        let subtotal: Price = items.iter().map(CartItem::line_total).sum();
        Self {
            subtotal,
            total: subtotal,
            item_count: items.iter().map(|item| item.quantity).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(json: &str) -> CartItem {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialize_canonical_shape() {
        let line = item(
            r#"{"id":1,"productId":42,"productName":"Honey","productPrice":10,
                "quantity":2,"availableQuantity":5,"productImage":"/img/honey.jpg"}"#,
        );
        assert_eq!(line.id, CartItemId::new(1));
        assert_eq!(line.product_id, ProductId::new(42));
        assert_eq!(line.available_quantity, Some(5));
        assert_eq!(line.product_image.as_deref(), Some("/img/honey.jpg"));
    }

    #[test]
    fn test_deserialize_alternate_shape() {
        let line = item(
            r#"{"cartItemId":3,"productId":"42","name":"Eggs","price":"4.50","quantity":1,"stock":12}"#,
        );
        assert_eq!(line.id, CartItemId::new(3));
        assert_eq!(line.product_id, ProductId::new(42));
        assert_eq!(line.product_name, "Eggs");
        assert_eq!(line.available_quantity, Some(12));
    }

    #[test]
    fn test_clamp_quantity_bounds() {
        assert_eq!(clamp_quantity(0, 5), 1);
        assert_eq!(clamp_quantity(-3, 5), 1);
        assert_eq!(clamp_quantity(3, 5), 3);
        assert_eq!(clamp_quantity(9, 5), 5);
        assert_eq!(clamp_quantity(4, 0), 1);
        assert_eq!(clamp_quantity(i64::MAX, u32::MAX), u32::MAX);
    }

    #[test]
    fn test_max_quantity_defaults_when_stock_unknown() {
        let line = item(r#"{"id":1,"productId":1,"productName":"x","productPrice":1,"quantity":1}"#);
        assert_eq!(line.max_quantity(), DEFAULT_MAX_QUANTITY);
        assert_eq!(line.clamp(500), DEFAULT_MAX_QUANTITY);
    }

    #[test]
    fn test_summary() {
        let items = vec![
            item(r#"{"id":1,"productId":1,"productName":"a","productPrice":10,"quantity":2}"#),
            item(r#"{"id":2,"productId":2,"productName":"b","productPrice":2.5,"quantity":1}"#),
        ];
        let summary = CartSummary::of(&items);
        assert_eq!(summary.subtotal.display(), "$22.50");
        assert_eq!(summary.total, summary.subtotal);
        assert_eq!(summary.item_count, 3);
    }

    #[test]
    fn test_summary_empty() {
        let summary = CartSummary::of(&[]);
        assert_eq!(summary.total.display(), "$0.00");
        assert_eq!(summary.item_count, 0);
    }
}
