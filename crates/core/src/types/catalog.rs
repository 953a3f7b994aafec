//! Catalog DTOs: products, categories and stores.

use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId, StoreId};
use super::price::Price;

const fn default_true() -> bool {
    true
}

/// A product listed by a seller's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID (`productId` or `id`).
    #[serde(alias = "productId")]
    pub id: ProductId,
    /// Display name (`productName` or `name`).
    #[serde(alias = "productName")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price.
    pub price: Price,
    /// Quantity in stock.
    #[serde(default, alias = "stock", alias = "availableQuantity")]
    pub quantity: u32,
    /// Unit of sale (e.g., `kg`, `dozen`).
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, alias = "organic")]
    pub is_organic: bool,
    #[serde(default = "default_true", alias = "available")]
    pub is_available: bool,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default, alias = "productImage", alias = "image")]
    pub image_url: Option<String>,
}

impl Product {
    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.is_available && self.quantity > 0
    }

    /// Unit label for display, defaulting to `each`.
    #[must_use]
    pub fn unit_label(&self) -> &str {
        self.unit.as_deref().filter(|u| !u.is_empty()).unwrap_or("each")
    }
}

/// A product category with English and Arabic names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Category ID (`categoryId` or `id`).
    #[serde(alias = "categoryId")]
    pub id: CategoryId,
    /// English name (`nameEn`, `categoryNameEn` or `name`).
    #[serde(alias = "categoryNameEn", alias = "name")]
    pub name_en: String,
    /// Arabic name (`nameAr` or `categoryNameAr`).
    #[serde(default, alias = "categoryNameAr")]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A seller's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    #[serde(alias = "storeId")]
    pub id: StoreId,
    #[serde(alias = "storeName")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_listing_shape() {
        let product: Product = serde_json::from_str(
            r#"{"productId":5,"productName":"Tomatoes","price":3.25,"quantity":40,
                "unit":"kg","categoryId":2,"isOrganic":true,"isAvailable":true,"storeId":9}"#,
        )
        .unwrap();
        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.name, "Tomatoes");
        assert_eq!(product.category_id, Some(CategoryId::new(2)));
        assert!(product.is_organic);
        assert!(product.is_purchasable());
        assert_eq!(product.unit_label(), "kg");
    }

    #[test]
    fn test_product_from_admin_shape() {
        let product: Product =
            serde_json::from_str(r#"{"id":"5","name":"Tomatoes","price":"3.25","organic":false}"#)
                .unwrap();
        assert_eq!(product.id, ProductId::new(5));
        assert!(product.is_available);
        assert!(!product.is_purchasable());
        assert_eq!(product.unit_label(), "each");
    }

    #[test]
    fn test_category_name_spellings() {
        for json in [
            r#"{"id":1,"nameEn":"Fruit","nameAr":"فاكهة"}"#,
            r#"{"categoryId":1,"categoryNameEn":"Fruit","categoryNameAr":"فاكهة"}"#,
            r#"{"id":1,"name":"Fruit"}"#,
        ] {
            let category: Category = serde_json::from_str(json).unwrap();
            assert_eq!(category.id, CategoryId::new(1));
            assert_eq!(category.name_en, "Fruit");
        }
    }

    #[test]
    fn test_store_shape() {
        let store: Store = serde_json::from_str(r#"{"storeId":3,"storeName":"Green Acres"}"#).unwrap();
        assert_eq!(store.name, "Green Acres");
    }
}
