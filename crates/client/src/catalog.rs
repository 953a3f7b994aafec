//! Product, category and store endpoints.

use marketplace_core::{Category, CategoryId, Page, Price, Product, ProductId, Store, StoreId};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::client::{ApiClient, Credentials};
use crate::error::ApiError;

/// Searches at least this long go to the full-text search endpoint.
pub const MIN_FULL_SEARCH_CHARS: usize = 3;

const CATEGORIES_KEY: &str = "categories";

/// Which backend endpoint serves a product listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRoute {
    /// No search text: `GET /api/products`.
    Browse,
    /// Short search text: `GET /api/products/search`.
    QuickSearch,
    /// Search text of [`MIN_FULL_SEARCH_CHARS`] or more: `POST /api/products/search`.
    FullSearch,
}

impl SearchRoute {
    /// Pick the endpoint for a search string. Whitespace is ignored.
    #[must_use]
    pub fn for_search(search: Option<&str>) -> Self {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::Browse,
            Some(s) if s.chars().count() < MIN_FULL_SEARCH_CHARS => Self::QuickSearch,
            Some(_) => Self::FullSearch,
        }
    }
}

/// A product listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub organic: Option<bool>,
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: None,
            category_id: None,
            organic: None,
            page: 1,
            size: 12,
        }
    }
}

impl ProductQuery {
    /// Trimmed, non-empty search text.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Endpoint that serves this query.
    #[must_use]
    pub fn route(&self) -> SearchRoute {
        SearchRoute::for_search(self.search.as_deref())
    }

    /// Query-string parameters for the GET endpoints. Unset filters are omitted.
    #[must_use]
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("size", self.size.to_string()),
        ];
        if let Some(search) = self.search_text() {
            params.push(("search", search.to_string()));
        }
        if let Some(category_id) = self.category_id {
            params.push(("categoryId", category_id.to_string()));
        }
        if let Some(organic) = self.organic {
            params.push(("organic", organic.to_string()));
        }
        params
    }

    fn search_body(&self) -> SearchBody<'_> {
        SearchBody {
            query: self.search_text().unwrap_or_default(),
            category_id: self.category_id,
            organic: self.organic,
            page: self.page.max(1),
            size: self.size,
            sort_by: "relevance",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organic: Option<bool>,
    page: u32,
    size: u32,
    sort_by: &'static str,
}

/// Fields of a product create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Price,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub category_id: CategoryId,
    pub is_organic: bool,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<StoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Fields of a category create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_ar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalog endpoints. Reads work anonymously; writes need admin credentials.
#[derive(Debug, Clone)]
pub struct CatalogApi {
    client: ApiClient,
    credentials: Option<Credentials>,
}

impl CatalogApi {
    pub(crate) const fn new(client: ApiClient, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// One page of products matching `query`, routed per [`SearchRoute`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let credentials = self.credentials.as_ref();
        let route = query.route();
        debug!(route = ?route, "Listing products");

        let request = match route {
            SearchRoute::Browse => self
                .client
                .request(Method::GET, "/api/products", credentials)
                .query(&query.query_params()),
            SearchRoute::QuickSearch => self
                .client
                .request(Method::GET, "/api/products/search", credentials)
                .query(&query.query_params()),
            SearchRoute::FullSearch => self
                .client
                .request(Method::POST, "/api/products/search", credentials)
                .json(&query.search_body()),
        };
        self.client.fetch(request).await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.client
            .get(&format!("/api/products/{id}"), self.credentials.as_ref())
            .await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        self.client
            .send_json(Method::POST, "/api/products", self.credentials.as_ref(), input)
            .await
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        self.client
            .send_json(
                Method::PUT,
                &format!("/api/products/{id}"),
                self.credentials.as_ref(),
                input,
            )
            .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        let request = self.client.request(
            Method::DELETE,
            &format!("/api/products/{id}"),
            self.credentials.as_ref(),
        );
        self.client.send_unit(request).await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories. Cached for five minutes; writes invalidate the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache = self.client.category_cache();
        if let Some(categories) = cache.get(CATEGORIES_KEY).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let page: Page<Category> = self
            .client
            .get("/api/categories", self.credentials.as_ref())
            .await?;
        cache.insert(CATEGORIES_KEY, page.items.clone()).await;
        Ok(page.items)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the category.
    #[instrument(skip(self, input), fields(name = %input.name_en))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        let category = self
            .client
            .send_json(Method::POST, "/api/categories", self.credentials.as_ref(), input)
            .await?;
        self.client.category_cache().invalidate_all();
        Ok(category)
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, input), fields(name = %input.name_en))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let category = self
            .client
            .send_json(
                Method::PUT,
                &format!("/api/categories/{id}"),
                self.credentials.as_ref(),
                input,
            )
            .await?;
        self.client.category_cache().invalidate_all();
        Ok(category)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), ApiError> {
        let request = self.client.request(
            Method::DELETE,
            &format!("/api/categories/{id}"),
            self.credentials.as_ref(),
        );
        self.client.send_unit(request).await?;
        self.client.category_cache().invalidate_all();
        Ok(())
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// A seller's store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn get_store(&self, id: StoreId) -> Result<Store, ApiError> {
        self.client
            .get(&format!("/api/stores/{id}"), self.credentials.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_route_threshold() {
        assert_eq!(SearchRoute::for_search(None), SearchRoute::Browse);
        assert_eq!(SearchRoute::for_search(Some("   ")), SearchRoute::Browse);
        assert_eq!(SearchRoute::for_search(Some("ab")), SearchRoute::QuickSearch);
        assert_eq!(SearchRoute::for_search(Some(" ab ")), SearchRoute::QuickSearch);
        assert_eq!(SearchRoute::for_search(Some("abc")), SearchRoute::FullSearch);
        // characters, not bytes
        assert_eq!(SearchRoute::for_search(Some("تفا")), SearchRoute::FullSearch);
        assert_eq!(SearchRoute::for_search(Some("تف")), SearchRoute::QuickSearch);
    }

    #[test]
    fn test_query_params_omit_unset_filters() {
        let query = ProductQuery::default();
        assert_eq!(
            query.query_params(),
            vec![("page", "1".to_string()), ("size", "12".to_string())]
        );
    }

    #[test]
    fn test_query_params_reflect_filters() {
        let query = ProductQuery {
            search: Some("ab".to_string()),
            category_id: Some(CategoryId::new(3)),
            organic: Some(false),
            page: 2,
            size: 24,
        };
        assert_eq!(
            query.query_params(),
            vec![
                ("page", "2".to_string()),
                ("size", "24".to_string()),
                ("search", "ab".to_string()),
                ("categoryId", "3".to_string()),
                ("organic", "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_body() {
        let query = ProductQuery {
            search: Some(" honey ".to_string()),
            organic: Some(true),
            ..ProductQuery::default()
        };
        let body = serde_json::to_value(query.search_body()).expect("serializable");
        assert_eq!(
            body,
            serde_json::json!({
                "query": "honey",
                "organic": true,
                "page": 1,
                "size": 12,
                "sortBy": "relevance"
            })
        );
    }
}
