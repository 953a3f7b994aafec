//! Cart endpoints.

use marketplace_core::{CartItem, CartItemId, OrderId, Page, ProductId};
use reqwest::Method;
use serde::Serialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::client::{ApiClient, Credentials};
use crate::error::ApiError;

/// Backend endpoints that can empty a cart, in the order the post-payment
/// cascade tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearEndpoint {
    /// `DELETE /api/cart/force-clear`: ignores reservations held by the order.
    ForceClear,
    /// `POST /api/cart/clear-after-payment?orderId=...`
    ClearAfterPayment,
    /// `DELETE /api/cart/clear`
    Clear,
}

impl ClearEndpoint {
    /// Priority order used after a successful payment.
    pub const CASCADE: [Self; 3] = [Self::ForceClear, Self::ClearAfterPayment, Self::Clear];
}

/// Result of [`CartApi::check_product_in_cart`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InCartStatus {
    pub in_cart: bool,
    /// The matching cart line, when present.
    pub item: Option<CartItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItemBody {
    product_id: ProductId,
    quantity: u32,
}

/// Cart endpoints for one logged-in buyer.
#[derive(Debug, Clone)]
pub struct CartApi {
    client: ApiClient,
    credentials: Credentials,
}

impl CartApi {
    pub(crate) const fn new(client: ApiClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// All lines in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CartItem>, ApiError> {
        let page: Page<CartItem> = self.client.get("/api/cart", Some(&self.credentials)).await?;
        Ok(page.items)
    }

    /// Add `quantity` of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the addition. A product that
    /// is already in the cart carries `ApiErrorCode::AlreadyInCart`.
    #[instrument(skip(self))]
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        let request = self
            .client
            .request(Method::POST, "/api/cart", Some(&self.credentials))
            .json(&AddItemBody {
                product_id,
                quantity: quantity.max(1),
            });
        self.client.send_unit(request).await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn update(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        let request = self
            .client
            .request(
                Method::PUT,
                &format!("/api/cart/{item_id}"),
                Some(&self.credentials),
            )
            .json(&json!({ "quantity": quantity }));
        self.client.send_unit(request).await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, item_id: CartItemId) -> Result<(), ApiError> {
        let request = self.client.request(
            Method::DELETE,
            &format!("/api/cart/{item_id}"),
            Some(&self.credentials),
        );
        self.client.send_unit(request).await
    }

    /// Empty the cart through one specific endpoint.
    ///
    /// `order_id` is only sent to [`ClearEndpoint::ClearAfterPayment`].
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint answers with a non-success status.
    #[instrument(skip(self))]
    pub async fn clear_via(
        &self,
        endpoint: ClearEndpoint,
        order_id: Option<OrderId>,
    ) -> Result<(), ApiError> {
        let request = match endpoint {
            ClearEndpoint::ForceClear => self.client.request(
                Method::DELETE,
                "/api/cart/force-clear",
                Some(&self.credentials),
            ),
            ClearEndpoint::Clear => {
                self.client
                    .request(Method::DELETE, "/api/cart/clear", Some(&self.credentials))
            }
            ClearEndpoint::ClearAfterPayment => {
                let request = self.client.request(
                    Method::POST,
                    "/api/cart/clear-after-payment",
                    Some(&self.credentials),
                );
                match order_id {
                    Some(order_id) => request.query(&[("orderId", order_id.as_i64())]),
                    None => request,
                }
            }
        };
        self.client.send_unit(request).await
    }

    /// Empty the cart.
    ///
    /// With `force_mode` the force-clear endpoint is tried first; any
    /// failure there falls through to the plain clear endpoint. Returns the
    /// endpoint that succeeded.
    ///
    /// # Errors
    ///
    /// Returns the plain clear endpoint's error if it fails too.
    #[instrument(skip(self))]
    pub async fn clear(&self, force_mode: bool) -> Result<ClearEndpoint, ApiError> {
        if force_mode {
            match self.clear_via(ClearEndpoint::ForceClear, None).await {
                Ok(()) => return Ok(ClearEndpoint::ForceClear),
                Err(e) => warn!(error = %e, "Force clear failed, falling back to plain clear"),
            }
        }
        self.clear_via(ClearEndpoint::Clear, None).await?;
        Ok(ClearEndpoint::Clear)
    }

    /// Whether a product is in the cart.
    ///
    /// Never fails: a cart that cannot be fetched counts as not containing
    /// the product.
    #[instrument(skip(self))]
    pub async fn check_product_in_cart(&self, product_id: ProductId) -> InCartStatus {
        match self.list().await {
            Ok(items) => {
                let item = items.into_iter().find(|item| item.product_id == product_id);
                InCartStatus {
                    in_cart: item.is_some(),
                    item,
                }
            }
            Err(e) => {
                warn!(error = %e, "Cart lookup failed, treating product as not in cart");
                InCartStatus::default()
            }
        }
    }
}
