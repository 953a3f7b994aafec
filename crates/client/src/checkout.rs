//! Payment intent and payment confirmation endpoints.

use marketplace_core::{OrderId, Price};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::client::{ApiClient, Credentials};
use crate::error::ApiError;

/// A payment intent created by the backend with the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Secret handed to the browser payment widget.
    pub client_secret: String,
    #[serde(alias = "id", alias = "intentId")]
    pub payment_intent_id: String,
    /// Amount to charge.
    #[serde(default)]
    pub amount: Option<Price>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Pending order created alongside the intent, if any.
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// Backend acknowledgement of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentSuccessBody<'a> {
    payment_intent_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<OrderId>,
}

/// Checkout endpoints for one buyer.
#[derive(Debug, Clone)]
pub struct CheckoutApi {
    client: ApiClient,
    credentials: Credentials,
}

impl CheckoutApi {
    pub(crate) const fn new(client: ApiClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Create a payment intent for the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is empty or the provider rejects the intent.
    #[instrument(skip(self))]
    pub async fn create_payment_intent(&self) -> Result<PaymentIntent, ApiError> {
        self.client
            .send_json(
                Method::POST,
                "/api/checkout/create-payment-intent",
                Some(&self.credentials),
                &json!({}),
            )
            .await
    }

    /// Tell the backend a payment intent succeeded.
    ///
    /// An empty success body is accepted and yields an empty receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not acknowledge the payment.
    #[instrument(skip(self))]
    pub async fn payment_success(
        &self,
        payment_intent_id: &str,
        order_id: Option<OrderId>,
    ) -> Result<PaymentReceipt, ApiError> {
        let request = self
            .client
            .request(
                Method::POST,
                "/api/checkout/payment-success",
                Some(&self.credentials),
            )
            .json(&PaymentSuccessBody {
                payment_intent_id,
                order_id,
            });
        let body = self.client.execute(request).await?;
        if body.trim().is_empty() {
            return Ok(PaymentReceipt {
                order_id,
                message: None,
            });
        }
        let mut receipt: PaymentReceipt = serde_json::from_str(&body)?;
        receipt.order_id = receipt.order_id.or(order_id);
        Ok(receipt)
    }
}
