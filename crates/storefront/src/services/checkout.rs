//! Checkout confirmation state machine and the post-payment cart clear.
//!
//! ```text
//! Idle ─▶ IntentCreated ─▶ CardConfirmed ─▶ SuccessNotified ─▶ Redirected
//!   └──────────┴────────────────┴─────────────────┴──▶ Failed { after_payment }
//! ```
//!
//! Once the card is confirmed the payment has been taken, so later failures
//! are carried as `Failed { after_payment: true }` and end up as a warning on
//! the success screen instead of blocking it.

use marketplace_client::retry::first_success;
use marketplace_client::{ApiError, CartApi, ClearEndpoint, RetryPolicy};
use marketplace_core::OrderId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Payment widget status for a confirmed card.
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Where a buyer is in the checkout flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CheckoutStage {
    #[default]
    Idle,
    IntentCreated {
        payment_intent_id: String,
    },
    CardConfirmed {
        payment_intent_id: String,
    },
    SuccessNotified {
        order_id: Option<OrderId>,
    },
    Redirected {
        order_id: Option<OrderId>,
        /// Shown as a badge on the success screen.
        warning: Option<String>,
    },
    Failed {
        message: String,
        after_payment: bool,
    },
}

/// A transition that is not allowed from the current stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {event} while {stage}")]
pub struct StageError {
    pub stage: &'static str,
    pub event: &'static str,
}

impl CheckoutStage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::IntentCreated { .. } => "intent_created",
            Self::CardConfirmed { .. } => "card_confirmed",
            Self::SuccessNotified { .. } => "success_notified",
            Self::Redirected { .. } => "redirected",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether the card has been charged.
    #[must_use]
    pub const fn payment_completed(&self) -> bool {
        matches!(
            self,
            Self::CardConfirmed { .. }
                | Self::SuccessNotified { .. }
                | Self::Redirected { .. }
                | Self::Failed {
                    after_payment: true,
                    ..
                }
        )
    }

    const fn invalid(&self, event: &'static str) -> StageError {
        StageError {
            stage: self.name(),
            event,
        }
    }

    /// A payment intent was created. Allowed before any payment was taken.
    ///
    /// # Errors
    ///
    /// Returns `StageError` once the payment has completed.
    pub fn intent_created(self, payment_intent_id: String) -> Result<Self, StageError> {
        if self.payment_completed() {
            return Err(self.invalid("create a payment intent"));
        }
        Ok(Self::IntentCreated { payment_intent_id })
    }

    /// The payment widget reported the card result.
    ///
    /// `succeeded` advances to `CardConfirmed`; any other status fails the
    /// checkout before payment. A result for a different intent than the one
    /// created is rejected.
    ///
    /// # Errors
    ///
    /// Returns `StageError` unless an intent was created first.
    pub fn card_result(
        self,
        payment_intent_id: &str,
        status: &str,
        error_message: Option<String>,
    ) -> Result<Self, StageError> {
        match &self {
            Self::IntentCreated {
                payment_intent_id: expected,
            } if expected == payment_intent_id => {}
            // a redirect-based payment method may report the same result twice
            Self::CardConfirmed {
                payment_intent_id: expected,
            } if expected == payment_intent_id && status == STATUS_SUCCEEDED => {
                return Ok(self);
            }
            _ => return Err(self.invalid("confirm a card")),
        }

        if status == STATUS_SUCCEEDED {
            Ok(Self::CardConfirmed {
                payment_intent_id: payment_intent_id.to_string(),
            })
        } else {
            Ok(Self::Failed {
                message: error_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("Payment {status}")),
                after_payment: false,
            })
        }
    }

    /// The backend acknowledged the payment.
    ///
    /// # Errors
    ///
    /// Returns `StageError` unless the card was confirmed.
    pub fn success_notified(self, order_id: Option<OrderId>) -> Result<Self, StageError> {
        match self {
            Self::CardConfirmed { .. } => Ok(Self::SuccessNotified { order_id }),
            other => Err(other.invalid("record payment success")),
        }
    }

    /// Something went wrong. Never fails; the payment state is preserved.
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            after_payment: self.payment_completed(),
        }
    }

    /// The success screen is shown.
    ///
    /// A failure after payment is downgraded to a warning here.
    ///
    /// # Errors
    ///
    /// Returns `StageError` if no payment was completed.
    pub fn redirected(self, order_id: Option<OrderId>) -> Result<Self, StageError> {
        match self {
            Self::SuccessNotified {
                order_id: notified,
            } => Ok(Self::Redirected {
                order_id: notified.or(order_id),
                warning: None,
            }),
            Self::Failed {
                message,
                after_payment: true,
            } => Ok(Self::Redirected {
                order_id,
                warning: Some(message),
            }),
            redirected @ Self::Redirected { .. } => Ok(redirected),
            other => Err(other.invalid("show the success screen")),
        }
    }
}

/// Empty the cart after a successful payment.
///
/// Tries force-clear, clear-after-payment and plain clear in that order,
/// each retried per `policy`; the first success wins.
///
/// # Errors
///
/// Returns every endpoint's final error when all of them fail.
#[instrument(skip(cart, policy))]
pub async fn clear_cart_after_payment(
    cart: &CartApi,
    order_id: Option<OrderId>,
    policy: &RetryPolicy,
) -> Result<ClearEndpoint, Vec<ApiError>> {
    let (endpoint, ()) = first_success(policy, &ClearEndpoint::CASCADE, |endpoint, attempt| {
        debug!(endpoint = ?endpoint, attempt, "Clearing cart after payment");
        cart.clear_via(*endpoint, order_id)
    })
    .await?;
    Ok(*endpoint)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn intent() -> CheckoutStage {
        CheckoutStage::Idle
            .intent_created("pi_1".to_string())
            .unwrap()
    }

    #[test]
    fn test_happy_path() {
        let stage = intent()
            .card_result("pi_1", STATUS_SUCCEEDED, None)
            .unwrap();
        assert!(stage.payment_completed());

        let stage = stage.success_notified(Some(OrderId::new(77))).unwrap();
        let stage = stage.redirected(None).unwrap();
        assert_eq!(
            stage,
            CheckoutStage::Redirected {
                order_id: Some(OrderId::new(77)),
                warning: None,
            }
        );
    }

    #[test]
    fn test_declined_card_fails_before_payment() {
        let stage = intent()
            .card_result("pi_1", "requires_payment_method", Some("Card declined".to_string()))
            .unwrap();
        assert_eq!(
            stage,
            CheckoutStage::Failed {
                message: "Card declined".to_string(),
                after_payment: false,
            }
        );
        assert!(stage.clone().redirected(None).is_err());
        // a new intent may be created after a declined card
        assert!(stage.intent_created("pi_2".to_string()).is_ok());
    }

    #[test]
    fn test_failure_after_payment_becomes_warning() {
        let stage = intent()
            .card_result("pi_1", STATUS_SUCCEEDED, None)
            .unwrap()
            .fail("Could not record payment");
        assert!(stage.payment_completed());
        assert!(stage.clone().intent_created("pi_2".to_string()).is_err());

        let stage = stage.redirected(Some(OrderId::new(5))).unwrap();
        assert_eq!(
            stage,
            CheckoutStage::Redirected {
                order_id: Some(OrderId::new(5)),
                warning: Some("Could not record payment".to_string()),
            }
        );
    }

    #[test]
    fn test_card_result_for_unknown_intent_is_rejected() {
        let err = intent()
            .card_result("pi_other", STATUS_SUCCEEDED, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot confirm a card while intent_created");
        assert!(
            CheckoutStage::Idle
                .card_result("pi_1", STATUS_SUCCEEDED, None)
                .is_err()
        );
    }

    #[test]
    fn test_repeated_success_report_is_idempotent() {
        let confirmed = intent()
            .card_result("pi_1", STATUS_SUCCEEDED, None)
            .unwrap();
        assert_eq!(
            confirmed
                .clone()
                .card_result("pi_1", STATUS_SUCCEEDED, None)
                .unwrap(),
            confirmed
        );
    }

    #[test]
    fn test_stage_round_trips_through_session_json() {
        let stage = CheckoutStage::Failed {
            message: "x".to_string(),
            after_payment: true,
        };
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["stage"], "failed");
        assert_eq!(serde_json::from_value::<CheckoutStage>(json).unwrap(), stage);
    }
}
