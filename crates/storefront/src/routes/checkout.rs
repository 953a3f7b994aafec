//! Checkout route handlers.
//!
//! The stage of the buyer's checkout is kept in the session as a
//! [`CheckoutStage`]; every handler loads it, applies one transition and
//! stores the result.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use marketplace_client::ApiError;
use marketplace_core::OrderId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::CartView;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::fragments::{self, Fragments, Toast};
use crate::middleware::{PageContext, RequireUser};
use crate::models::SessionUser;
use crate::models::session::set_cart_count;
use crate::models::session_keys;
use crate::services::checkout::{CheckoutStage, clear_cart_after_payment};
use crate::state::AppState;

/// Shown on the success screen when the backend did not acknowledge a
/// payment that the card provider confirmed.
const UNACKNOWLEDGED_PAYMENT: &str =
    "Payment received. Your order confirmation is delayed and will appear in your orders shortly.";

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
    pub publishable_key: String,
    pub error: Option<String>,
}

/// Payment form fragment with the widget bootstrap script.
#[derive(Template)]
#[template(path = "partials/payment_form.html")]
pub struct PaymentFormTemplate {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: String,
    pub csrf_token: String,
}

/// Error panel inside `#payment-area`, for failures before any charge.
#[derive(Template)]
#[template(path = "partials/checkout_error.html")]
pub struct CheckoutErrorTemplate {
    pub message: String,
}

/// Success screen with the redirect countdown.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub ctx: PageContext,
    pub order_id: Option<OrderId>,
    pub warning: Option<String>,
    pub redirect_seconds: u32,
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn load_stage(session: &Session) -> Result<CheckoutStage> {
    Ok(session
        .get::<CheckoutStage>(session_keys::CHECKOUT_STAGE)
        .await?
        .unwrap_or_default())
}

async fn save_stage(session: &Session, stage: &CheckoutStage) -> Result<()> {
    tracing::debug!(stage = stage.name(), "Checkout stage");
    session.insert(session_keys::CHECKOUT_STAGE, stage).await?;
    Ok(())
}

/// Forget a finished checkout so a new one can start.
async fn reset_checkout(session: &Session) -> Result<()> {
    for key in [
        session_keys::CHECKOUT_STAGE,
        session_keys::PAYMENT_COMPLETED,
        session_keys::CART_CLEARED,
        session_keys::LAST_ORDER_ID,
        session_keys::LAST_PAYMENT_INTENT,
    ] {
        session.remove_value(key).await?;
    }
    Ok(())
}

fn stage_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(e.to_string())
}

/// Run the post-payment cart clear in the background, detached from the
/// redirect countdown.
///
/// The task never writes the request's session: the outcome is recorded in
/// [`AppState`] and picked up by the user's next request.
fn spawn_cart_clear(state: &AppState, user: SessionUser, order_id: Option<OrderId>) {
    let state = state.clone();
    tokio::spawn(async move {
        let cart = state.cart_api(&user);
        match clear_cart_after_payment(&cart, order_id, state.retry_policy()).await {
            Ok(endpoint) => {
                tracing::info!(?endpoint, ?order_id, "Cart cleared after payment");
                state.reset_cart_sync(&user).await;
                state.mark_cart_cleared(&user).await;
            }
            Err(errors) => {
                let last = errors.last().map(ToString::to_string).unwrap_or_default();
                tracing::error!(
                    attempts = errors.len(),
                    error = %last,
                    ?order_id,
                    "Every cart clear endpoint failed after payment"
                );
            }
        }
    });
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page.
///
/// Queued quantity changes are flushed first so the total matches what the
/// payment intent will charge.
#[instrument(skip(state, session, ctx, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let stage = load_stage(&session).await?;
    if matches!(
        stage,
        CheckoutStage::Redirected { .. } | CheckoutStage::Failed { .. }
    ) {
        reset_checkout(&session).await?;
    }

    let sync = state.cart_sync(&user).await;
    let report = sync.flush_now().await;
    if !report.failed.is_empty() {
        tracing::warn!(failed = report.failed.len(), "Quantity updates failed before checkout");
    }

    let items = match sync.load().await {
        Ok(items) => items,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load cart for checkout");
            return Ok(CheckoutTemplate {
                ctx,
                cart: CartView::empty(),
                publishable_key: String::new(),
                error: Some("Failed to load cart".to_string()),
            }
            .into_response());
        }
    };
    if items.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let cart = CartView::new(&items);
    set_cart_count(&session, cart.summary.item_count).await;
    ctx.cart_count = cart.summary.item_count;

    Ok(CheckoutTemplate {
        ctx,
        cart,
        publishable_key: state.config().payment_publishable_key.clone(),
        error: None,
    }
    .into_response())
}

/// Create a payment intent and show the payment form (HTMX).
#[instrument(skip(state, session, ctx, user))]
pub async fn create_intent(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let stage = load_stage(&session).await?;

    let intent = match state.api().checkout(user.credentials()).create_payment_intent().await {
        Ok(intent) => intent,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Payment intent creation failed");
            return Ok(Fragments::new()
                .push(&CheckoutErrorTemplate {
                    message: e.user_message(),
                })?
                .into_response());
        }
    };

    let stage = match stage.intent_created(intent.payment_intent_id.clone()) {
        Ok(stage) => stage,
        Err(e) => {
            tracing::warn!(error = %e, "Payment intent requested after payment");
            return Ok(fragments::toast_only(&Toast::info("This order has already been paid"))?
                .into_response());
        }
    };
    save_stage(&session, &stage).await?;
    session
        .insert(session_keys::LAST_PAYMENT_INTENT, &intent.payment_intent_id)
        .await?;
    if let Some(order_id) = intent.order_id {
        session.insert(session_keys::LAST_ORDER_ID, order_id).await?;
    }
    add_breadcrumb(
        "checkout",
        "Payment intent created",
        Some(&[("payment_intent_id", intent.payment_intent_id.as_str())]),
    );

    Ok(Fragments::new()
        .push(&PaymentFormTemplate {
            client_secret: intent.client_secret,
            payment_intent_id: intent.payment_intent_id,
            amount: intent.amount.map(|a| a.display()).unwrap_or_default(),
            csrf_token: ctx.csrf_token,
        })?
        .into_response())
}

/// The payment widget's card result, posted by the form script.
#[derive(Debug, Deserialize)]
pub struct CardResultForm {
    pub payment_intent_id: String,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Record the card result, notify the backend and show the success screen.
///
/// The success screen replaces the whole page body; the cart is cleared in
/// the background.
#[instrument(skip(state, session, ctx, user, form))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    RequireUser(user): RequireUser,
    Form(form): Form<CardResultForm>,
) -> Result<Response> {
    tracing::info!(
        payment_intent_id = %form.payment_intent_id,
        status = %form.status,
        "Card result received"
    );
    let stage = load_stage(&session).await?;

    if let CheckoutStage::Redirected { order_id, warning } = &stage {
        let last_intent = session
            .get::<String>(session_keys::LAST_PAYMENT_INTENT)
            .await?;
        if last_intent.as_deref() == Some(form.payment_intent_id.as_str()) {
            ctx.cart_count = 0;
            return success_response(&state, ctx, *order_id, warning.clone());
        }
    }

    let stage = match stage.card_result(&form.payment_intent_id, &form.status, form.error_message) {
        Ok(stage) => stage,
        Err(e) => {
            tracing::warn!(error = %e, "Card result does not match the checkout");
            return Ok(fragments::toast_only(&Toast::error(
                "This payment does not match your checkout. Please start again.",
            ))?
            .into_response());
        }
    };

    if let CheckoutStage::Failed {
        message,
        after_payment: false,
    } = &stage
    {
        save_stage(&session, &stage).await?;
        return Ok(Fragments::new()
            .push(&CheckoutErrorTemplate {
                message: message.clone(),
            })?
            .into_response());
    }

    session.insert(session_keys::PAYMENT_COMPLETED, true).await?;
    save_stage(&session, &stage).await?;

    let order_hint = session.get::<OrderId>(session_keys::LAST_ORDER_ID).await?;
    let checkout = state.api().checkout(user.credentials());
    let stage = match checkout.payment_success(&form.payment_intent_id, order_hint).await {
        Ok(receipt) => {
            if let Some(order_id) = receipt.order_id {
                session.insert(session_keys::LAST_ORDER_ID, order_id).await?;
            }
            stage.success_notified(receipt.order_id).map_err(stage_error)?
        }
        Err(e) => {
            tracing::warn!(error = %e, "Payment succeeded but the backend did not acknowledge it");
            stage.fail(UNACKNOWLEDGED_PAYMENT)
        }
    };

    let order_id = session.get::<OrderId>(session_keys::LAST_ORDER_ID).await?;
    let stage = stage.redirected(order_id).map_err(stage_error)?;
    save_stage(&session, &stage).await?;

    spawn_cart_clear(&state, user, order_id);

    let CheckoutStage::Redirected { order_id, warning } = stage else {
        return Err(AppError::Internal("checkout did not reach the success screen".to_string()));
    };
    ctx.cart_count = 0;
    success_response(&state, ctx, order_id, warning)
}

fn success_response(
    state: &AppState,
    ctx: PageContext,
    order_id: Option<OrderId>,
    warning: Option<String>,
) -> Result<Response> {
    Ok(Fragments::new()
        .push(&SuccessTemplate {
            ctx,
            order_id,
            warning,
            redirect_seconds: state.config().checkout_redirect_seconds,
        })?
        .retarget("body", "innerHTML")
        .push_url("/checkout/success")
        .into_response())
}

/// Re-display the success screen of a finished checkout.
#[instrument(skip(state, session, ctx, _user))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireUser(_user): RequireUser,
) -> Result<Response> {
    match load_stage(&session).await? {
        CheckoutStage::Redirected { order_id, warning } => Ok(SuccessTemplate {
            ctx,
            order_id,
            warning,
            redirect_seconds: state.config().checkout_redirect_seconds,
        }
        .into_response()),
        _ => Ok(Redirect::to("/marketplace").into_response()),
    }
}
