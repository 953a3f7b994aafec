//! Cart route handlers.
//!
//! Quantity changes go through the user's [`CartSync`](crate::cart::CartSync):
//! the row and totals are re-rendered right away, and a `#cart-sync` poller
//! picks up the debounced flush result (corrected rows, failure toasts) once
//! the cart has settled.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Form,
};
use marketplace_client::ApiError;
use marketplace_core::{ApiErrorCode, CartItem, CartItemId, CartSummary, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::{CartRowView, SummaryView, SyncError};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::fragments::{self, CartCount, CloseModal, ConfirmModal, Fragments, Toast};
use crate::htmx::CART_UPDATED_EVENT;
use crate::middleware::context::apply_cart_cleared;
use crate::middleware::{FormToken, OptionalUser, PageContext, RequireUser};
use crate::models::SessionUser;
use crate::models::session::{cart_count, set_cart_count};
use crate::models::session_keys;
use crate::routes::marketplace::CartButtonFragment;
use crate::services::marketplace::CartButton;
use crate::state::AppState;

/// Extra wait on top of the debounce before polling for the flush result.
const SYNC_POLL_SLACK_MS: u64 = 150;

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub content_html: String,
    pub error: Option<String>,
}

/// Rows plus summary; the `#cart-content` of a non-empty cart.
#[derive(Template)]
#[template(path = "partials/cart_content.html")]
pub struct CartContentTemplate {
    pub rows_html: String,
    pub summary_html: String,
}

/// The empty-cart panel, replacing `#cart-content`.
#[derive(Template)]
#[template(path = "partials/cart_empty.html")]
pub struct CartEmptyTemplate {
    pub oob: bool,
}

/// One cart row.
#[derive(Template)]
#[template(path = "partials/cart_row.html")]
pub struct CartRowTemplate {
    pub row: CartRowView,
    pub oob: bool,
}

/// Order summary panel.
#[derive(Template)]
#[template(path = "partials/cart_summary.html")]
pub struct CartSummaryTemplate {
    pub summary: SummaryView,
    pub oob: bool,
}

/// The `#cart-sync` element; polls `/cart/synced` when armed.
#[derive(Template)]
#[template(path = "partials/cart_sync.html")]
pub struct CartSyncPoller {
    pub poll_after_ms: Option<u64>,
    pub oob: bool,
}

impl CartSyncPoller {
    const fn armed(delay_ms: u64, oob: bool) -> Self {
        Self {
            poll_after_ms: Some(delay_ms),
            oob,
        }
    }

    const fn idle() -> Self {
        Self {
            poll_after_ms: None,
            oob: false,
        }
    }
}

fn render_content(items: &[CartItem], pending: &[CartItemId]) -> Result<String> {
    if items.is_empty() {
        return Ok(CartEmptyTemplate { oob: false }.render()?);
    }
    let mut rows_html = String::new();
    for item in items {
        CartRowTemplate {
            row: CartRowView::new(item, pending.contains(&item.id)),
            oob: false,
        }
        .render_into(&mut rows_html)?;
    }
    let summary_html = CartSummaryTemplate {
        summary: CartSummary::of(items).into(),
        oob: false,
    }
    .render()?;
    Ok(CartContentTemplate {
        rows_html,
        summary_html,
    }
    .render()?)
}

fn poll_delay_ms(state: &AppState) -> u64 {
    u64::try_from(state.config().cart_debounce.as_millis())
        .unwrap_or(u64::MAX)
        .saturating_add(SYNC_POLL_SLACK_MS)
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    pub item_id: CartItemId,
    /// Raw input value; blank or non-numeric input counts as 1.
    #[serde(default)]
    pub quantity: Option<String>,
}

impl UpdateQuantityForm {
    fn requested(&self) -> i64 {
        self.quantity
            .as_deref()
            .and_then(|q| q.trim().parse().ok())
            .unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemForm {
    pub item_id: CartItemId,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session, ctx, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let sync = state.cart_sync(&user).await;
    let items = match sync.load().await {
        Ok(items) => items,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load cart");
            return Ok(CartShowTemplate {
                ctx,
                content_html: String::new(),
                error: Some("Failed to load cart".to_string()),
            }
            .into_response());
        }
    };

    let count = CartSummary::of(&items).item_count;
    set_cart_count(&session, count).await;
    ctx.cart_count = count;

    let pending = sync.pending().await;
    Ok(CartShowTemplate {
        ctx,
        content_html: render_content(&items, &pending)?,
        error: None,
    }
    .into_response())
}

/// Add a product to the cart (HTMX).
///
/// Anonymous users get the login modal and nothing is sent to the backend.
#[instrument(skip(state, session, user, csrf))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    FormToken(csrf): FormToken,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let Some(user) = user else {
        return Ok(fragments::login_required(csrf, "/marketplace".to_string())?.into_response());
    };

    let quantity = form.quantity.unwrap_or(1).max(1);
    let cart = state.cart_api(&user);

    match cart.add(form.product_id, quantity).await {
        Ok(()) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            let sync = state.cart_sync(&user).await;
            let (count, in_cart) = match sync.load().await {
                Ok(items) => (
                    CartSummary::of(&items).item_count,
                    items
                        .iter()
                        .find(|item| item.product_id == form.product_id)
                        .map_or(quantity, |item| item.quantity),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "Cart reload after add failed");
                    (cart_count(&session).await.saturating_add(quantity), quantity)
                }
            };
            set_cart_count(&session, count).await;

            let button = CartButton::InCart { quantity: in_cart };
            Ok(Fragments::new()
                .push(&CartButtonFragment::new(form.product_id, button, true))?
                .push(&Toast::success("Added to cart"))?
                .trigger(CART_UPDATED_EVENT)
                .into_response())
        }
        Err(e) if e.code() == Some(&ApiErrorCode::AlreadyInCart) => {
            let status = cart.check_product_in_cart(form.product_id).await;
            let quantity = status.item.map_or(quantity, |item| item.quantity);
            Ok(Fragments::new()
                .push(&CartButtonFragment::new(
                    form.product_id,
                    CartButton::InCart { quantity },
                    true,
                ))?
                .push(&Toast::info("This product is already in your cart"))?
                .into_response())
        }
        Err(ApiError::Unauthorized) => {
            SessionUser::clear(&session).await?;
            state.forget_cart_sync(&user).await;
            Ok(fragments::login_required(csrf, "/marketplace".to_string())?.into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, product_id = %form.product_id, "Add to cart failed");
            Ok(fragments::toast_only(&Toast::error(e.user_message()))?.into_response())
        }
    }
}

/// Change a line's quantity (HTMX).
///
/// Responds immediately with the optimistic row and totals; the backend
/// update is debounced.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<UpdateQuantityForm>,
) -> Result<Response> {
    let sync = state.cart_sync(&user).await;

    let change = match sync.update_quantity(form.item_id, form.requested()).await {
        Ok(change) => change,
        Err(SyncError::UnknownItem(_)) => {
            return Ok(fragments::toast_only(&Toast::warning(
                "This item is no longer in your cart",
            ))?
            .into_response());
        }
        Err(SyncError::Api(ApiError::Unauthorized)) => {
            return Err(ApiError::Unauthorized.into());
        }
        Err(SyncError::Api(e)) => {
            tracing::warn!(error = %e, "Cart reload before update failed");
            return Ok(fragments::toast_only(&Toast::error(e.user_message()))?.into_response());
        }
    };

    set_cart_count(&session, change.summary.item_count).await;

    let mut response = Fragments::new()
        .push(&CartRowTemplate {
            row: CartRowView::new(&change.item, true),
            oob: false,
        })?
        .push(&CartSummaryTemplate {
            summary: change.summary.into(),
            oob: true,
        })?
        .push(&CartCount {
            count: change.summary.item_count,
            oob: true,
        })?
        .push(&CartSyncPoller::armed(poll_delay_ms(&state), true))?;

    if change.clamped {
        response = response.push(&Toast::warning(format!(
            "Quantity adjusted to {}",
            change.item.quantity
        )))?;
    }
    Ok(response.into_response())
}

/// Result of the debounced flush (HTMX poller).
///
/// Re-polls while updates are still queued or in flight; once settled,
/// sends every row as the backend now has it plus a toast per failed update.
#[instrument(skip(state, session, user))]
pub async fn synced(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let sync = state.cart_sync(&user).await;
    if !sync.is_settled().await {
        return Ok(Fragments::new()
            .push(&CartSyncPoller::armed(poll_delay_ms(&state), false))?
            .into_response());
    }

    let report = sync.take_report().await;
    let items = sync.items().await?;
    let summary = CartSummary::of(&items);
    set_cart_count(&session, summary.item_count).await;

    let mut response = Fragments::new().push(&CartSyncPoller::idle())?;
    for item in &items {
        response = response.push(&CartRowTemplate {
            row: CartRowView::new(item, false),
            oob: true,
        })?;
    }
    response = response
        .push(&CartSummaryTemplate {
            summary: summary.into(),
            oob: true,
        })?
        .push(&CartCount {
            count: summary.item_count,
            oob: true,
        })?;

    for failure in report.iter().flat_map(|report| &report.failed) {
        let name = items
            .iter()
            .find(|item| item.id == failure.item_id)
            .map_or("an item", |item| item.product_name.as_str());
        response = response.push(&Toast::error(format!(
            "Could not update {name}: {}",
            failure.message
        )))?;
    }
    Ok(response.into_response())
}

/// Ask before removing a line (HTMX, into `#modal`).
#[instrument(skip(state, user))]
pub async fn remove_confirm(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(item_id): Path<CartItemId>,
) -> Result<Response> {
    let name = state
        .cart_sync(&user)
        .await
        .items()
        .await
        .ok()
        .and_then(|items| items.into_iter().find(|item| item.id == item_id))
        .map(|item| item.product_name);

    let message = match name {
        Some(name) => format!("Remove {name} from your cart?"),
        None => "Remove this item from your cart?".to_string(),
    };
    Ok(Fragments::new()
        .push(&ConfirmModal {
            title: "Remove item".to_string(),
            message,
            confirm_label: "Remove".to_string(),
            action: "/cart/remove".to_string(),
            vals: serde_json::json!({ "item_id": item_id.to_string() }).to_string(),
            target: format!("#cart-row-{item_id}"),
            swap: "outerHTML swap:300ms".to_string(),
        })?
        .into_response())
}

/// Remove a line (HTMX, confirmed).
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<RemoveItemForm>,
) -> Result<Response> {
    match state.cart_api(&user).remove(form.item_id).await {
        Ok(()) => {
            let summary = state.cart_sync(&user).await.forget(form.item_id).await;
            set_cart_count(&session, summary.item_count).await;

            let response = if summary.item_count == 0 {
                Fragments::new()
                    .push(&CartEmptyTemplate { oob: false })?
                    .retarget("#cart-content", "outerHTML")
            } else {
                Fragments::new().push(&CartSummaryTemplate {
                    summary: summary.into(),
                    oob: true,
                })?
            };
            Ok(response
                .push(&CartCount {
                    count: summary.item_count,
                    oob: true,
                })?
                .push(&CloseModal)?
                .push(&Toast::success("Item removed from your cart"))?
                .into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, item_id = %form.item_id, "Remove from cart failed");
            Ok(Fragments::new()
                .push(&CloseModal)?
                .push(&Toast::error(e.user_message()))?
                .no_swap()
                .into_response())
        }
    }
}

/// Ask before emptying the cart (HTMX, into `#modal`).
#[instrument(skip(_user))]
pub async fn clear_confirm(RequireUser(_user): RequireUser) -> Result<Response> {
    Ok(Fragments::new()
        .push(&ConfirmModal {
            title: "Clear cart".to_string(),
            message: "Remove every item from your cart?".to_string(),
            confirm_label: "Clear cart".to_string(),
            action: "/cart/clear".to_string(),
            vals: "{}".to_string(),
            target: "#cart-content".to_string(),
            swap: "outerHTML".to_string(),
        })?
        .into_response())
}

/// Empty the cart (HTMX, confirmed).
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    match state.cart_api(&user).clear(true).await {
        Ok(endpoint) => {
            tracing::info!(?endpoint, "Cart cleared");
            session.remove_value(session_keys::CART_COUNT).await?;
            state.cart_sync(&user).await.reset().await;

            Ok(Fragments::new()
                .push(&CartEmptyTemplate { oob: false })?
                .push(&CartCount {
                    count: 0,
                    oob: true,
                })?
                .push(&CloseModal)?
                .push(&Toast::success("Your cart has been cleared"))?
                .into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Clear cart failed");
            Ok(Fragments::new()
                .push(&CloseModal)?
                .push(&Toast::error(e.user_message()))?
                .no_swap()
                .into_response())
        }
    }
}

/// Header cart badge (HTMX, on `cart-updated`).
#[instrument(skip(state, session, user))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Result<Response> {
    let count = match user {
        None => 0,
        Some(user) => {
            apply_cart_cleared(&state, &session, &user).await?;
            match session.get::<u32>(session_keys::CART_COUNT).await? {
                Some(count) => count,
                None => {
                    let count = state
                        .cart_sync(&user)
                        .await
                        .items()
                        .await
                        .map(|items| CartSummary::of(&items).item_count)
                        .unwrap_or(0);
                    set_cart_count(&session, count).await;
                    count
                }
            }
        }
    };
    Ok(Fragments::new()
        .push(&CartCount { count, oob: false })?
        .into_response())
}
