//! Debounced cart quantity synchronization.
//!
//! Quantity changes are applied to the local cart immediately and queued
//! per cart item. A single debounce timer per user is (re)armed on every
//! change; when it fires, every queued change is sent as its own
//! `PUT /api/cart/{id}`, one after another, and the cart is then reloaded
//! once.
//!
//! ```text
//! update(1, 2) ─┐
//! update(1, 3) ─┼─ re-arm ─ re-arm ─ [quiet for debounce] ─ PUT 1 qty=4 ─ GET /api/cart
//! update(1, 4) ─┘
//! ```
//!
//! A failed PUT is reported and logged. The optimistic quantity is not
//! rolled back; the reload that follows the flush is the only correction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use marketplace_client::{ApiError, CartApi};
use marketplace_core::{CartItem, CartItemId, CartSummary};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// The cart endpoints the debouncer needs.
pub trait CartBackend: Send + Sync + 'static {
    /// Set the quantity of one cart line.
    fn put_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetch every cart line.
    fn fetch_items(&self) -> impl Future<Output = Result<Vec<CartItem>, ApiError>> + Send;
}

impl CartBackend for CartApi {
    async fn put_quantity(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        self.update(item_id, quantity).await
    }

    async fn fetch_items(&self) -> Result<Vec<CartItem>, ApiError> {
        self.list().await
    }
}

/// Errors from [`CartSync`] operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Cart item {0} is not in the cart")]
    UnknownItem(CartItemId),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of an optimistic quantity change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityChange {
    /// The line with its new quantity.
    pub item: CartItem,
    /// Totals of the whole local cart after the change.
    pub summary: CartSummary,
    /// Whether the requested quantity was out of range.
    pub clamped: bool,
}

/// An update the backend rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpdate {
    pub item_id: CartItemId,
    pub quantity: u32,
    pub message: String,
}

/// Outcome of one or more flushes since the last time it was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Updates the backend accepted, in send order.
    pub sent: Vec<(CartItemId, u32)>,
    pub failed: Vec<FailedUpdate>,
    /// Whether the post-flush reload succeeded.
    pub reloaded: bool,
}

impl FlushReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.failed.is_empty()
    }

    fn merge(&mut self, other: Self) {
        self.sent.extend(other.sent);
        self.failed.extend(other.failed);
        self.reloaded = other.reloaded;
    }
}

/// Per-user cart state plus the debounced update queue.
///
/// Cheap to clone; clones share the same queue and timer.
pub struct CartSync<B> {
    inner: Arc<SyncInner<B>>,
}

impl<B> Clone for CartSync<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> std::fmt::Debug for CartSync<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSync")
            .field("debounce", &self.inner.debounce)
            .finish_non_exhaustive()
    }
}

struct SyncInner<B> {
    backend: B,
    debounce: Duration,
    state: Mutex<SyncState>,
    /// Held for the whole send loop so flushes never interleave.
    flushing: Mutex<()>,
}

#[derive(Default)]
struct SyncState {
    items: Vec<CartItem>,
    loaded: bool,
    /// Pending `(item, quantity)` pairs in first-queued order.
    queue: Vec<(CartItemId, u32)>,
    timer: Option<JoinHandle<()>>,
    report: Option<FlushReport>,
}

impl SyncState {
    fn enqueue(&mut self, item_id: CartItemId, quantity: u32) {
        match self.queue.iter_mut().find(|(id, _)| *id == item_id) {
            Some(entry) => entry.1 = quantity,
            None => self.queue.push((item_id, quantity)),
        }
    }

    /// Replace the local items with a fresh backend copy, keeping quantities
    /// that are still waiting to be sent.
    fn replace_items(&mut self, mut items: Vec<CartItem>) {
        for item in &mut items {
            if let Some((_, quantity)) = self.queue.iter().find(|(id, _)| *id == item.id) {
                item.quantity = *quantity;
            }
        }
        self.items = items;
        self.loaded = true;
    }
}

impl<B: CartBackend> CartSync<B> {
    /// Create a debouncer that waits `debounce` after the last change.
    #[must_use]
    pub fn new(backend: B, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                backend,
                debounce,
                state: Mutex::new(SyncState::default()),
                flushing: Mutex::new(()),
            }),
        }
    }

    /// Fetch the cart from the backend and make it the local cart.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local cart is left unchanged.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<CartItem>, ApiError> {
        let items = self.inner.backend.fetch_items().await?;
        let mut state = self.inner.state.lock().await;
        state.replace_items(items);
        Ok(state.items.clone())
    }

    /// The local cart, loading it first if it was never fetched.
    ///
    /// # Errors
    ///
    /// Returns the backend error of the initial load.
    pub async fn items(&self) -> Result<Vec<CartItem>, ApiError> {
        {
            let state = self.inner.state.lock().await;
            if state.loaded {
                return Ok(state.items.clone());
            }
        }
        self.load().await
    }

    /// Optimistically set a line's quantity and queue the backend update.
    ///
    /// The quantity is clamped to `[1, available]` before anything is
    /// queued. Re-arms the debounce timer.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnknownItem` if the line is not in the cart (after
    /// one reload), or the reload's backend error.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        item_id: CartItemId,
        requested: i64,
    ) -> Result<QuantityChange, SyncError> {
        if !self.contains(item_id).await {
            self.load().await?;
        }

        let mut state = self.inner.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(SyncError::UnknownItem(item_id))?;

        let quantity = item.clamp(requested);
        item.quantity = quantity;
        let item = item.clone();

        state.enqueue(item_id, quantity);
        self.arm_timer(&mut state);

        debug!(item_id = %item_id, quantity, "Queued quantity update");
        Ok(QuantityChange {
            summary: CartSummary::of(&state.items),
            clamped: i64::from(quantity) != requested,
            item,
        })
    }

    /// Drop a removed line from the local cart and from the queue.
    pub async fn forget(&self, item_id: CartItemId) -> CartSummary {
        let mut state = self.inner.state.lock().await;
        state.items.retain(|item| item.id != item_id);
        state.queue.retain(|(id, _)| *id != item_id);
        CartSummary::of(&state.items)
    }

    /// Discard everything after the cart was cleared.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.queue.clear();
        state.items.clear();
        state.loaded = true;
    }

    /// Send queued updates now instead of waiting for the timer.
    pub async fn flush_now(&self) -> FlushReport {
        {
            let mut state = self.inner.state.lock().await;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
        SyncInner::flush(&self.inner).await
    }

    /// Whether nothing is queued, armed or in flight.
    pub async fn is_settled(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.queue.is_empty() && state.timer.is_none() && self.inner.flushing.try_lock().is_ok()
    }

    /// Items with a quantity waiting to be sent.
    pub async fn pending(&self) -> Vec<CartItemId> {
        let state = self.inner.state.lock().await;
        state.queue.iter().map(|(id, _)| *id).collect()
    }

    /// Take the accumulated flush outcome, if any flush ran since the last call.
    pub async fn take_report(&self) -> Option<FlushReport> {
        self.inner.state.lock().await.report.take()
    }

    async fn contains(&self, item_id: CartItemId) -> bool {
        let state = self.inner.state.lock().await;
        state.items.iter().any(|item| item.id == item_id)
    }

    fn arm_timer(&self, state: &mut SyncState) {
        if let Some(previous) = state.timer.take() {
            previous.abort();
        }
        let inner = Arc::clone(&self.inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            SyncInner::flush(&inner).await;
        }));
    }
}

impl<B: CartBackend> SyncInner<B> {
    async fn flush(self: &Arc<Self>) -> FlushReport {
        let _flushing = self.flushing.lock().await;

        // Drain under the lock and detach the timer handle in the same step,
        // so a later re-arm cannot abort this flush halfway through.
        let pending = {
            let mut state = self.state.lock().await;
            state.timer = None;
            std::mem::take(&mut state.queue)
        };
        if pending.is_empty() {
            return FlushReport::default();
        }

        let mut report = FlushReport::default();
        for (item_id, quantity) in pending {
            match self.backend.put_quantity(item_id, quantity).await {
                Ok(()) => report.sent.push((item_id, quantity)),
                Err(e) => {
                    warn!(
                        item_id = %item_id,
                        quantity,
                        error = %e,
                        "Quantity update failed; keeping optimistic totals"
                    );
                    report.failed.push(FailedUpdate {
                        item_id,
                        quantity,
                        message: e.user_message(),
                    });
                }
            }
        }

        let reloaded = self.backend.fetch_items().await;
        let mut state = self.state.lock().await;
        match reloaded {
            Ok(items) => {
                state.replace_items(items);
                report.reloaded = true;
            }
            Err(e) => warn!(error = %e, "Cart reload after flush failed"),
        }

        match state.report.as_mut() {
            Some(existing) => existing.merge(report.clone()),
            None => state.report = Some(report.clone()),
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use axum::http::StatusCode;
    use marketplace_core::{Price, ProductId};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Put(CartItemId, u32),
        List,
    }

    #[derive(Default)]
    struct FakeBackend {
        items: StdMutex<Vec<CartItem>>,
        calls: StdMutex<Vec<Call>>,
        fail_puts_for: Option<CartItemId>,
    }

    impl FakeBackend {
        fn with_items(items: Vec<CartItem>) -> Self {
            Self {
                items: StdMutex::new(items),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CartBackend for Arc<FakeBackend> {
        async fn put_quantity(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(Call::Put(item_id, quantity));
            if self.fail_puts_for == Some(item_id) {
                return Err(ApiError::from_response(
                    StatusCode::CONFLICT,
                    r#"{"message":"Not enough stock","code":"OUT_OF_STOCK"}"#,
                ));
            }
            let mut items = self.items.lock().unwrap();
            if let Some(item) = items.iter_mut().find(|item| item.id == item_id) {
                item.quantity = quantity;
            }
            Ok(())
        }

        async fn fetch_items(&self) -> Result<Vec<CartItem>, ApiError> {
            self.calls.lock().unwrap().push(Call::List);
            Ok(self.items.lock().unwrap().clone())
        }
    }

    fn line(id: i64, price_cents: i64, quantity: u32, available: Option<u32>) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(100 + id),
            product_name: format!("Product {id}"),
            product_price: Price::from_cents(price_cents),
            quantity,
            available_quantity: available,
            product_image: None,
        }
    }

    const DEBOUNCE: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_rapid_updates_send_one_put_with_last_quantity() {
        let backend = Arc::new(FakeBackend::with_items(vec![line(1, 1000, 1, Some(10))]));
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);
        sync.load().await.unwrap();

        for quantity in 2..=6 {
            sync.update_quantity(CartItemId::new(1), quantity).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // still inside the window of the last update
        assert_eq!(backend.calls(), vec![Call::List]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            backend.calls(),
            vec![Call::List, Call::Put(CartItemId::new(1), 6), Call::List]
        );
        assert!(sync.is_settled().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_is_sequential_per_item_then_single_reload() {
        let backend = Arc::new(FakeBackend::with_items(vec![
            line(1, 500, 1, Some(10)),
            line(2, 250, 1, Some(10)),
        ]));
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);
        sync.load().await.unwrap();

        sync.update_quantity(CartItemId::new(2), 3).await.unwrap();
        sync.update_quantity(CartItemId::new(1), 2).await.unwrap();
        sync.update_quantity(CartItemId::new(2), 4).await.unwrap();

        let report = sync.flush_now().await;
        assert_eq!(
            report.sent,
            vec![(CartItemId::new(2), 4), (CartItemId::new(1), 2)]
        );
        assert!(report.reloaded);
        assert_eq!(
            backend.calls(),
            vec![
                Call::List,
                Call::Put(CartItemId::new(2), 4),
                Call::Put(CartItemId::new(1), 2),
                Call::List,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_clamps_into_available_range() {
        let backend = Arc::new(FakeBackend::with_items(vec![
            line(1, 100, 2, Some(5)),
            line(2, 100, 1, Some(0)),
        ]));
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);
        sync.load().await.unwrap();

        let change = sync.update_quantity(CartItemId::new(1), 9).await.unwrap();
        assert_eq!(change.item.quantity, 5);
        assert!(change.clamped);

        let change = sync.update_quantity(CartItemId::new(1), 0).await.unwrap();
        assert_eq!(change.item.quantity, 1);

        let change = sync.update_quantity(CartItemId::new(2), -4).await.unwrap();
        assert_eq!(change.item.quantity, 1);

        sync.flush_now().await;
        for call in backend.calls() {
            if let Call::Put(id, quantity) = call {
                let max = if id == CartItemId::new(1) { 5 } else { 1 };
                assert!((1..=max).contains(&quantity), "sent {quantity} for {id}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimistic_summary() {
        let backend = Arc::new(FakeBackend::with_items(vec![
            line(1, 1000, 1, None),
            line(2, 250, 2, None),
        ]));
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);
        sync.load().await.unwrap();

        let change = sync.update_quantity(CartItemId::new(1), 2).await.unwrap();
        assert_eq!(change.summary.subtotal.display(), "$25.00");
        assert_eq!(change.summary.item_count, 4);
        assert!(!change.clamped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_put_is_reported_without_retry() {
        let backend = Arc::new(FakeBackend {
            items: StdMutex::new(vec![line(1, 100, 1, Some(10)), line(2, 100, 1, Some(10))]),
            fail_puts_for: Some(CartItemId::new(1)),
            ..FakeBackend::default()
        });
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);
        sync.load().await.unwrap();

        sync.update_quantity(CartItemId::new(1), 3).await.unwrap();
        sync.update_quantity(CartItemId::new(2), 2).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let report = sync.take_report().await.unwrap();
        assert_eq!(report.sent, vec![(CartItemId::new(2), 2)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item_id, CartItemId::new(1));
        assert_eq!(report.failed[0].message, "Not enough stock");

        let puts = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Put(..)))
            .count();
        assert_eq!(puts, 2);
        assert!(sync.take_report().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_item_after_reload() {
        let backend = Arc::new(FakeBackend::with_items(vec![line(1, 100, 1, None)]));
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);

        let err = sync.update_quantity(CartItemId::new(42), 2).await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownItem(id) if id == CartItemId::new(42)));
        // the miss triggered exactly one reload
        assert_eq!(backend.calls(), vec![Call::List]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_drops_queued_update() {
        let backend = Arc::new(FakeBackend::with_items(vec![
            line(1, 100, 1, None),
            line(2, 300, 1, None),
        ]));
        let sync = CartSync::new(Arc::clone(&backend), DEBOUNCE);
        sync.load().await.unwrap();

        sync.update_quantity(CartItemId::new(1), 3).await.unwrap();
        let summary = sync.forget(CartItemId::new(1)).await;
        assert_eq!(summary.subtotal.display(), "$3.00");

        let report = sync.flush_now().await;
        assert!(report.is_empty());
        assert_eq!(backend.calls(), vec![Call::List]);
    }
}
