//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use marketplace_client::{ApiClient, ApiError, CartApi, RetryPolicy};
use moka::future::Cache;

use crate::cart::CartSync;
use crate::config::StorefrontConfig;
use crate::models::SessionUser;

/// How long an idle user's cart debouncer is kept in memory.
const CART_SYNC_IDLE: Duration = Duration::from_secs(30 * 60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    carts: Cache<String, CartSync<CartApi>>,
    /// Users whose post-payment cart clear finished since their last request.
    cleared_carts: Cache<String, ()>,
    retry: RetryPolicy,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is invalid.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        Self::with_retry_policy(config, RetryPolicy::default())
    }

    /// Create a state whose post-payment cart clear uses `retry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is invalid.
    pub fn with_retry_policy(config: StorefrontConfig, retry: RetryPolicy) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api_url)?;
        let carts = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(CART_SYNC_IDLE)
            .build();
        let cleared_carts = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(CART_SYNC_IDLE)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                carts,
                cleared_carts,
                retry,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the marketplace backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Retry policy for the post-payment cart clear.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    /// Cart endpoints for `user`.
    #[must_use]
    pub fn cart_api(&self, user: &SessionUser) -> CartApi {
        self.inner.api.cart(user.credentials())
    }

    /// The user's cart debouncer, created on first use.
    pub async fn cart_sync(&self, user: &SessionUser) -> CartSync<CartApi> {
        let cart = self.cart_api(user);
        let debounce = self.inner.config.cart_debounce;
        self.inner
            .carts
            .get_with(user.cache_key(), async move { CartSync::new(cart, debounce) })
            .await
    }

    /// Drop the user's debouncer, e.g. after login or logout when the
    /// credentials it holds change. A pending cart-clear record goes too.
    pub async fn forget_cart_sync(&self, user: &SessionUser) {
        let key = user.cache_key();
        self.inner.carts.invalidate(&key).await;
        self.inner.cleared_carts.invalidate(&key).await;
    }

    /// Discard queued changes of an existing debouncer without creating one.
    pub async fn reset_cart_sync(&self, user: &SessionUser) {
        if let Some(sync) = self.inner.carts.get(&user.cache_key()).await {
            sync.reset().await;
        }
    }

    /// Record that the user's cart was emptied outside any request.
    ///
    /// The next request of that user applies it to its own session through
    /// [`AppState::take_cart_cleared`].
    pub async fn mark_cart_cleared(&self, user: &SessionUser) {
        self.inner.cleared_carts.insert(user.cache_key(), ()).await;
    }

    /// Whether the user's cart was cleared since the last call.
    pub async fn take_cart_cleared(&self, user: &SessionUser) -> bool {
        self.inner
            .cleared_carts
            .remove(&user.cache_key())
            .await
            .is_some()
    }
}
