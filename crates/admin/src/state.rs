//! Application state shared across handlers.

use std::sync::Arc;

use marketplace_client::{AccountsApi, ApiClient, ApiError, CatalogApi};

use crate::config::AdminConfig;
use crate::models::CurrentAdmin;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    api: ApiClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is invalid.
    pub fn new(config: AdminConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api_url)?;
        Ok(Self {
            inner: Arc::new(AppStateInner { config, api }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// The marketplace backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Account management endpoints on behalf of `admin`.
    #[must_use]
    pub fn accounts(&self, admin: &CurrentAdmin) -> AccountsApi {
        self.inner.api.accounts(admin.credentials())
    }

    /// Catalog endpoints on behalf of `admin`.
    #[must_use]
    pub fn catalog(&self, admin: &CurrentAdmin) -> CatalogApi {
        self.inner.api.catalog(Some(admin.credentials()))
    }
}
