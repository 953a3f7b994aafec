//! Marketplace backend REST client.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per process, cheaply cloneable (`Arc` inside)
//! - Per-user [`Credentials`] carry the bearer token and, when the backend
//!   issued one, the CSRF token attached to state-changing requests
//! - One API module per entity; every response is normalized into the
//!   canonical DTOs from `marketplace-core` before it leaves this crate
//! - HTTP 401 always surfaces as [`ApiError::Unauthorized`] so callers can
//!   send the user to the login page
//!
//! # Example
//!
//! ```rust,ignore
//! use marketplace_client::{ApiClient, Credentials};
//!
//! let client = ApiClient::new("http://localhost:8080")?;
//! let cart = client.cart(Credentials::bearer(token));
//! let items = cart.list().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod client;
mod error;
pub mod retry;

pub use accounts::{AccountsApi, NewAdmin};
pub use auth::{AuthApi, AuthSession, LoginRequest, RegisterRequest};
pub use cart::{CartApi, ClearEndpoint, InCartStatus};
pub use catalog::{CatalogApi, CategoryInput, ProductInput, ProductQuery, SearchRoute};
pub use checkout::{CheckoutApi, PaymentIntent, PaymentReceipt};
pub use client::{ApiClient, Credentials};
pub use error::ApiError;
pub use retry::RetryPolicy;
