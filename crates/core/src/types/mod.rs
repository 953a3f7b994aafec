//! Core types for the marketplace.
//!
//! This module provides type-safe wrappers and canonical DTOs for the
//! marketplace's domain entities.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod error_code;
pub mod id;
pub mod page;
pub mod price;
pub mod role;

pub use account::{AccountKind, UserAccount, display_timestamp};
pub use cart::{CartItem, CartSummary, DEFAULT_MAX_QUANTITY, clamp_quantity};
pub use catalog::{Category, Product, Store};
pub use email::{Email, EmailError};
pub use error_code::ApiErrorCode;
pub use id::*;
pub use page::Page;
pub use price::Price;
pub use role::Role;
