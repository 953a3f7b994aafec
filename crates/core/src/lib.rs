//! Marketplace Core - Shared types library.
//!
//! This crate provides the canonical data types used by every marketplace
//! component:
//! - `client` - REST client for the marketplace backend
//! - `storefront` - Buyer-facing marketplace, cart and checkout
//! - `admin` - Admin dashboard for buyers, sellers, products and categories
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Backend
//! responses are inconsistent about field names (`productName` vs `name`,
//! `nameEn` vs `categoryNameEn`), so every DTO here accepts all known
//! spellings at deserialization time. Nothing downstream deals with the
//! alternate shapes.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, emails, roles, entity DTOs and error codes
//! - [`validation`] - Form field checks with per-field messages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
