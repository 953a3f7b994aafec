//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (backend reachable)
//!
//! # Dashboard
//! GET  /                           - Entity counts
//!
//! # Auth
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action (admin role required)
//! POST /auth/logout                - Logout action
//!
//! # Accounts (buyers and sellers share the same shape)
//! GET  /buyers                     - Buyer table (HTMX: table body only)
//! PUT  /buyers/{id}/status         - Activate or deactivate, returns the status cell
//! DELETE /buyers/{id}              - Delete, empty body removes the row
//! GET  /sellers                    - Seller table
//! PUT  /sellers/{id}/status        - Activate or deactivate
//! DELETE /sellers/{id}             - Delete
//! GET  /admins                     - Admin table with the new-admin form
//! POST /admins                     - Create an admin
//! DELETE /admins/{id}              - Delete
//!
//! # Catalog (create and edit in a modal)
//! GET  /products                   - Product table
//! GET  /products/new               - Create modal
//! POST /products                   - Create, inserts the row
//! GET  /products/{id}/edit         - Edit modal
//! PUT  /products/{id}              - Update, swaps the row
//! DELETE /products/{id}            - Delete
//! GET  /categories                 - Category table
//! GET  /categories/new             - Create modal
//! POST /categories                 - Create
//! GET  /categories/{id}/edit       - Edit modal
//! PUT  /categories/{id}            - Update
//! DELETE /categories/{id}          - Delete
//! ```

pub mod accounts;
pub mod admins;
pub mod auth;
pub mod buyers;
pub mod catalog;
pub mod categories;
pub mod dashboard;
pub mod products;
pub mod sellers;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .merge(auth::router())
        .merge(accounts::routes::<buyers::Buyers>())
        .merge(accounts::routes::<sellers::Sellers>())
        .merge(admins::routes())
        .merge(products::routes())
        .merge(categories::routes())
}
