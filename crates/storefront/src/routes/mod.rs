//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Redirect to /marketplace
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (backend reachable)
//!
//! # Marketplace
//! GET  /marketplace               - Product listing with filters
//! GET  /marketplace/products      - Apply filters, first page (HTMX)
//! GET  /marketplace/page/{n}      - Go to a page (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (button + toast, login modal when anonymous)
//! POST /cart/update               - Optimistic quantity change, debounced backend update
//! GET  /cart/synced               - Debounced flush result (poller)
//! GET  /cart/remove/{id}/confirm  - Removal confirmation modal
//! POST /cart/remove               - Remove a line
//! GET  /cart/clear/confirm        - Clear confirmation modal
//! POST /cart/clear                - Empty the cart
//! GET  /cart/count                - Cart count badge
//!
//! # Checkout
//! GET  /checkout                  - Order review
//! POST /checkout/intent           - Create payment intent, payment form (HTMX)
//! POST /checkout/confirm          - Card result; success screen replaces the body
//! GET  /checkout/success          - Success screen of the finished checkout
//!
//! # Auth
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /register                  - Register page
//! POST /register                  - Register action
//! POST /logout                    - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod marketplace;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the marketplace routes router.
pub fn marketplace_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(marketplace::index))
        .route("/products", get(marketplace::filter))
        .route("/page/{page}", get(marketplace::page))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/synced", get(cart::synced))
        .route("/remove/{id}/confirm", get(cart::remove_confirm))
        .route("/remove", post(cart::remove))
        .route("/clear/confirm", get(cart::clear_confirm))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/intent", post(checkout::create_intent))
        .route("/confirm", post(checkout::confirm))
        .route("/success", get(checkout::success))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/marketplace", marketplace_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .merge(auth_routes())
}
