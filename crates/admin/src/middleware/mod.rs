//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with the in-memory store)
//! 4. CSRF check on POST, PUT and DELETE
//! 5. Expired-login cleanup and HTMX redirect conversion
//! 6. Auth extractors on every route except login and health checks

pub mod auth;
pub mod context;
pub mod csrf;
pub mod redirect;
pub mod session;

pub use auth::{OptionalAdminAuth, RequireAdminAuth};
pub use context::PageContext;
pub use csrf::verify_csrf;
pub use redirect::htmx_redirects;
pub use session::create_session_layer;
