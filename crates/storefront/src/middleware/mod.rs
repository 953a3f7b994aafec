//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with the in-memory store)
//! 4. CSRF check on state-changing requests
//! 5. HTMX redirect conversion and expired-login cleanup

pub mod auth;
pub mod context;
pub mod csrf;
pub mod redirect;
pub mod session;

pub use auth::{OptionalUser, RequireUser, login_url, safe_next};
pub use context::PageContext;
pub use csrf::{FormToken, verify_csrf};
pub use redirect::htmx_redirects;
pub use session::create_session_layer;
