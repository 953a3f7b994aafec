//! Home page route handler.

use axum::response::Redirect;

/// The marketplace is the landing page.
pub async fn home() -> Redirect {
    Redirect::permanent("/marketplace")
}
