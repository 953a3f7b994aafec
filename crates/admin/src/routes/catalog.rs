//! Page shell shared by the products and categories managers.
//!
//! Both managers edit rows in a modal: `GET {base}/new` and
//! `GET {base}/{id}/edit` render a form into `#modal`, and a successful
//! save closes it and swaps the row in place.

use askama::Template;
use askama_web::WebTemplate;
use marketplace_client::ApiError;

use crate::components::TableView;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;

/// Products or categories page.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogPageTemplate {
    pub ctx: PageContext,
    pub title: &'static str,
    pub base_path: &'static str,
    pub new_label: &'static str,
    pub table: TableView,
    pub error: Option<String>,
}

/// Split a list failure into the error panel message, letting an expired
/// login through.
///
/// # Errors
///
/// Returns the error when the backend rejected the admin's login.
pub fn load_failure(err: ApiError, collection: &str) -> Result<String> {
    if matches!(err, ApiError::Unauthorized) {
        return Err(AppError::Api(err));
    }
    tracing::error!(error = %err, collection, "Failed to load catalog");
    Ok(format!("Failed to load {collection}"))
}

/// Re-raise an expired login; any other error becomes a toast message.
///
/// # Errors
///
/// Returns the error when the backend rejected the admin's login.
pub fn toast_message(err: ApiError, action: &str) -> Result<String> {
    if matches!(err, ApiError::Unauthorized) {
        return Err(AppError::Api(err));
    }
    tracing::warn!(error = %err, action, "Catalog request failed");
    Ok(format!("Failed to {action}: {}", err.user_message()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_load_failure_message() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "down");
        assert_eq!(load_failure(err, "products").unwrap(), "Failed to load products");
        assert!(load_failure(ApiError::Unauthorized, "products").is_err());
    }

    #[test]
    fn test_toast_message_includes_backend_reason() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, "Name already exists");
        let message = toast_message(err, "create category").unwrap();
        assert!(message.starts_with("Failed to create category: "));
    }
}
