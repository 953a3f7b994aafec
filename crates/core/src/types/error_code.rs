//! Structured business error codes returned by the backend.

use serde::{Deserialize, Serialize};

/// Machine-readable error code from an error response's `code` field.
///
/// Callers branch on this instead of matching substrings of the free-text
/// `message`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApiErrorCode {
    /// The product is already in the buyer's cart.
    AlreadyInCart,
    /// Requested quantity exceeds available stock.
    OutOfStock,
    /// Request payload failed server-side validation.
    Validation,
    /// Entity does not exist.
    NotFound,
    /// Entity with the same unique key already exists.
    Duplicate,
    /// Any other code, kept verbatim.
    Other(String),
}

impl ApiErrorCode {
    /// The canonical wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AlreadyInCart => "PRODUCT_ALREADY_IN_CART",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::Validation => "VALIDATION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Duplicate => "DUPLICATE",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for ApiErrorCode {
    fn from(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "PRODUCT_ALREADY_IN_CART" | "ALREADY_IN_CART" => Self::AlreadyInCart,
            "OUT_OF_STOCK" | "INSUFFICIENT_STOCK" => Self::OutOfStock,
            "VALIDATION_FAILED" | "VALIDATION_ERROR" => Self::Validation,
            "NOT_FOUND" => Self::NotFound,
            "DUPLICATE" | "ALREADY_EXISTS" => Self::Duplicate,
            _ => Self::Other(code.to_string()),
        }
    }
}

impl From<String> for ApiErrorCode {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<ApiErrorCode> for String {
    fn from(code: ApiErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
