//! Errors returned by the backend client.

use marketplace_core::ApiErrorCode;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Maximum number of characters of a raw error body kept in messages.
const MAX_BODY_CHARS: usize = 200;

/// Errors that can occur when calling the marketplace backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        code: Option<ApiErrorCode>,
    },

    /// A success response could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured backend URL is not a valid base URL.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Build an error from a non-success status and its raw body.
    ///
    /// JSON bodies of the form `{message|error, code}` are parsed; anything
    /// else becomes the (truncated) message.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return Self::Unauthorized;
        }

        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let code = parsed.as_ref().and_then(|b| b.code.clone());
        let message = parsed
            .and_then(|b| b.message.or(b.error))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                } else {
                    trimmed.chars().take(MAX_BODY_CHARS).collect()
                }
            });

        Self::Status {
            status,
            message,
            code,
        }
    }

    /// The structured business error code, if the backend sent one.
    #[must_use]
    pub const fn code(&self) -> Option<&ApiErrorCode> {
        match self {
            Self::Status { code, .. } => code.as_ref(),
            _ => None,
        }
    }

    /// The HTTP status, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Whether the backend rejected the credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Message that is safe to show to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Unauthorized => "Please log in to continue".to_string(),
            Self::Http(_) => "Could not reach the marketplace, please try again".to_string(),
            Self::Parse(_) | Self::InvalidUrl(_) => "Unexpected response from the marketplace".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<ApiErrorCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_status_maps_to_variant() {
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, "{}");
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_json_body_with_code() {
        let err = ApiError::from_response(
            StatusCode::CONFLICT,
            r#"{"message":"Product already in cart","code":"PRODUCT_ALREADY_IN_CART"}"#,
        );
        assert_eq!(err.code(), Some(&ApiErrorCode::AlreadyInCart));
        assert_eq!(err.user_message(), "Product already in cart");
    }

    #[test]
    fn test_spring_body_prefers_message_over_error() {
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Bad Request","message":"quantity must be positive","status":400}"#,
        );
        assert_eq!(err.user_message(), "quantity must be positive");
        assert!(err.code().is_none());
    }

    #[test]
    fn test_plain_text_body_is_truncated() {
        let body = "x".repeat(500);
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, &body);
        assert_eq!(err.user_message().len(), MAX_BODY_CHARS);
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, "");
        assert_eq!(err.user_message(), "Not Found");
        assert_eq!(err.to_string(), "Backend returned 404 Not Found: Not Found");
    }
}
