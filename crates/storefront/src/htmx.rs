//! HTMX request detection and response headers.

use axum::http::{HeaderMap, HeaderName};

/// Sent by HTMX on every request it issues.
pub const HX_REQUEST: HeaderName = HeaderName::from_static("hx-request");
/// Replace the swap target chosen by the element.
pub const HX_RETARGET: HeaderName = HeaderName::from_static("hx-retarget");
/// Replace the swap strategy chosen by the element.
pub const HX_RESWAP: HeaderName = HeaderName::from_static("hx-reswap");
/// Fire client-side events after the swap.
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");
/// Push a URL into the browser history after the swap.
pub const HX_PUSH_URL: HeaderName = HeaderName::from_static("hx-push-url");
/// Client-side redirect without a full navigation.
pub const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

/// Event fired after any cart mutation so badges and buttons refresh.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Whether the request was issued by HTMX (as opposed to a full navigation).
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert(HX_REQUEST, HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
        headers.insert(HX_REQUEST, HeaderValue::from_static("false"));
        assert!(!is_htmx(&headers));
    }
}
