//! HTMX request detection and response headers.

use axum::http::{HeaderMap, HeaderName};

/// Sent by HTMX on every request it issues.
pub const HX_REQUEST: HeaderName = HeaderName::from_static("hx-request");
/// Replace the swap target chosen by the element.
pub const HX_RETARGET: HeaderName = HeaderName::from_static("hx-retarget");
/// Replace the swap strategy chosen by the element.
pub const HX_RESWAP: HeaderName = HeaderName::from_static("hx-reswap");
/// Client-side redirect without a full navigation.
pub const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}
