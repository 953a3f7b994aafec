//! HTMX fragments shared by the entity managers.
//!
//! A [`Fragments`] response concatenates rendered templates; the first one
//! is swapped into the request's target and the rest carry `hx-swap-oob`.

use askama::Template;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{Html, IntoResponse, Response};

use crate::htmx::{HX_RESWAP, HX_RETARGET};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Error => "toast-error",
        }
    }
}

/// A toast appended to `#toasts` out of band.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/toast.html")]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

/// Empties the modal container.
#[derive(Debug, Clone, Copy, Template)]
#[template(source = r#"<div id="modal" hx-swap-oob="true"></div>"#, ext = "html")]
pub struct CloseModal;

/// An HTML response assembled from several fragments plus HTMX headers.
#[derive(Debug, Default)]
pub struct Fragments {
    html: String,
    headers: HeaderMap,
}

impl Fragments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rendered fragment.
    ///
    /// # Errors
    ///
    /// Returns the template's render error.
    pub fn push(mut self, fragment: &impl Template) -> Result<Self, askama::Error> {
        fragment.render_into(&mut self.html)?;
        Ok(self)
    }

    /// Swap the response into `selector` with `swap` instead of the
    /// requesting element's target.
    #[must_use]
    pub fn retarget(mut self, selector: &str, swap: &'static str) -> Self {
        match HeaderValue::from_str(selector) {
            Ok(value) => {
                self.headers.insert(HX_RETARGET, value);
                self.headers.insert(HX_RESWAP, HeaderValue::from_static(swap));
            }
            Err(e) => tracing::warn!(error = %e, selector, "Invalid retarget selector"),
        }
        self
    }

    /// Skip the main swap; out-of-band fragments are still applied.
    #[must_use]
    pub fn no_swap(mut self) -> Self {
        self.headers
            .insert(HX_RESWAP, HeaderValue::from_static("none"));
        self
    }

    /// The assembled HTML.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }
}

impl IntoResponse for Fragments {
    fn into_response(self) -> Response {
        (self.headers, Html(self.html)).into_response()
    }
}

/// A single toast that leaves the requesting element untouched.
///
/// # Errors
///
/// Returns the template's render error.
pub fn toast_only(toast: &Toast) -> Result<Fragments, askama::Error> {
    Ok(Fragments::new().push(toast)?.no_swap())
}
