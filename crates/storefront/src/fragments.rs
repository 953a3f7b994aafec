//! Shared HTMX fragments: toasts, modals and the cart badge.
//!
//! Handlers that answer with more than one fragment build a [`Fragments`]
//! response: the first fragment is swapped into the request's target, the
//! rest carry `hx-swap-oob` and land wherever their `id` points.

use askama::Template;
use axum::http::{HeaderMap, HeaderValue, HeaderName};
use axum::response::{Html, IntoResponse, Response};

use crate::htmx::{HX_PUSH_URL, HX_RESWAP, HX_RETARGET, HX_TRIGGER};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Error => "toast-error",
            Self::Warning => "toast-warning",
            Self::Info => "toast-info",
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
        Self::new(ToastKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// "Please log in" modal shown to anonymous users.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/login_modal.html")]
pub struct LoginModal {
    pub csrf_token: String,
    /// Path to return to after logging in.
    pub next: String,
}

/// Confirmation modal whose button posts `vals` to `action`.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/confirm_modal.html")]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub action: String,
    /// JSON object for `hx-vals`.
    pub vals: String,
    /// Element the confirmed action swaps.
    pub target: String,
    pub swap: String,
}

/// Header cart badge.
#[derive(Debug, Clone, Copy, Template)]
#[template(path = "partials/cart_count.html")]
pub struct CartCount {
    pub count: u32,
    pub oob: bool,
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
    pub fn retarget(self, selector: &'static str, swap: &'static str) -> Self {
        self.header(HX_RETARGET, selector).header(HX_RESWAP, swap)
    }

    /// Skip the main swap; out-of-band fragments are still applied.
    #[must_use]
    pub fn no_swap(self) -> Self {
        self.header(HX_RESWAP, "none")
    }

    /// Record `url` in the browser history.
    #[must_use]
    pub fn push_url(self, url: &'static str) -> Self {
        self.header(HX_PUSH_URL, url)
    }

    /// Fire a client-side event after the swap.
    #[must_use]
    pub fn trigger(self, event: &'static str) -> Self {
        self.header(HX_TRIGGER, event)
    }

    fn header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
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

/// The login modal, retargeted into `#modal`.
///
/// # Errors
///
/// Returns the template's render error.
pub fn login_required(csrf_token: String, next: String) -> Result<Fragments, askama::Error> {
    Ok(Fragments::new()
        .push(&LoginModal { csrf_token, next })?
        .retarget("#modal", "innerHTML"))
}

/// A single toast without touching the requesting element.
///
/// # Errors
///
/// Returns the template's render error.
pub fn toast_only(toast: &Toast) -> Result<Fragments, askama::Error> {
    Ok(Fragments::new().push(toast)?.no_swap())
}
