//! Integration tests for the marketplace storefront and admin.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! No external services are needed. [`FakeBackend`] serves the marketplace
//! REST API from an axum router on an ephemeral port and records every
//! request it receives; [`TestBrowser`] drives a BFF router in-process with
//! `tower::ServiceExt::oneshot`, carrying the session cookie and CSRF token
//! between requests the way a browser does.
//!
//! # Test Categories
//!
//! - `storefront_cart` - Cart clear, add-to-cart and debounced updates
//! - `storefront_marketplace` - Listing filters and search routing
//! - `admin_managers` - Admin login and the entity managers

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use marketplace_admin::config::AdminConfig;
use marketplace_client::RetryPolicy;
use marketplace_storefront::config::StorefrontConfig;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

// =============================================================================
// Fake Backend
// =============================================================================

/// A request received by the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    /// `X-CSRF-TOKEN` forwarded from the backend login.
    pub csrf_token: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    /// The body parsed as JSON, or `Null`.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Whether this is `method path`.
    #[must_use]
    pub fn is(&self, method: &Method, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

/// A canned backend answer.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: value.to_string(),
        }
    }

    /// `200 OK` with no body.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: String::new(),
        }
    }

    /// An error status with a `{message}` body.
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "message": message }).to_string(),
        }
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

struct BackendState {
    requests: Mutex<Vec<RecordedRequest>>,
    responder: Box<Responder>,
}

/// The marketplace REST API, answered by a closure.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Serve `responder` on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(
        responder: impl Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    ) -> Self {
        let state = Arc::new(BackendState {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        });
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        let app = Router::new().fallback(record).with_state(Arc::clone(&state));
        // A dead server shows up as failed requests in the test itself.
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL to configure the BFF with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests matching `method path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.is(method, path))
            .collect()
    }

    /// Forget the requests received so far.
    pub fn clear_requests(&self) {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn record(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_text(&headers, header::AUTHORIZATION.as_str()),
        csrf_token: header_text(&headers, "x-csrf-token"),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let reply = (state.responder)(&request);
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);

    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
        .into_response()
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// =============================================================================
// Test Browser
// =============================================================================

/// A BFF response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// A header's value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Drives a BFF router like a browser with HTMX: keeps the session cookie
/// and sends the page's CSRF token back on every request.
pub struct TestBrowser {
    app: Router,
    cookie: Option<String>,
    csrf_token: Option<String>,
}

impl TestBrowser {
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self {
            app,
            cookie: None,
            csrf_token: None,
        }
    }

    /// The CSRF token scraped from the last page that carried one.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Full-page navigation.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, false).await
    }

    /// HTMX `hx-get`.
    pub async fn htmx_get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, true).await
    }

    /// Plain form submission.
    pub async fn submit(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        self.send(Method::POST, path, Some(form), false).await
    }

    /// HTMX request with a form-encoded body (`hx-post`, `hx-put`, `hx-delete`).
    pub async fn htmx(
        &mut self,
        method: Method,
        path: &str,
        form: &[(&str, &str)],
    ) -> TestResponse {
        self.send(method, path, Some(form), true).await
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails, which
    /// only happens on a broken test setup.
    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
        htmx: bool,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(token) = &self.csrf_token {
            builder = builder.header("x-csrf-token", token);
        }
        if htmx {
            builder = builder.header("hx-request", HeaderValue::from_static("true"));
        }
        let body = match form {
            Some(fields) => {
                builder = builder.header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                );
                let mut encoded = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in fields {
                    encoded.append_pair(key, value);
                }
                Body::from(encoded.finish())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("valid test request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable response body");
        let body = String::from_utf8_lossy(&bytes).into_owned();

        self.remember_cookie(&headers);
        if let Some(token) = scrape_csrf_token(&body) {
            self.csrf_token = Some(token);
        }
        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn remember_cookie(&mut self, headers: &HeaderMap) {
        if let Some(pair) = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .last()
        {
            self.cookie = Some(pair.trim().to_string());
        }
    }
}

// =============================================================================
// App Builders
// =============================================================================

/// Storefront configuration pointing at `backend_url`.
///
/// # Panics
///
/// Panics if the fixed test values stop validating.
#[must_use]
pub fn storefront_config(backend_url: &str, debounce_ms: u64) -> StorefrontConfig {
    let debounce = debounce_ms.to_string();
    StorefrontConfig::from_lookup(|key| match key {
        "MARKETPLACE_API_URL" => Some(backend_url.to_string()),
        "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
        "PAYMENT_PUBLISHABLE_KEY" => Some("pk_test_51Hmarket".to_string()),
        "CART_DEBOUNCE_MS" => Some(debounce.clone()),
        _ => None,
    })
    .expect("valid storefront test config")
}

/// A browser on a storefront wired to `backend`.
///
/// # Panics
///
/// Panics if the storefront state cannot be built.
#[must_use]
pub fn storefront(backend: &FakeBackend) -> TestBrowser {
    storefront_with_debounce(backend, 50)
}

/// A browser on a storefront with a custom quantity debounce.
///
/// # Panics
///
/// Panics if the storefront state cannot be built.
#[must_use]
pub fn storefront_with_debounce(backend: &FakeBackend, debounce_ms: u64) -> TestBrowser {
    let config = storefront_config(&backend.url(), debounce_ms);
    let state = marketplace_storefront::state::AppState::new(config).expect("storefront state");
    TestBrowser::new(marketplace_storefront::app(state))
}

/// A storefront browser whose post-payment cart clear retries with `retry`.
///
/// # Panics
///
/// Panics if the storefront state cannot be built.
#[must_use]
pub fn storefront_with_retry(backend: &FakeBackend, retry: RetryPolicy) -> TestBrowser {
    let config = storefront_config(&backend.url(), 50);
    let state = marketplace_storefront::state::AppState::with_retry_policy(config, retry)
        .expect("storefront state");
    TestBrowser::new(marketplace_storefront::app(state))
}

/// A browser on an admin panel wired to `backend`.
///
/// # Panics
///
/// Panics if the admin state cannot be built.
#[must_use]
pub fn admin(backend: &FakeBackend) -> TestBrowser {
    let url = backend.url();
    let config = AdminConfig::from_lookup(|key| match key {
        "MARKETPLACE_API_URL" => Some(url.clone()),
        "ADMIN_BASE_URL" => Some("http://localhost:3001".to_string()),
        _ => None,
    })
    .expect("valid admin test config");
    let state = marketplace_admin::state::AppState::new(config).expect("admin state");
    TestBrowser::new(marketplace_admin::app(state))
}

/// Body of a successful `/api/auth/login`.
#[must_use]
pub fn login_reply(username: &str, role: &str) -> Reply {
    Reply::json(serde_json::json!({
        "token": format!("token-{username}"),
        "roles": [role],
        "userId": 42,
        "username": username,
        "csrfToken": "backend-csrf",
    }))
}

/// The token from a `<meta name="csrf-token">` tag or a `_csrf` hidden field.
#[must_use]
pub fn scrape_csrf_token(html: &str) -> Option<String> {
    [r#"name="csrf-token" content=""#, r#"name="_csrf" value=""#]
        .iter()
        .find_map(|marker| {
            let start = html.find(marker)? + marker.len();
            let end = html.get(start..)?.find('"')? + start;
            html.get(start..end)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_csrf_token() {
        let html = r#"<head><meta name="csrf-token" content="abc123"></head>"#;
        assert_eq!(scrape_csrf_token(html).unwrap(), "abc123");
        let form = r#"<input type="hidden" name="_csrf" value="tok">"#;
        assert_eq!(scrape_csrf_token(form).unwrap(), "tok");
        assert!(scrape_csrf_token("<p>no token</p>").is_none());
    }

    #[tokio::test]
    async fn test_fake_backend_records_requests() {
        let backend = FakeBackend::start(|_| Reply::json(serde_json::json!([]))).await;
        let mut browser = TestBrowser::new(Router::new());
        let _ = browser.get("/").await;
        assert!(backend.requests().is_empty());
        assert!(backend.url().starts_with("http://127.0.0.1:"));
    }
}
