//! HTTP plumbing shared by every entity API.

use std::sync::Arc;
use std::time::Duration;

use marketplace_core::Category;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::accounts::AccountsApi;
use crate::auth::AuthApi;
use crate::cart::CartApi;
use crate::catalog::CatalogApi;
use crate::checkout::CheckoutApi;
use crate::error::ApiError;

/// Header carrying the CSRF token on state-changing requests.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long the category list is served from memory.
const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(300);

/// Credentials of a logged-in user.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Credentials {
    token: SecretString,
    csrf_token: Option<String>,
}

impl Credentials {
    /// Credentials carrying only a bearer token.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            csrf_token: None,
        }
    }

    /// Attach the CSRF token issued by the backend.
    #[must_use]
    pub fn with_csrf(mut self, csrf_token: Option<String>) -> Self {
        self.csrf_token = csrf_token;
        self
    }

    /// The raw bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    fn apply(&self, request: RequestBuilder, method: &Method) -> RequestBuilder {
        let request = request.bearer_auth(self.token.expose_secret());
        match (&self.csrf_token, is_state_changing(method)) {
            (Some(csrf), true) => request.header(CSRF_HEADER, csrf),
            _ => request,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Serialize a secret as a plain string for request bodies.
pub(crate) fn serialize_secret<S: serde::Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

/// Client for the marketplace REST backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url())
            .finish_non_exhaustive()
    }
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    categories: Cache<&'static str, Vec<Category>>,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (e.g. `http://localhost:8080`).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` is not an absolute http(s)
    /// URL, or `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed =
            url::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATEGORY_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                categories,
            }),
        })
    }

    /// The backend base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Cart endpoints for one user.
    #[must_use]
    pub fn cart(&self, credentials: Credentials) -> CartApi {
        CartApi::new(self.clone(), credentials)
    }

    /// Product, category and store endpoints; anonymous when `credentials` is `None`.
    #[must_use]
    pub fn catalog(&self, credentials: Option<Credentials>) -> CatalogApi {
        CatalogApi::new(self.clone(), credentials)
    }

    /// Checkout endpoints for one user.
    #[must_use]
    pub fn checkout(&self, credentials: Credentials) -> CheckoutApi {
        CheckoutApi::new(self.clone(), credentials)
    }

    /// Login, registration and logout.
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Admin account management endpoints.
    #[must_use]
    pub fn accounts(&self, credentials: Credentials) -> AccountsApi {
        AccountsApi::new(self.clone(), credentials)
    }

    /// Whether the backend answers HTTP at all. Any status counts; only
    /// connection failures and timeouts make it unreachable.
    pub async fn is_reachable(&self) -> bool {
        match self.request(Method::GET, "/", None).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Backend unreachable");
                false
            }
        }
    }

    pub(crate) fn category_cache(&self) -> &Cache<&'static str, Vec<Category>> {
        &self.inner.categories
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let request = self.inner.http.request(method.clone(), url);
        match credentials {
            Some(credentials) => credentials.apply(request, &method),
            None => request,
        }
    }

    /// Send a request and return the body of a success response.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = %status, path = %url, "Backend returned non-success status");
            return Err(ApiError::from_response(status, &body));
        }

        Ok(body)
    }

    /// Send a request and parse a JSON success body.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> Result<T, ApiError> {
        self.fetch(self.request(Method::GET, path, credentials)).await
    }

    pub(crate) async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        credentials: Option<&Credentials>,
        body: &B,
    ) -> Result<T, ApiError> {
        self.fetch(self.request(method, path, credentials).json(body))
            .await
    }

    /// Send a request whose success body is ignored.
    pub(crate) async fn send_unit(
        &self,
        request: RequestBuilder,
    ) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_relative_and_non_http_urls() {
        assert!(matches!(
            ApiClient::new("localhost:8080/api"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.com"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_strips_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/").expect("valid url");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials =
            Credentials::bearer("super-secret-token").with_csrf(Some("csrf-value".to_string()));
        let debug_output = format!("{credentials:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-token"));
        assert!(!debug_output.contains("csrf-value"));
    }

    #[test]
    fn test_state_changing_methods() {
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
    }
}
