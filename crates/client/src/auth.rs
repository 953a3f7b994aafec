//! Login, registration and logout.

use marketplace_core::{Email, Role, StoreId, UserId};
use reqwest::Method;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::client::{ApiClient, Credentials, serialize_secret};
use crate::error::ApiError;

/// Username/password login form.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

/// Buyer or seller registration form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: Email,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub role: Role,
    /// Store name, for seller registrations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
}

/// What the backend returns on a successful login.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    #[serde(alias = "accessToken", alias = "jwt")]
    pub token: String,
    #[serde(default, deserialize_with = "lenient_roles")]
    pub roles: Vec<Role>,
    #[serde(default, alias = "id")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default, alias = "csrf")]
    pub csrf_token: Option<String>,
}

impl AuthSession {
    /// Credentials for subsequent requests on behalf of this user.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::bearer(self.token.clone()).with_csrf(self.csrf_token.clone())
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        role.is_in(&self.roles)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("user_id", &self.user_id)
            .field("store_id", &self.store_id)
            .finish_non_exhaustive()
    }
}

/// Roles arrive as a list or a single string; unknown authorities are skipped.
fn lenient_roles<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<Role>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRoles {
        Many(Vec<String>),
        One(String),
    }

    let raw = match Option::<RawRoles>::deserialize(deserializer)? {
        Some(RawRoles::Many(roles)) => roles,
        Some(RawRoles::One(role)) => vec![role],
        None => Vec::new(),
    };
    Ok(raw
        .iter()
        .filter_map(|role| match role.parse() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(error = %e, "Skipping unknown role");
                None
            }
        })
        .collect())
}

/// Authentication endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub(crate) const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange a username and password for a session token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or another
    /// error if the request fails.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthSession, ApiError> {
        self.client
            .send_json(Method::POST, "/api/auth/login", None, request)
            .await
    }

    /// Create a new buyer or seller account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration (a taken
    /// username carries `ApiErrorCode::Duplicate`).
    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let request = self
            .client
            .request(Method::POST, "/api/auth/register", None)
            .json(request);
        self.client.send_unit(request).await
    }

    /// Invalidate the token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, credentials))]
    pub async fn logout(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let request = self
            .client
            .request(Method::POST, "/api/auth/logout", Some(credentials));
        self.client.send_unit(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_session_shape() {
        let session: AuthSession = serde_json::from_str(
            r#"{"token":"jwt-abc","roles":["ROLE_BUYER","ROLE_UNKNOWN"],"userId":"12",
                "csrfToken":"c1"}"#,
        )
        .unwrap();
        assert_eq!(session.roles, vec![Role::Buyer]);
        assert_eq!(session.user_id, Some(UserId::new(12)));
        assert!(session.has_role(Role::Buyer));
        assert!(!session.has_role(Role::Admin));
        assert_eq!(session.credentials().token(), "jwt-abc");
    }

    #[test]
    fn test_auth_session_single_role_and_alias() {
        let session: AuthSession =
            serde_json::from_str(r#"{"accessToken":"t","roles":"admin","id":1}"#).unwrap();
        assert_eq!(session.roles, vec![Role::Admin]);
        assert!(session.csrf_token.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let session: AuthSession = serde_json::from_str(r#"{"token":"very-secret"}"#).unwrap();
        assert!(!format!("{session:?}").contains("very-secret"));
    }

    #[test]
    fn test_login_request_serializes_password() {
        let request = LoginRequest {
            username: "dana".to_string(),
            password: SecretString::from("hunter22".to_string()),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["password"], "hunter22");
    }
}
