//! Session-related types for admin authentication.

use marketplace_client::{AuthSession, Credentials};
use marketplace_core::UserId;
use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
///
/// Holds the backend bearer token, so `Debug` is implemented by hand.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub token: String,
    pub csrf_token: Option<String>,
    pub user_id: Option<UserId>,
    /// Display name shown in the header.
    pub username: String,
}

impl CurrentAdmin {
    /// Identity for a backend login, with `typed_username` as the fallback
    /// display name.
    #[must_use]
    pub fn from_login(auth: &AuthSession, typed_username: &str) -> Self {
        Self {
            token: auth.token.clone(),
            csrf_token: auth.csrf_token.clone(),
            user_id: auth.user_id,
            username: auth
                .username
                .clone()
                .unwrap_or_else(|| typed_username.to_string()),
        }
    }

    /// Backend credentials for this admin.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::bearer(self.token.clone()).with_csrf(self.csrf_token.clone())
    }
}

impl std::fmt::Debug for CurrentAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentAdmin")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// The logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
    /// CSRF token protecting the admin panel's own forms.
    pub const FORM_TOKEN: &str = "form_token";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_login_falls_back_to_typed_name() {
        let auth: AuthSession =
            serde_json::from_str(r#"{"token":"jwt","roles":["ROLE_ADMIN"],"id":3}"#).unwrap();
        let admin = CurrentAdmin::from_login(&auth, "ops");
        assert_eq!(admin.username, "ops");
        assert_eq!(admin.user_id, Some(UserId::new(3)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let admin = CurrentAdmin {
            token: "secret-jwt".to_string(),
            csrf_token: None,
            user_id: None,
            username: "ops".to_string(),
        };
        assert!(!format!("{admin:?}").contains("secret-jwt"));
    }
}
