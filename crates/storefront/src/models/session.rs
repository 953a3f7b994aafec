//! Session-stored identity and checkout bookkeeping.
//!
//! Each value lives under its own key so individual flags (`cart_count`,
//! `payment_completed`, ...) can be read and cleared without touching the
//! rest of the login state.

use marketplace_client::{AuthSession, Credentials};
use marketplace_core::{Role, StoreId, UserId};
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

/// Session keys.
pub mod keys {
    /// Backend bearer token.
    pub const TOKEN: &str = "token";
    /// Roles of the logged-in user.
    pub const USER_ROLES: &str = "user_roles";
    pub const USER_ID: &str = "user_id";
    pub const USER_STORE_ID: &str = "user_store_id";
    pub const USER_STORE_NAME: &str = "user_store_name";
    pub const USERNAME: &str = "username";
    /// CSRF token issued by the backend at login, forwarded on writes.
    pub const CSRF_TOKEN: &str = "csrf_token";
    /// CSRF token protecting the storefront's own forms.
    pub const FORM_TOKEN: &str = "form_token";
    /// Set once the post-payment cart-clear cascade succeeded.
    pub const CART_CLEARED: &str = "cart_cleared";
    /// Set once the card payment was confirmed.
    pub const PAYMENT_COMPLETED: &str = "payment_completed";
    pub const LAST_ORDER_ID: &str = "last_order_id";
    pub const LAST_PAYMENT_INTENT: &str = "last_payment_intent";
    /// Cached item count for the header badge.
    pub const CART_COUNT: &str = "cart_count";
    /// Current checkout stage.
    pub const CHECKOUT_STAGE: &str = "checkout_stage";
    /// Marketplace filters and page.
    pub const LISTING_STATE: &str = "listing_state";
}

/// The logged-in user, rebuilt from the individual session keys.
#[derive(Clone)]
pub struct SessionUser {
    pub token: String,
    pub roles: Vec<Role>,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
    pub csrf_token: Option<String>,
}

impl std::fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionUser")
            .field("token", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl SessionUser {
    /// Backend credentials for this user.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::bearer(self.token.clone()).with_csrf(self.csrf_token.clone())
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        role.is_in(&self.roles)
    }

    /// Key for per-user caches: the user id, or the token when the backend
    /// did not report one.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.user_id
            .map_or_else(|| format!("token:{}", self.token), |id| format!("user:{id}"))
    }

    /// Read the user from the session. `None` when nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(session: &Session) -> Result<Option<Self>, SessionError> {
        let Some(token) = session.get::<String>(keys::TOKEN).await? else {
            return Ok(None);
        };
        Ok(Some(Self {
            token,
            roles: session.get(keys::USER_ROLES).await?.unwrap_or_default(),
            user_id: session.get(keys::USER_ID).await?,
            username: session.get(keys::USERNAME).await?,
            store_id: session.get(keys::USER_STORE_ID).await?,
            store_name: session.get(keys::USER_STORE_NAME).await?,
            csrf_token: session.get(keys::CSRF_TOKEN).await?,
        }))
    }

    /// Persist a fresh login. The session id is cycled to prevent fixation.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn store(session: &Session, auth: &AuthSession) -> Result<(), SessionError> {
        session.cycle_id().await?;
        session.insert(keys::TOKEN, &auth.token).await?;
        session.insert(keys::USER_ROLES, &auth.roles).await?;
        insert_opt(session, keys::USER_ID, auth.user_id.as_ref()).await?;
        insert_opt(session, keys::USERNAME, auth.username.as_ref()).await?;
        insert_opt(session, keys::USER_STORE_ID, auth.store_id.as_ref()).await?;
        insert_opt(session, keys::USER_STORE_NAME, auth.store_name.as_ref()).await?;
        insert_opt(session, keys::CSRF_TOKEN, auth.csrf_token.as_ref()).await?;
        Ok(())
    }

    /// Forget the login and every per-user flag (logout or expired token).
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn clear(session: &Session) -> Result<(), SessionError> {
        for key in [
            keys::TOKEN,
            keys::USER_ROLES,
            keys::USER_ID,
            keys::USERNAME,
            keys::USER_STORE_ID,
            keys::USER_STORE_NAME,
            keys::CSRF_TOKEN,
            keys::CART_CLEARED,
            keys::PAYMENT_COMPLETED,
            keys::LAST_ORDER_ID,
            keys::LAST_PAYMENT_INTENT,
            keys::CART_COUNT,
            keys::CHECKOUT_STAGE,
        ] {
            session.remove_value(key).await?;
        }
        Ok(())
    }
}

async fn insert_opt<T: serde::Serialize + Sync>(
    session: &Session,
    key: &str,
    value: Option<&T>,
) -> Result<(), SessionError> {
    match value {
        Some(value) => session.insert(key, value).await,
        None => session.remove_value(key).await.map(|_| ()),
    }
}

/// Cached cart badge count; 0 when unknown.
pub async fn cart_count(session: &Session) -> u32 {
    session
        .get::<u32>(keys::CART_COUNT)
        .await
        .ok()
        .flatten()
        .unwrap_or(0)
}

/// Update the cached cart badge count.
pub async fn set_cart_count(session: &Session, count: u32) {
    if let Err(e) = session.insert(keys::CART_COUNT, count).await {
        tracing::warn!(error = %e, "Failed to store cart count");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn auth() -> AuthSession {
        serde_json::from_str(
            r#"{"token":"jwt-1","roles":["ROLE_BUYER"],"userId":9,"csrfToken":"c"}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let session = session();
        assert!(SessionUser::load(&session).await.unwrap().is_none());

        SessionUser::store(&session, &auth()).await.unwrap();
        let user = SessionUser::load(&session).await.unwrap().unwrap();
        assert_eq!(user.token, "jwt-1");
        assert_eq!(user.roles, vec![Role::Buyer]);
        assert_eq!(user.user_id, Some(UserId::new(9)));
        assert_eq!(user.cache_key(), "user:9");
        assert_eq!(user.csrf_token.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_clear_removes_login_and_flags() {
        let session = session();
        SessionUser::store(&session, &auth()).await.unwrap();
        set_cart_count(&session, 4).await;
        session.insert(keys::PAYMENT_COMPLETED, true).await.unwrap();

        SessionUser::clear(&session).await.unwrap();
        assert!(SessionUser::load(&session).await.unwrap().is_none());
        assert_eq!(cart_count(&session).await, 0);
        assert!(
            session
                .get::<bool>(keys::PAYMENT_COMPLETED)
                .await
                .unwrap()
                .is_none()
        );
    }
}
