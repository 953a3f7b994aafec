//! Admin management of buyer, seller and admin accounts.

use marketplace_core::{AccountKind, Email, Page, UserAccount, UserId};
use reqwest::Method;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::client::{ApiClient, Credentials, serialize_secret};
use crate::error::ApiError;

/// Fields for creating an admin account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    pub username: String,
    pub email: Email,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// `/api/admin/{buyers|sellers|admins}` endpoints.
#[derive(Debug, Clone)]
pub struct AccountsApi {
    client: ApiClient,
    credentials: Credentials,
}

impl AccountsApi {
    pub(crate) const fn new(client: ApiClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn path(kind: AccountKind, id: Option<UserId>) -> String {
        match id {
            Some(id) => format!("/api/admin/{}/{id}", kind.collection()),
            None => format!("/api/admin/{}", kind.collection()),
        }
    }

    /// Every account of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list(&self, kind: AccountKind) -> Result<Vec<UserAccount>, ApiError> {
        let page: Page<UserAccount> = self
            .client
            .get(&Self::path(kind, None), Some(&self.credentials))
            .await?;
        Ok(page.items)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: AccountKind, id: UserId) -> Result<(), ApiError> {
        let request = self.client.request(
            Method::DELETE,
            &Self::path(kind, Some(id)),
            Some(&self.credentials),
        );
        self.client.send_unit(request).await
    }

    /// Activate or deactivate a buyer or seller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn set_active(
        &self,
        kind: AccountKind,
        id: UserId,
        active: bool,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .request(
                Method::PUT,
                &format!("{}/status", Self::path(kind, Some(id))),
                Some(&self.credentials),
            )
            .json(&json!({ "active": active }));
        self.client.send_unit(request).await
    }

    /// Create an admin account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the account.
    #[instrument(skip(self, admin), fields(username = %admin.username))]
    pub async fn create_admin(&self, admin: &NewAdmin) -> Result<(), ApiError> {
        let request = self
            .client
            .request(
                Method::POST,
                &Self::path(AccountKind::Admin, None),
                Some(&self.credentials),
            )
            .json(admin);
        self.client.send_unit(request).await
    }
}
