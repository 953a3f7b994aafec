//! User account records shown in the admin dashboard.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::id::{StoreId, UserId};

const fn default_true() -> bool {
    true
}

/// Which kind of account a record belongs to.
///
/// Buyers, sellers and admins share one record shape; the kind selects the
/// backend collection (`/api/admin/{kind}`) and the dashboard labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Buyer,
    Seller,
    Admin,
}

impl AccountKind {
    /// Path segment of the backend collection.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Buyer => "buyers",
            Self::Seller => "sellers",
            Self::Admin => "admins",
        }
    }

    /// Singular display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

/// A buyer, seller or admin account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(alias = "userId", alias = "buyerId", alias = "sellerId", alias = "adminId")]
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(default = "default_true", alias = "active", alias = "enabled")]
    pub is_active: bool,
    /// Seller's store, when the account is a seller.
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub store_name: Option<String>,
    /// Raw creation timestamp as sent by the backend.
    #[serde(default, alias = "createdDate", alias = "registeredAt")]
    pub created_at: Option<String>,
}

impl UserAccount {
    /// Full name, falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Format a backend timestamp as `Jan 05, 2025`.
///
/// Accepts RFC 3339 and zone-less ISO timestamps; anything else is shown as
/// sent, and a missing value renders as `-`.
#[must_use]
pub fn display_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return "-".to_string();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%b %d, %Y").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%b %d, %Y").to_string();
    }
    raw.to_string()
}
