//! User roles issued by the marketplace backend.

use serde::{Deserialize, Serialize};

/// Marketplace user role.
///
/// The backend reports roles as Spring-style authorities (`ROLE_BUYER`) on
/// some endpoints and bare lowercase names (`buyer`) on others; both parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Role {
    /// Browses the marketplace, owns a cart, checks out.
    Buyer,
    /// Owns a store and lists products.
    Seller,
    /// Manages users, products and categories.
    Admin,
}

impl Role {
    /// Whether any of `roles` is this role.
    #[must_use]
    pub fn is_in(self, roles: &[Self]) -> bool {
        roles.contains(&self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("role_").unwrap_or(&name);
        match name {
            "buyer" | "customer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authority_and_bare_names() {
        assert_eq!("ROLE_BUYER".parse::<Role>().unwrap(), Role::Buyer);
        assert_eq!("seller".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("ROLE_GUEST".parse::<Role>().is_err());
    }

    #[test]
    fn test_deserialize_mixed_list() {
        let roles: Vec<Role> = serde_json::from_str(r#"["ROLE_SELLER","buyer"]"#).unwrap();
        assert_eq!(roles, vec![Role::Seller, Role::Buyer]);
        assert!(Role::Seller.is_in(&roles));
        assert!(!Role::Admin.is_in(&roles));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for role in [Role::Buyer, Role::Seller, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
