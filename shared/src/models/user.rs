//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Role granted by the identity provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Client,
    WarehouseManager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "CLIENT",
            UserRole::WarehouseManager => "WAREHOUSE_MANAGER",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Parse an identity-provider role name; accepts `admin`, `ADMIN` and `ROLE_ADMIN`
    pub fn from_claim(role: &str) -> Option<Self> {
        let normalized = role.trim().to_ascii_uppercase().replace('-', "_");
        let normalized = normalized.strip_prefix("ROLE_").unwrap_or(&normalized);
        normalized.parse().ok()
    }

    pub fn default_profile(&self) -> RoleProfile {
        match self {
            UserRole::Admin => RoleProfile::Admin,
            UserRole::WarehouseManager => RoleProfile::WarehouseManager {
                employee_code: None,
                phone: None,
            },
            UserRole::Client => RoleProfile::Client {
                company_name: None,
                phone: None,
                shipping_address: None,
            },
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLIENT" => Ok(UserRole::Client),
            "WAREHOUSE_MANAGER" => Ok(UserRole::WarehouseManager),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(UnknownVariant::new("user role", other)),
        }
    }
}

/// Role-specific user details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleProfile {
    Admin,
    #[serde(rename_all = "camelCase")]
    WarehouseManager {
        employee_code: Option<String>,
        phone: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Client {
        company_name: Option<String>,
        phone: Option<String>,
        shipping_address: Option<String>,
    },
}

impl RoleProfile {
    pub fn role(&self) -> UserRole {
        match self {
            RoleProfile::Admin => UserRole::Admin,
            RoleProfile::WarehouseManager { .. } => UserRole::WarehouseManager,
            RoleProfile::Client { .. } => UserRole::Client,
        }
    }
}

/// A platform user mirrored from the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Subject identifier issued by the identity provider
    pub id: Uuid,
    pub email: Option<String>,
    pub name: String,
    pub role: UserRole,
    pub profile: RoleProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated principal passed explicitly into every service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_client(&self) -> bool {
        self.role == UserRole::Client
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_claim_variants() {
        assert_eq!(UserRole::from_claim("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_claim("ROLE_CLIENT"), Some(UserRole::Client));
        assert_eq!(
            UserRole::from_claim("warehouse-manager"),
            Some(UserRole::WarehouseManager)
        );
        assert_eq!(UserRole::from_claim("offline_access"), None);
    }

    #[test]
    fn test_profile_is_tagged_by_role() {
        let profile = RoleProfile::Client {
            company_name: Some("Acme".to_string()),
            phone: None,
            shipping_address: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["role"], "CLIENT");
        assert_eq!(json["companyName"], "Acme");

        let back: RoleProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back.role(), UserRole::Client);
    }

    #[test]
    fn test_role_ordering_ranks_admin_highest() {
        let mut roles = vec![UserRole::Admin, UserRole::Client, UserRole::WarehouseManager];
        roles.sort();
        assert_eq!(roles.last(), Some(&UserRole::Admin));
    }
}
