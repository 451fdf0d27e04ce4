//! Resolved requester identity.

use serde::{Deserialize, Serialize};

use crate::{ParseStatusError, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "CUSTOMER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(UserRole::Customer),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(ParseStatusError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// A user as resolved by the external user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
}

impl UserIdentity {
    pub fn customer(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role: UserRole::Customer,
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role: UserRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
