//! Admin principal

use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-tier admin role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Standard,
    Elevated,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Elevated => "elevated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "elevated" => Some(Self::Elevated),
            _ => None,
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Elevated)
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored admin account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub username: String,
    /// argon2 PHC string
    pub password_hash: String,
    pub role: AdminRole,
    pub created_at: i64,
}
