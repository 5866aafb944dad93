//! User-related types
//!
//! The core only needs a user's identity and whether they may transact;
//! everything else about a user lives in the external user directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier
pub type UserId = u64;

/// Administrator identifier recorded on reviewed transactions
pub type AdminId = u64;

/// Lifecycle status of a user account
///
/// Users are never deleted, only flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
    Deleted,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Active => write!(f, "ACTIVE"),
            UserStatus::Suspended => write!(f, "SUSPENDED"),
            UserStatus::Deleted => write!(f, "DELETED"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "SUSPENDED" => Ok(UserStatus::Suspended),
            "DELETED" => Ok(UserStatus::Deleted),
            other => Err(format!("Unknown user status '{}'", other)),
        }
    }
}

/// A user as seen by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Verified mobile number, opaque to the core
    pub mobile: String,
    pub status: UserStatus,
}

impl User {
    pub fn active(id: UserId, mobile: impl Into<String>) -> Self {
        User {
            id,
            mobile: mobile.into(),
            status: UserStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
