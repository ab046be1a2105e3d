use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MutationError;

/// Verified caller, as handed over by the identity verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }

    /// Whether a member holding `self` may act where `required` is needed.
    pub fn grants(self, required: Role) -> bool {
        match required {
            Role::Viewer => true,
            Role::Admin => self == Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role {0:?}, expected admin or viewer")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A roster entry granting an identity access to the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: i64,
    pub identity_id: i64,
    pub display_name: Option<String>,
    pub role: Role,
    pub added_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Pre-checks a removal or demotion of `target` requested by `actor`.
/// The last-admin guard runs against the stored roster afterwards.
pub fn check_self_change(actor: i64, target: i64, new_role: Option<Role>) -> Result<(), MutationError> {
    if actor == target && new_role != Some(Role::Admin) {
        return Err(MutationError::SelfRemoval);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_grants_everything_viewer_only_reads() {
        assert!(Role::Admin.grants(Role::Admin));
        assert!(Role::Admin.grants(Role::Viewer));
        assert!(Role::Viewer.grants(Role::Viewer));
        assert!(!Role::Viewer.grants(Role::Admin));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Viewer".parse::<Role>(), Ok(Role::Viewer));
        assert_eq!("owner".parse::<Role>(), Err(UnknownRole("owner".into())));
    }

    #[test]
    fn self_removal_and_self_demotion_are_rejected() {
        assert!(matches!(check_self_change(7, 7, None), Err(MutationError::SelfRemoval)));
        assert!(matches!(
            check_self_change(7, 7, Some(Role::Viewer)),
            Err(MutationError::SelfRemoval)
        ));
        assert!(check_self_change(7, 7, Some(Role::Admin)).is_ok());
        assert!(check_self_change(7, 8, None).is_ok());
    }
}
