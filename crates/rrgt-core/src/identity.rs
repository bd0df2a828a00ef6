use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Account Owner")]
    AccountOwner,
    #[serde(rename = "Account Manager")]
    AccountManager,
    #[serde(rename = "Project Owner")]
    ProjectOwner,
    #[serde(rename = "Objective Owner")]
    ObjectiveOwner,
    #[serde(rename = "Team Member")]
    TeamMember,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::AccountOwner => "Account Owner",
            Role::AccountManager => "Account Manager",
            Role::ProjectOwner => "Project Owner",
            Role::ObjectiveOwner => "Objective Owner",
            Role::TeamMember => "Team Member",
        }
    }

    /// Whether this role may read other members' plan and dial data
    /// (the manager god-view).
    pub fn is_account_admin(self) -> bool {
        matches!(self, Role::AccountOwner | Role::AccountManager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::RrgtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Account Owner" => Ok(Role::AccountOwner),
            "Account Manager" => Ok(Role::AccountManager),
            "Project Owner" => Ok(Role::ProjectOwner),
            "Objective Owner" => Ok(Role::ObjectiveOwner),
            "Team Member" => Ok(Role::TeamMember),
            _ => Err(crate::error::RrgtError::InvalidRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The resolved caller, produced by the auth collaborator before the core is
/// entered. Every core operation takes one explicitly; nothing here is read
/// from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub team_member_id: Uuid,
    pub team_id: Uuid,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn admin_roles() {
        assert!(Role::AccountOwner.is_account_admin());
        assert!(Role::AccountManager.is_account_admin());
        assert!(!Role::ProjectOwner.is_account_admin());
        assert!(!Role::ObjectiveOwner.is_account_admin());
        assert!(!Role::TeamMember.is_account_admin());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            Role::AccountOwner,
            Role::AccountManager,
            Role::ProjectOwner,
            Role::ObjectiveOwner,
            Role::TeamMember,
        ] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::from_str("Supreme Leader").is_err());
    }
}
