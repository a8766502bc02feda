use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed role enumeration. Parsed once at the boundary (token claims or
/// request bodies) and passed as a typed value through the guard and services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Agent,
    Supervisor,
    Admin,
}

impl Role {
    /// Roles that hold an agent record and may be assigned to customers
    pub fn is_agent_like(self) -> bool {
        matches!(self, Role::Agent | Role::Supervisor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Agent => "AGENT",
            Role::Supervisor => "SUPERVISOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "AGENT" => Ok(Role::Agent),
            "SUPERVISOR" => Ok(Role::Supervisor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("SUPERVISOR".parse::<Role>().unwrap(), Role::Supervisor);
        assert_eq!("AGENT".parse::<Role>().unwrap(), Role::Agent);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn rejects_unknown_roles() {
        assert!("MANAGER".parse::<Role>().is_err());
        assert!("admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for role in [Role::User, Role::Agent, Role::Supervisor, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_uppercase_names() {
        assert_eq!(serde_json::to_string(&Role::Supervisor).unwrap(), "\"SUPERVISOR\"");
        let role: Role = serde_json::from_str("\"AGENT\"").unwrap();
        assert_eq!(role, Role::Agent);
    }

    #[test]
    fn agent_like_roles() {
        assert!(Role::Agent.is_agent_like());
        assert!(Role::Supervisor.is_agent_like());
        assert!(!Role::User.is_agent_like());
        assert!(!Role::Admin.is_agent_like());
    }
}
