//! Authorization guard: pure predicates over (role, resource ownership).
//!
//! Unauthenticated callers never reach these checks - the JWT middleware
//! rejects them with 401 first. Everything here distinguishes "role
//! insufficient" and "ownership violated", both mapped to 403.

use uuid::Uuid;

use crate::database::models::Role;
use crate::error::ApiError;

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied(&'static str),
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }

    fn into_result(self) -> Result<(), ApiError> {
        match self {
            Access::Allowed => Ok(()),
            Access::Denied(reason) => Err(ApiError::forbidden(reason)),
        }
    }
}

/// ADMIN-only operations (role management, supervisor wiring)
pub fn check_admin(role: Role) -> Access {
    match role {
        Role::Admin => Access::Allowed,
        _ => Access::Denied("Insufficient permissions"),
    }
}

/// Staff operations: ADMIN or SUPERVISOR (assignment views and management)
pub fn check_staff(role: Role) -> Access {
    match role {
        Role::Admin | Role::Supervisor => Access::Allowed,
        _ => Access::Denied("Insufficient permissions"),
    }
}

/// A supervisor may manage a resource tied to an agent when that agent reports
/// to them, or when the agent is the supervisor themselves.
pub fn supervisor_may_manage(
    caller_agent_id: Uuid,
    target_agent_id: Uuid,
    target_supervisor_id: Option<Uuid>,
) -> bool {
    target_supervisor_id == Some(caller_agent_id) || target_agent_id == caller_agent_id
}

/// A supervisor may assign work only to agents under their supervision
/// (self-assignment is handled separately where a route permits it).
pub fn supervisor_supervises(caller_agent_id: Uuid, target_supervisor_id: Option<Uuid>) -> bool {
    target_supervisor_id == Some(caller_agent_id)
}

pub fn require_admin(role: Role) -> Result<(), ApiError> {
    check_admin(role).into_result()
}

pub fn require_staff(role: Role) -> Result<(), ApiError> {
    check_staff(role).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_check_allows_only_admin() {
        assert!(check_admin(Role::Admin).is_allowed());
        assert!(!check_admin(Role::Supervisor).is_allowed());
        assert!(!check_admin(Role::Agent).is_allowed());
        assert!(!check_admin(Role::User).is_allowed());
    }

    #[test]
    fn staff_check_allows_admin_and_supervisor() {
        assert!(check_staff(Role::Admin).is_allowed());
        assert!(check_staff(Role::Supervisor).is_allowed());
        assert!(!check_staff(Role::Agent).is_allowed());
        assert!(!check_staff(Role::User).is_allowed());
    }

    #[test]
    fn denial_maps_to_forbidden() {
        let err = require_staff(Role::Agent).unwrap_err();
        assert_eq!(err.status_code(), 403);
        let err = require_admin(Role::Supervisor).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn supervisor_owns_supervised_agents_and_self() {
        let supervisor = Uuid::new_v4();
        let supervised = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        // Agent reporting to the caller
        assert!(supervisor_may_manage(supervisor, supervised, Some(supervisor)));
        // The caller's own agent record
        assert!(supervisor_may_manage(supervisor, supervisor, None));
        // Agent with another supervisor
        assert!(!supervisor_may_manage(supervisor, stranger, Some(stranger)));
        // Unsupervised agent that is not the caller
        assert!(!supervisor_may_manage(supervisor, stranger, None));
    }

    #[test]
    fn assignment_creation_excludes_self() {
        let supervisor = Uuid::new_v4();
        assert!(supervisor_supervises(supervisor, Some(supervisor)));
        assert!(!supervisor_supervises(supervisor, None));
        assert!(!supervisor_supervises(supervisor, Some(Uuid::new_v4())));
    }
}
