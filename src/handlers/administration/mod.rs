// Administration endpoints: /api/administration/*
//
// Every handler resolves the caller's role from the JWT context, runs the
// authorization guard, then delegates mutations to the service layer.
pub mod agents;
pub mod customer_agents;
pub mod customer_policies;
pub mod policy_agents;
pub mod supervisor_assignment;
pub mod supervisors;
pub mod users;

use sqlx::PgPool;

use crate::database::models::Agent;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services;

/// Resolve the agent record backing a SUPERVISOR caller. Supervisors without
/// an agent record cannot own anything, mirrored as 404.
pub(crate) async fn caller_agent(pool: &PgPool, user: &AuthUser) -> Result<Agent, ApiError> {
    services::agent_for_user(pool, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supervisor agent record not found"))
}
