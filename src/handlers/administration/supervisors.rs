// /api/administration/supervisors - list supervisors, promote/demote (ADMIN only)
use axum::extract::State;
use axum::response::Json;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::authz::require_admin;
use crate::database::models::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::RoleService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub user_id: Uuid,
    pub action: String,
}

#[derive(Debug, FromRow)]
struct SupervisorRow {
    id: Uuid,
    name: String,
    email: String,
    agent_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct SupervisedAgentRow {
    id: Uuid,
    supervisor_id: Option<Uuid>,
    name: String,
    email: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AssignableAgent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub agent_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SupervisedAgent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SupervisorInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub agent_id: Option<Uuid>,
    pub supervised_agents: Vec<SupervisedAgent>,
}

/// GET - supervisors with their supervisees, plus agents eligible for promotion
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let supervisors = sqlx::query_as::<_, SupervisorRow>(
        r#"
        SELECT u.id, u.name, u.email, a.id AS agent_id
        FROM users u
        LEFT JOIN agents a ON a.user_id = u.id
        WHERE u.role = 'SUPERVISOR'
        ORDER BY u.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let supervised = sqlx::query_as::<_, SupervisedAgentRow>(
        r#"
        SELECT a.id, a.supervisor_id, u.name, u.email
        FROM agents a
        JOIN users u ON u.id = a.user_id
        WHERE a.supervisor_id IS NOT NULL
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let agents = sqlx::query_as::<_, AssignableAgent>(
        r#"
        SELECT u.id, u.name, u.email, a.id AS agent_id, a.supervisor_id
        FROM users u
        LEFT JOIN agents a ON a.user_id = u.id
        WHERE u.role = 'AGENT'
        ORDER BY u.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let supervisors: Vec<SupervisorInfo> = supervisors
        .into_iter()
        .map(|s| {
            let supervised_agents = supervised
                .iter()
                .filter(|a| a.supervisor_id == s.agent_id && s.agent_id.is_some())
                .map(|a| SupervisedAgent { id: a.id, name: a.name.clone(), email: a.email.clone() })
                .collect();
            SupervisorInfo {
                id: s.id,
                name: s.name,
                email: s.email,
                agent_id: s.agent_id,
                supervised_agents,
            }
        })
        .collect();

    Ok(ApiResponse::success(json!({ "supervisors": supervisors, "agents": agents })))
}

/// POST - promote an agent to SUPERVISOR or demote a supervisor to AGENT.
///
/// Only the AGENT -> SUPERVISOR and SUPERVISOR -> AGENT transitions are valid
/// here; other role changes go through user management. Demotion cascades:
/// every supervised agent is unassigned in the same transaction as the role
/// change.
pub async fn act(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ActionRequest>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let current: Option<(Role,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
        .bind(payload.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let (current,) = current.ok_or_else(|| ApiError::not_found("User not found"))?;

    let service = RoleService::new(state.pool.clone());
    match payload.action.as_str() {
        "promote" => {
            if current != Role::Agent {
                return Err(ApiError::bad_request("Only agents can be promoted to supervisor"));
            }
            let updated = service.change_role(payload.user_id, Role::Supervisor).await?;
            Ok(ApiResponse::success(json!({
                "message": "User promoted to supervisor",
                "user": updated
            })))
        }
        "demote" => {
            if current != Role::Supervisor {
                return Err(ApiError::bad_request("Only supervisors can be demoted to agent"));
            }
            let updated = service.change_role(payload.user_id, Role::Agent).await?;
            Ok(ApiResponse::success(json!({
                "message": "Supervisor demoted to agent",
                "user": updated
            })))
        }
        _ => Err(ApiError::bad_request("Invalid action")),
    }
}
