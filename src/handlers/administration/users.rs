// /api/administration/users and /api/administration/users/management
use axum::extract::{Query, State};
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
pub struct RoleQuery {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub user_id: Uuid,
    pub new_role: String,
}

#[derive(Debug, FromRow)]
struct UserAgentRow {
    id: Uuid,
    name: String,
    email: String,
    role: Role,
    agent_id: Option<Uuid>,
    supervisor_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct AgentUserRow {
    id: Uuid,
    supervisor_id: Option<Uuid>,
    user_id: Uuid,
    name: String,
    email: String,
}

#[derive(Debug, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SupervisorRef {
    pub id: Uuid,
    pub user: UserRef,
}

#[derive(Debug, Serialize)]
pub struct AgentDetail {
    pub id: Uuid,
    pub supervisor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<SupervisorRef>,
    pub supervised_agents: Vec<SupervisorRef>,
}

#[derive(Debug, Serialize)]
pub struct ManagedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentDetail>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserByRole {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub agent_id: Option<Uuid>,
}

/// GET /api/administration/users?role= - users holding one role (ADMIN only)
pub async fn list_by_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RoleQuery>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let role: Role = query
        .role
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Role parameter is required"))?
        .parse()
        .map_err(|e: String| ApiError::validation_error(e, None))?;

    let users = sqlx::query_as::<_, UserByRole>(
        r#"
        SELECT u.id, u.name, u.email, a.id AS agent_id
        FROM users u
        LEFT JOIN agents a ON a.user_id = u.id
        WHERE u.role = $1
        ORDER BY u.name
        "#,
    )
    .bind(role)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(json!({ "users": users })))
}

/// GET /api/administration/users/management - all users with nested
/// agent/supervisor/supervisee detail (ADMIN only)
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let users = sqlx::query_as::<_, UserAgentRow>(
        r#"
        SELECT u.id, u.name, u.email, u.role, a.id AS agent_id, a.supervisor_id
        FROM users u
        LEFT JOIN agents a ON a.user_id = u.id
        ORDER BY u.role, u.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let agents = sqlx::query_as::<_, AgentUserRow>(
        r#"
        SELECT a.id, a.supervisor_id, u.id AS user_id, u.name, u.email
        FROM agents a
        JOIN users u ON u.id = a.user_id
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let managed: Vec<ManagedUser> = users
        .into_iter()
        .map(|u| {
            let agent = u.agent_id.map(|agent_id| {
                let supervisor = u.supervisor_id.and_then(|sup_id| {
                    agents.iter().find(|a| a.id == sup_id).map(|a| SupervisorRef {
                        id: a.id,
                        user: UserRef {
                            id: a.user_id,
                            name: a.name.clone(),
                            email: a.email.clone(),
                        },
                    })
                });
                let supervised_agents = agents
                    .iter()
                    .filter(|a| a.supervisor_id == Some(agent_id))
                    .map(|a| SupervisorRef {
                        id: a.id,
                        user: UserRef {
                            id: a.user_id,
                            name: a.name.clone(),
                            email: a.email.clone(),
                        },
                    })
                    .collect();
                AgentDetail {
                    id: agent_id,
                    supervisor_id: u.supervisor_id,
                    supervisor,
                    supervised_agents,
                }
            });
            ManagedUser { id: u.id, name: u.name, email: u.email, role: u.role, agent }
        })
        .collect();

    Ok(ApiResponse::success(json!({ "users": managed })))
}

/// POST /api/administration/users/management - change a user's role with
/// cascading side effects (ADMIN only)
pub async fn change_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let new_role: Role = payload
        .new_role
        .parse()
        .map_err(|e: String| ApiError::validation_error(e, None))?;

    let service = RoleService::new(state.pool.clone());
    let updated = service.change_role(payload.user_id, new_role).await?;

    Ok(ApiResponse::success(json!({
        "message": format!("User role updated to {}", new_role),
        "user": updated
    })))
}
