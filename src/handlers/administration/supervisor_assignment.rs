// /api/administration/supervisor-agent-assignment (single edge) and
// /api/administration/supervisor-batch-assignment (bulk reconcile)
use axum::extract::State;
use axum::response::Json;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::authz::require_admin;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::RoleService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetSupervisorRequest {
    pub agent_id: Uuid,
    pub supervisor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub supervisor_id: Uuid,
    pub agent_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SupervisorOption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AgentOption {
    pub id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// POST - set or clear one agent's supervisor (ADMIN only)
pub async fn set_supervisor(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SetSupervisorRequest>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let service = RoleService::new(state.pool.clone());
    let agent = service.set_supervisor(payload.agent_id, payload.supervisor_id).await?;

    let message = if payload.supervisor_id.is_some() {
        "Agent assigned to supervisor"
    } else {
        "Agent removed from supervisor"
    };
    Ok(ApiResponse::success(json!({ "message": message, "agent": agent })))
}

/// GET - supervisors and agents available for batch assignment (ADMIN only)
pub async fn batch_options(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let supervisors = sqlx::query_as::<_, SupervisorOption>(
        r#"
        SELECT a.id, u.id AS user_id, u.name, u.email
        FROM agents a
        JOIN users u ON u.id = a.user_id
        WHERE u.role = 'SUPERVISOR'
        ORDER BY u.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let agents = sqlx::query_as::<_, AgentOption>(
        r#"
        SELECT a.id, a.supervisor_id, u.id AS user_id, u.name, u.email
        FROM agents a
        JOIN users u ON u.id = a.user_id
        WHERE u.role = 'AGENT'
        ORDER BY u.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(json!({ "supervisors": supervisors, "agents": agents })))
}

/// POST - reconcile one supervisor's agent set against a target set (ADMIN only)
pub async fn batch_assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<BatchRequest>,
) -> ApiResult<Value> {
    require_admin(user.role)?;

    let service = RoleService::new(state.pool.clone());
    let outcome = service.batch_assign(payload.supervisor_id, &payload.agent_ids).await?;

    Ok(ApiResponse::success(json!({
        "message": "Agent assignments updated successfully",
        "added": outcome.added,
        "removed": outcome.removed
    })))
}
