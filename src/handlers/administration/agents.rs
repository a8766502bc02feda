// GET /api/administration/agents - role-filtered agent listing
use axum::extract::State;
use axum::Extension;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::authz::require_staff;
use crate::database::models::Role;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

use super::caller_agent;

#[derive(Debug, Serialize, FromRow)]
pub struct AgentListItem {
    pub id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// ADMIN sees every agent; SUPERVISOR sees their supervisees plus themselves
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<AgentListItem>> {
    require_staff(user.role)?;

    let agents = if user.role == Role::Admin {
        sqlx::query_as::<_, AgentListItem>(
            r#"
            SELECT a.id, a.supervisor_id, u.id AS user_id, u.name, u.email
            FROM agents a
            JOIN users u ON u.id = a.user_id
            ORDER BY u.name
            "#,
        )
        .fetch_all(&state.pool)
        .await?
    } else {
        let me = caller_agent(&state.pool, &user).await?;
        sqlx::query_as::<_, AgentListItem>(
            r#"
            SELECT a.id, a.supervisor_id, u.id AS user_id, u.name, u.email
            FROM agents a
            JOIN users u ON u.id = a.user_id
            WHERE a.supervisor_id = $1 OR a.id = $1
            ORDER BY u.name
            "#,
        )
        .bind(me.id)
        .fetch_all(&state.pool)
        .await?
    };

    Ok(ApiResponse::success(agents))
}
