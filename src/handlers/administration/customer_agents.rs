// /api/administration/customer-agents - manage customer-agent assignments
use axum::extract::{Query, State};
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz::{require_staff, supervisor_may_manage, supervisor_supervises};
use crate::database::models::{CustomerAgent, Role};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::assignment::CustomerAgentView;
use crate::services::{self, AssignmentService};
use crate::AppState;

use super::caller_agent;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub id: Uuid,
    pub is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Uuid,
}

/// GET - list assignments; SUPERVISOR rows carry a can_remove flag
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<CustomerAgentView>> {
    require_staff(user.role)?;

    let viewer = if user.role == Role::Supervisor {
        Some(caller_agent(&state.pool, &user).await?.id)
    } else {
        None
    };

    let service = AssignmentService::new(state.pool.clone());
    let assignments = service.list_customer_agents(viewer).await?;
    Ok(ApiResponse::success(assignments))
}

/// POST - create an assignment; supervisors may only assign their own agents
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateRequest>,
) -> ApiResult<CustomerAgent> {
    require_staff(user.role)?;

    if user.role == Role::Supervisor {
        let me = caller_agent(&state.pool, &user).await?;
        let target = services::agent_by_id(&state.pool, payload.agent_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Agent not found"))?;
        if !supervisor_supervises(me.id, target.supervisor_id) {
            return Err(ApiError::forbidden(
                "You can only assign agents that are under your supervision",
            ));
        }
    }

    let service = AssignmentService::new(state.pool.clone());
    let assignment = service
        .create_customer_agent(payload.customer_id, payload.agent_id, payload.is_primary)
        .await?;
    Ok(ApiResponse::created(assignment))
}

/// PUT - change the primary flag; supervisors only for supervised agents
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateRequest>,
) -> ApiResult<CustomerAgent> {
    require_staff(user.role)?;

    let service = AssignmentService::new(state.pool.clone());
    let existing = service
        .get_customer_agent(payload.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment not found"))?;

    if user.role == Role::Supervisor {
        let me = caller_agent(&state.pool, &user).await?;
        if !supervisor_supervises(me.id, existing.supervisor_id) {
            return Err(ApiError::forbidden(
                "You can only update assignments for agents under your supervision",
            ));
        }
    }

    let updated = service.update_customer_agent(payload.id, payload.is_primary).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE ?id= - remove an assignment; supervisors for supervised agents or themselves
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    require_staff(user.role)?;

    let service = AssignmentService::new(state.pool.clone());
    let existing = service
        .get_customer_agent(query.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment not found"))?;

    if user.role == Role::Supervisor {
        let me = caller_agent(&state.pool, &user).await?;
        if !supervisor_may_manage(me.id, existing.agent_id, existing.supervisor_id) {
            return Err(ApiError::forbidden(
                "You can only delete assignments for yourself or agents under your supervision",
            ));
        }
    }

    service.delete_customer_agent(query.id).await?;
    Ok(ApiResponse::success(json!({ "message": "Assignment deleted successfully" })))
}
