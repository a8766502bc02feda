// /api/administration/policy-agents - manage customer-policy-agent assignments
use axum::extract::{Query, State};
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz::{require_staff, supervisor_may_manage, supervisor_supervises};
use crate::database::models::{CustomerPolicyAgent, Role};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::assignment::PolicyAgentView;
use crate::services::{self, AssignmentService};
use crate::AppState;

use super::caller_agent;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub customer_policy_id: Uuid,
    pub agent_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Uuid,
}

/// GET - list policy-agent assignments with nested policy/customer/agent detail
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<PolicyAgentView>> {
    require_staff(user.role)?;

    let viewer = if user.role == Role::Supervisor {
        Some(caller_agent(&state.pool, &user).await?.id)
    } else {
        None
    };

    let service = AssignmentService::new(state.pool.clone());
    let assignments = service.list_policy_agents(viewer).await?;
    Ok(ApiResponse::success(assignments))
}

/// POST - assign an agent to a customer policy. Creates the customer-agent
/// relation as a side effect when none exists yet.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateRequest>,
) -> ApiResult<CustomerPolicyAgent> {
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
    let assignment =
        service.create_policy_agent(payload.customer_policy_id, payload.agent_id).await?;
    Ok(ApiResponse::created(assignment))
}

/// DELETE ?id= - remove a policy-agent assignment
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    require_staff(user.role)?;

    let service = AssignmentService::new(state.pool.clone());
    let existing = service
        .get_policy_agent(query.id)
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

    service.delete_policy_agent(query.id).await?;
    Ok(ApiResponse::success(json!({ "message": "Policy agent assignment deleted successfully" })))
}
