// /api/policyholders - customer records with their held policies
use axum::extract::State;
use axum::response::Json;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{Customer, Role};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{self, AssignmentService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePolicyHolderRequest {
    pub policy_holder_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub policy_ids: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    policy_holder_id: String,
    first_name: String,
    last_name: String,
    email: String,
    primary_agent_relation_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct HeldPolicyRow {
    customer_id: Uuid,
    name: String,
}

#[derive(Debug, Serialize)]
pub struct PolicyHolder {
    pub id: Uuid,
    pub policy_holder_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub primary_agent_relation_id: Option<Uuid>,
    pub policies_held: Vec<String>,
}

/// GET - ADMIN and SUPERVISOR see every customer; AGENT sees only customers
/// they are assigned to; USER is rejected.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let customers = match user.role {
        Role::Admin | Role::Supervisor => {
            sqlx::query_as::<_, CustomerRow>(
                r#"
                SELECT id, policy_holder_id, first_name, last_name, email,
                       primary_agent_relation_id
                FROM customers
                ORDER BY policy_holder_id
                "#,
            )
            .fetch_all(&state.pool)
            .await?
        }
        Role::Agent => {
            let agent = services::agent_for_user(&state.pool, user.user_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Agent record not found"))?;
            sqlx::query_as::<_, CustomerRow>(
                r#"
                SELECT c.id, c.policy_holder_id, c.first_name, c.last_name, c.email,
                       c.primary_agent_relation_id
                FROM customers c
                JOIN customer_agents ca ON ca.customer_id = c.id
                WHERE ca.agent_id = $1
                ORDER BY c.policy_holder_id
                "#,
            )
            .bind(agent.id)
            .fetch_all(&state.pool)
            .await?
        }
        Role::User => {
            return Err(ApiError::forbidden("You do not have access to policy holders"));
        }
    };

    let held = sqlx::query_as::<_, HeldPolicyRow>(
        r#"
        SELECT cp.customer_id, ip.name
        FROM customer_policies cp
        JOIN insurance_policies ip ON ip.id = cp.insurance_policy_id
        ORDER BY ip.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let mut by_customer: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in held {
        by_customer.entry(row.customer_id).or_default().push(row.name);
    }

    let holders: Vec<PolicyHolder> = customers
        .into_iter()
        .map(|c| PolicyHolder {
            policies_held: by_customer.remove(&c.id).unwrap_or_default(),
            id: c.id,
            policy_holder_id: c.policy_holder_id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            primary_agent_relation_id: c.primary_agent_relation_id,
        })
        .collect();

    Ok(ApiResponse::success(json!({ "policy_holders": holders })))
}

/// POST - create a customer with their policy assignments. When the caller is
/// an AGENT they become the customer's primary agent.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreatePolicyHolderRequest>,
) -> ApiResult<Customer> {
    if user.role == Role::User {
        return Err(ApiError::forbidden("You do not have access to policy holders"));
    }

    let mut field_errors = HashMap::new();
    if payload.policy_holder_id.trim().is_empty() {
        field_errors
            .insert("policy_holder_id".to_string(), "Policy Holder ID is required".to_string());
    }
    if payload.first_name.trim().is_empty() {
        field_errors.insert("first_name".to_string(), "First name is required".to_string());
    }
    if payload.last_name.trim().is_empty() {
        field_errors.insert("last_name".to_string(), "Last name is required".to_string());
    }
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        field_errors.insert("email".to_string(), "A valid email is required".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Invalid policy holder data", Some(field_errors)));
    }

    let creator_agent_id = if user.role == Role::Agent {
        Some(
            services::agent_for_user(&state.pool, user.user_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Agent record not found"))?
                .id,
        )
    } else {
        None
    };

    let service = AssignmentService::new(state.pool.clone());
    let customer = service
        .create_customer_with_policies(
            payload.policy_holder_id.trim(),
            payload.first_name.trim(),
            payload.last_name.trim(),
            payload.email.trim(),
            &payload.policy_ids,
            creator_agent_id,
        )
        .await?;

    Ok(ApiResponse::created(customer))
}
