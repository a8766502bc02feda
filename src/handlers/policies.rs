// /api/policies - insurance policy product catalog
use axum::extract::State;
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::models::InsurancePolicy;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePolicyRequest {
    pub insurance_policy_id: String,
    pub name: String,
    pub base_price_sgd: f64,
    pub type_of_policy: String,
}

/// GET - catalog of policy products, visible to any authenticated user
pub async fn list(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let policies = sqlx::query_as::<_, InsurancePolicy>(
        r#"
        SELECT id, insurance_policy_id, name, base_price_sgd, type_of_policy
        FROM insurance_policies
        ORDER BY insurance_policy_id
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(json!({ "policies": policies })))
}

/// POST - add a policy product to the catalog
pub async fn create(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Json(payload): Json<CreatePolicyRequest>,
) -> ApiResult<InsurancePolicy> {
    let mut field_errors = HashMap::new();
    if payload.insurance_policy_id.trim().is_empty() {
        field_errors.insert("insurance_policy_id".to_string(), "Policy ID is required".to_string());
    }
    if payload.name.trim().is_empty() {
        field_errors.insert("name".to_string(), "Policy name is required".to_string());
    }
    if payload.type_of_policy.trim().is_empty() {
        field_errors.insert("type_of_policy".to_string(), "Policy type is required".to_string());
    }
    if !payload.base_price_sgd.is_finite() || payload.base_price_sgd < 0.0 {
        field_errors
            .insert("base_price_sgd".to_string(), "Base price must be non-negative".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Invalid policy data", Some(field_errors)));
    }

    let existing: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM insurance_policies WHERE insurance_policy_id = $1")
            .bind(payload.insurance_policy_id.trim())
            .fetch_optional(&state.pool)
            .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Policy ID already exists"));
    }

    let policy = sqlx::query_as::<_, InsurancePolicy>(
        r#"
        INSERT INTO insurance_policies (insurance_policy_id, name, base_price_sgd, type_of_policy)
        VALUES ($1, $2, $3, $4)
        RETURNING id, insurance_policy_id, name, base_price_sgd, type_of_policy
        "#,
    )
    .bind(payload.insurance_policy_id.trim())
    .bind(payload.name.trim())
    .bind(payload.base_price_sgd)
    .bind(payload.type_of_policy.trim())
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(policy))
}
