// /api/administration/customer-policies - held-policy listing for staff views
use axum::extract::State;
use axum::Extension;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::authz::require_staff;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct CustomerPolicyRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub insurance_policy_id: Uuid,
    pub policy_holder_id: String,
    pub first_name: String,
    pub last_name: String,
    pub policy_name: String,
    pub type_of_policy: String,
}

/// GET - every customer policy with customer and product detail
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_staff(user.role)?;

    let rows = sqlx::query_as::<_, CustomerPolicyRow>(
        r#"
        SELECT cp.id, cp.customer_id, cp.insurance_policy_id,
               c.policy_holder_id, c.first_name, c.last_name,
               ip.name AS policy_name, ip.type_of_policy
        FROM customer_policies cp
        JOIN customers c ON c.id = cp.customer_id
        JOIN insurance_policies ip ON ip.id = cp.insurance_policy_id
        ORDER BY c.last_name, c.first_name, ip.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(json!({ "customer_policies": rows })))
}
