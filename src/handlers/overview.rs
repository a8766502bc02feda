// /api/overview - dashboard aggregates
use axum::extract::State;
use axum::Extension;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::FromRow;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct PolicyChartRow {
    pub name: String,
    pub holders: i64,
}

/// GET - customer count, product count, total base value and a per-policy
/// holder breakdown for the dashboard chart
pub async fn get(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let (total_customers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
        .fetch_one(&state.pool)
        .await?;

    let (total_policies,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM insurance_policies")
        .fetch_one(&state.pool)
        .await?;

    let (total_base_value,): (f64,) =
        sqlx::query_as("SELECT COALESCE(SUM(base_price_sgd), 0) FROM insurance_policies")
            .fetch_one(&state.pool)
            .await?;

    let chart = sqlx::query_as::<_, PolicyChartRow>(
        r#"
        SELECT ip.name, COUNT(cp.id) AS holders
        FROM insurance_policies ip
        LEFT JOIN customer_policies cp ON cp.insurance_policy_id = ip.id
        GROUP BY ip.id, ip.name
        ORDER BY ip.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(json!({
        "total_customers": total_customers,
        "total_policies": total_policies,
        "total_base_value_sgd": total_base_value,
        "policy_chart": chart
    })))
}
