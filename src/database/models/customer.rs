use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Policy holder. `primary_agent_relation_id` points at the single
/// customer_agents row with is_primary = true, or is null.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub policy_holder_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub primary_agent_relation_id: Option<Uuid>,
}
