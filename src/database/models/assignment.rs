use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Customer-to-agent assignment. At most one row per customer carries
/// `is_primary = true`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerAgent {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub is_primary: bool,
}

/// Agent assigned to service one specific customer policy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerPolicyAgent {
    pub id: Uuid,
    pub customer_policy_id: Uuid,
    pub agent_id: Uuid,
}
