use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Insurance policy product
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsurancePolicy {
    pub id: Uuid,
    pub insurance_policy_id: String,
    pub name: String,
    pub base_price_sgd: f64,
    pub type_of_policy: String,
}

/// Assignment of a policy product to a customer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerPolicy {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub insurance_policy_id: Uuid,
}
