use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Agent record. One-to-one with a user holding the AGENT or SUPERVISOR role;
/// `supervisor_id` is a self-referential edge to the supervising agent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supervisor_id: Option<Uuid>,
}
