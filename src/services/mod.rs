use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Agent;

pub mod assignment;
pub mod roles;

pub use assignment::AssignmentService;
pub use roles::RoleService;

/// Errors from the service layer, mapped to HTTP statuses in `error.rs`
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Look up the agent record backing a user, if any
pub async fn agent_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>(
        "SELECT id, user_id, supervisor_id FROM agents WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn agent_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>("SELECT id, user_id, supervisor_id FROM agents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
