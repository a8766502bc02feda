//! Role transition logic: role changes with their side effects on the agent
//! graph, single supervisor wiring and batch supervisor reconciliation.

use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::database::models::{Agent, Role, User};

use super::ServiceError;

/// Result of a batch supervisor reconciliation
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub added: usize,
    pub removed: usize,
}

/// Compute the symmetric difference between the currently supervised set and
/// the requested set: (agents to gain the supervisor, agents to lose it).
/// Agents present in both sets are untouched.
pub fn batch_changes(current: &[Uuid], requested: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let requested_set: HashSet<Uuid> = requested.iter().copied().collect();

    let to_add = requested.iter().copied().filter(|id| !current_set.contains(id)).collect();
    let to_remove = current.iter().copied().filter(|id| !requested_set.contains(id)).collect();
    (to_add, to_remove)
}

pub struct RoleService {
    pool: PgPool,
}

impl RoleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Change a user's role and reconcile dependent agent state.
    ///
    /// Promotion into AGENT/SUPERVISOR creates the agent record if absent.
    /// Demotion out of SUPERVISOR clears every supervisee's supervisor link in
    /// the same transaction as the role update. The agent record itself is
    /// kept on demotion so historical assignments stay resolvable.
    pub async fn change_role(&self, user_id: Uuid, new_role: Role) -> Result<User, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;

        let agent = sqlx::query_as::<_, Agent>(
            "SELECT id, user_id, supervisor_id FROM agents WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if user.role == Role::Supervisor && new_role != Role::Supervisor {
            if let Some(ref agent) = agent {
                sqlx::query("UPDATE agents SET supervisor_id = NULL WHERE supervisor_id = $1")
                    .bind(agent.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if new_role.is_agent_like() && agent.is_none() {
            sqlx::query("INSERT INTO agents (user_id) VALUES ($1)")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $2, updated_at = now() WHERE id = $1
            RETURNING id, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(new_role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Set or clear one agent's supervisor. When setting, the target must be
    /// an agent record whose user holds the SUPERVISOR role.
    pub async fn set_supervisor(
        &self,
        agent_id: Uuid,
        supervisor_id: Option<Uuid>,
    ) -> Result<Agent, ServiceError> {
        if let Some(supervisor_id) = supervisor_id {
            let supervisor: Option<(Role,)> = sqlx::query_as(
                "SELECT u.role FROM agents a JOIN users u ON u.id = a.user_id WHERE a.id = $1",
            )
            .bind(supervisor_id)
            .fetch_optional(&self.pool)
            .await?;

            match supervisor {
                None => return Err(ServiceError::NotFound("Supervisor not found".into())),
                Some((role,)) if role != Role::Supervisor => {
                    return Err(ServiceError::Validation(
                        "Assigned supervisor must hold the SUPERVISOR role".into(),
                    ))
                }
                _ => {}
            }
        }

        sqlx::query_as::<_, Agent>(
            r#"
            UPDATE agents SET supervisor_id = $2 WHERE id = $1
            RETURNING id, user_id, supervisor_id
            "#,
        )
        .bind(agent_id)
        .bind(supervisor_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Agent not found".into()))
    }

    /// Reconcile one supervisor's agent set against a target set of agent ids
    pub async fn batch_assign(
        &self,
        supervisor_id: Uuid,
        agent_ids: &[Uuid],
    ) -> Result<BatchOutcome, ServiceError> {
        let supervisor: Option<(Role,)> = sqlx::query_as(
            "SELECT u.role FROM agents a JOIN users u ON u.id = a.user_id WHERE a.id = $1",
        )
        .bind(supervisor_id)
        .fetch_optional(&self.pool)
        .await?;

        match supervisor {
            Some((Role::Supervisor,)) => {}
            _ => {
                return Err(ServiceError::NotFound(
                    "Supervisor not found or user is not a supervisor".into(),
                ))
            }
        }

        // Read the current set inside the transaction so the diff and the
        // updates see one consistent snapshot
        let mut tx = self.pool.begin().await?;

        let current: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM agents WHERE supervisor_id = $1 FOR UPDATE")
                .bind(supervisor_id)
                .fetch_all(&mut *tx)
                .await?;
        let current_ids: Vec<Uuid> = current.into_iter().map(|(id,)| id).collect();

        let (to_add, to_remove) = batch_changes(&current_ids, agent_ids);

        // Counts come from rows_affected: unknown ids and non-AGENT users are
        // filtered by the UPDATE and must not be reported as applied
        let mut added = 0;
        if !to_add.is_empty() {
            added = sqlx::query(
                "UPDATE agents SET supervisor_id = $1 \
                 WHERE id = ANY($2) \
                 AND user_id IN (SELECT id FROM users WHERE role = 'AGENT')",
            )
            .bind(supervisor_id)
            .bind(&to_add)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        let mut removed = 0;
        if !to_remove.is_empty() {
            removed = sqlx::query("UPDATE agents SET supervisor_id = NULL WHERE id = ANY($1)")
                .bind(&to_remove)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(BatchOutcome { added: added as usize, removed: removed as usize })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_changes_computes_symmetric_difference() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        // Requesting {A, B} against current {B, C}: add A, keep B, remove C
        let (to_add, to_remove) = batch_changes(&[b, c], &[a, b]);
        assert_eq!(to_add, vec![a]);
        assert_eq!(to_remove, vec![c]);
    }

    #[test]
    fn batch_changes_empty_request_removes_all() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (to_add, to_remove) = batch_changes(&[a, b], &[]);
        assert!(to_add.is_empty());
        assert_eq!(to_remove, vec![a, b]);
    }

    #[test]
    fn batch_changes_identical_sets_touch_nothing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (to_add, to_remove) = batch_changes(&[a, b], &[b, a]);
        assert!(to_add.is_empty());
        assert!(to_remove.is_empty());
    }

    #[test]
    fn batch_changes_from_empty_adds_all() {
        let a = Uuid::new_v4();
        let (to_add, to_remove) = batch_changes(&[], &[a]);
        assert_eq!(to_add, vec![a]);
        assert!(to_remove.is_empty());
    }
}
