//! Assignment consistency logic for customer-agent and policy-agent relations.
//!
//! Every write runs inside a single transaction so the single-primary
//! invariant cannot be observed half-applied: clearing the previous primary,
//! inserting or updating the row, and moving the customer's primary pointer
//! either all commit or all roll back.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::authz::supervisor_may_manage;
use crate::database::models::{CustomerAgent, CustomerPolicyAgent};

use super::ServiceError;

/// Customer fields exposed in assignment listings
#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub policy_holder_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Agent fields exposed in assignment listings
#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerAgentView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub is_primary: bool,
    pub customer: CustomerSummary,
    pub agent: AgentSummary,
    /// Present only for SUPERVISOR callers: whether they may remove this row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_remove: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PolicySummary {
    pub id: Uuid,
    pub insurance_policy_id: String,
    pub name: String,
    pub type_of_policy: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerPolicySummary {
    pub id: Uuid,
    pub policy: PolicySummary,
    pub customer: CustomerSummary,
}

#[derive(Debug, Serialize)]
pub struct PolicyAgentView {
    pub id: Uuid,
    pub customer_policy_id: Uuid,
    pub agent_id: Uuid,
    pub customer_policy: CustomerPolicySummary,
    pub agent: AgentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_remove: Option<bool>,
}

/// Customer-agent row joined with the agent's supervision edge, for guard checks
#[derive(Debug, FromRow)]
pub struct CustomerAgentWithAgent {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub is_primary: bool,
    pub supervisor_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
pub struct PolicyAgentWithAgent {
    pub id: Uuid,
    pub customer_policy_id: Uuid,
    pub agent_id: Uuid,
    pub supervisor_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct CustomerAgentRow {
    id: Uuid,
    customer_id: Uuid,
    agent_id: Uuid,
    is_primary: bool,
    policy_holder_id: String,
    first_name: String,
    last_name: String,
    customer_email: String,
    agent_name: String,
    agent_email: String,
    supervisor_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct PolicyAgentRow {
    id: Uuid,
    customer_policy_id: Uuid,
    agent_id: Uuid,
    policy_id: Uuid,
    insurance_policy_id: String,
    policy_name: String,
    type_of_policy: String,
    customer_id: Uuid,
    policy_holder_id: String,
    first_name: String,
    last_name: String,
    customer_email: String,
    agent_name: String,
    agent_email: String,
    supervisor_id: Option<Uuid>,
}

pub struct AssignmentService {
    pool: PgPool,
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List customer-agent assignments with nested customer/agent detail.
    /// When `viewer_agent_id` is set (SUPERVISOR callers), each row carries a
    /// `can_remove` flag computed from the ownership rule.
    pub async fn list_customer_agents(
        &self,
        viewer_agent_id: Option<Uuid>,
    ) -> Result<Vec<CustomerAgentView>, ServiceError> {
        let rows = sqlx::query_as::<_, CustomerAgentRow>(
            r#"
            SELECT ca.id, ca.customer_id, ca.agent_id, ca.is_primary,
                   c.policy_holder_id, c.first_name, c.last_name, c.email AS customer_email,
                   u.name AS agent_name, u.email AS agent_email, a.supervisor_id
            FROM customer_agents ca
            JOIN customers c ON c.id = ca.customer_id
            JOIN agents a ON a.id = ca.agent_id
            JOIN users u ON u.id = a.user_id
            ORDER BY c.policy_holder_id, u.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CustomerAgentView {
                id: r.id,
                customer_id: r.customer_id,
                agent_id: r.agent_id,
                is_primary: r.is_primary,
                customer: CustomerSummary {
                    id: r.customer_id,
                    policy_holder_id: r.policy_holder_id,
                    first_name: r.first_name,
                    last_name: r.last_name,
                    email: r.customer_email,
                },
                agent: AgentSummary {
                    id: r.agent_id,
                    supervisor_id: r.supervisor_id,
                    name: r.agent_name,
                    email: r.agent_email,
                },
                can_remove: viewer_agent_id
                    .map(|v| supervisor_may_manage(v, r.agent_id, r.supervisor_id)),
            })
            .collect())
    }

    /// Fetch one assignment joined with the agent's supervision edge
    pub async fn get_customer_agent(
        &self,
        id: Uuid,
    ) -> Result<Option<CustomerAgentWithAgent>, ServiceError> {
        let row = sqlx::query_as::<_, CustomerAgentWithAgent>(
            r#"
            SELECT ca.id, ca.customer_id, ca.agent_id, ca.is_primary, a.supervisor_id
            FROM customer_agents ca
            JOIN agents a ON a.id = ca.agent_id
            WHERE ca.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create a customer-agent assignment, atomically reassigning the primary
    /// designation when `is_primary` is requested.
    pub async fn create_customer_agent(
        &self,
        customer_id: Uuid,
        agent_id: Uuid,
        is_primary: bool,
    ) -> Result<CustomerAgent, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let customer: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM customers WHERE id = $1")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if customer.is_none() {
            return Err(ServiceError::NotFound("Customer not found".into()));
        }

        let agent: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM agents WHERE id = $1")
            .bind(agent_id)
            .fetch_optional(&mut *tx)
            .await?;
        if agent.is_none() {
            return Err(ServiceError::NotFound("Agent not found".into()));
        }

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM customer_agents WHERE customer_id = $1 AND agent_id = $2",
        )
        .bind(customer_id)
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "This agent is already assigned to this customer".into(),
            ));
        }

        if is_primary {
            sqlx::query(
                "UPDATE customer_agents SET is_primary = false WHERE customer_id = $1 AND is_primary",
            )
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;
        }

        let assignment = sqlx::query_as::<_, CustomerAgent>(
            r#"
            INSERT INTO customer_agents (customer_id, agent_id, is_primary)
            VALUES ($1, $2, $3)
            RETURNING id, customer_id, agent_id, is_primary
            "#,
        )
        .bind(customer_id)
        .bind(agent_id)
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await?;

        if is_primary {
            sqlx::query("UPDATE customers SET primary_agent_relation_id = $1 WHERE id = $2")
                .bind(assignment.id)
                .bind(customer_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(assignment)
    }

    /// Change the primary flag on an existing assignment with the same
    /// clear-then-set semantics, scoped to the assignment's customer.
    pub async fn update_customer_agent(
        &self,
        id: Uuid,
        is_primary: bool,
    ) -> Result<CustomerAgent, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, CustomerAgent>(
            "SELECT id, customer_id, agent_id, is_primary FROM customer_agents WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Assignment not found".into()))?;

        if is_primary {
            sqlx::query(
                "UPDATE customer_agents SET is_primary = false \
                 WHERE customer_id = $1 AND is_primary AND id <> $2",
            )
            .bind(existing.customer_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE customers SET primary_agent_relation_id = $1 WHERE id = $2")
                .bind(id)
                .bind(existing.customer_id)
                .execute(&mut *tx)
                .await?;
        } else if existing.is_primary {
            // Demoting the current primary leaves the customer without one
            sqlx::query(
                "UPDATE customers SET primary_agent_relation_id = NULL \
                 WHERE id = $1 AND primary_agent_relation_id = $2",
            )
            .bind(existing.customer_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, CustomerAgent>(
            r#"
            UPDATE customer_agents SET is_primary = $2 WHERE id = $1
            RETURNING id, customer_id, agent_id, is_primary
            "#,
        )
        .bind(id)
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete an assignment. If the row was primary the customer's pointer is
    /// cleared; no other assignment is auto-promoted.
    pub async fn delete_customer_agent(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, CustomerAgent>(
            "SELECT id, customer_id, agent_id, is_primary FROM customer_agents WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Assignment not found".into()))?;

        if existing.is_primary {
            sqlx::query("UPDATE customers SET primary_agent_relation_id = NULL WHERE id = $1")
                .bind(existing.customer_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM customer_agents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// List policy-agent assignments with nested policy/customer/agent detail
    pub async fn list_policy_agents(
        &self,
        viewer_agent_id: Option<Uuid>,
    ) -> Result<Vec<PolicyAgentView>, ServiceError> {
        let rows = sqlx::query_as::<_, PolicyAgentRow>(
            r#"
            SELECT cpa.id, cpa.customer_policy_id, cpa.agent_id,
                   ip.id AS policy_id, ip.insurance_policy_id, ip.name AS policy_name,
                   ip.type_of_policy,
                   c.id AS customer_id, c.policy_holder_id, c.first_name, c.last_name,
                   c.email AS customer_email,
                   u.name AS agent_name, u.email AS agent_email, a.supervisor_id
            FROM customer_policy_agents cpa
            JOIN customer_policies cp ON cp.id = cpa.customer_policy_id
            JOIN insurance_policies ip ON ip.id = cp.insurance_policy_id
            JOIN customers c ON c.id = cp.customer_id
            JOIN agents a ON a.id = cpa.agent_id
            JOIN users u ON u.id = a.user_id
            ORDER BY c.policy_holder_id, ip.insurance_policy_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PolicyAgentView {
                id: r.id,
                customer_policy_id: r.customer_policy_id,
                agent_id: r.agent_id,
                customer_policy: CustomerPolicySummary {
                    id: r.customer_policy_id,
                    policy: PolicySummary {
                        id: r.policy_id,
                        insurance_policy_id: r.insurance_policy_id,
                        name: r.policy_name,
                        type_of_policy: r.type_of_policy,
                    },
                    customer: CustomerSummary {
                        id: r.customer_id,
                        policy_holder_id: r.policy_holder_id,
                        first_name: r.first_name,
                        last_name: r.last_name,
                        email: r.customer_email,
                    },
                },
                agent: AgentSummary {
                    id: r.agent_id,
                    supervisor_id: r.supervisor_id,
                    name: r.agent_name,
                    email: r.agent_email,
                },
                can_remove: viewer_agent_id
                    .map(|v| supervisor_may_manage(v, r.agent_id, r.supervisor_id)),
            })
            .collect())
    }

    pub async fn get_policy_agent(
        &self,
        id: Uuid,
    ) -> Result<Option<PolicyAgentWithAgent>, ServiceError> {
        let row = sqlx::query_as::<_, PolicyAgentWithAgent>(
            r#"
            SELECT cpa.id, cpa.customer_policy_id, cpa.agent_id, a.supervisor_id
            FROM customer_policy_agents cpa
            JOIN agents a ON a.id = cpa.agent_id
            WHERE cpa.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Assign an agent to a customer policy. As a side effect, ensure a
    /// customer-agent relation exists for the underlying customer, created as
    /// primary only when the customer has no primary agent yet.
    pub async fn create_policy_agent(
        &self,
        customer_policy_id: Uuid,
        agent_id: Uuid,
    ) -> Result<CustomerPolicyAgent, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let customer_policy: Option<(Uuid, Uuid)> =
            sqlx::query_as("SELECT id, customer_id FROM customer_policies WHERE id = $1")
                .bind(customer_policy_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (_, customer_id) = customer_policy
            .ok_or_else(|| ServiceError::NotFound("Customer Policy not found".into()))?;

        let agent: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM agents WHERE id = $1")
            .bind(agent_id)
            .fetch_optional(&mut *tx)
            .await?;
        if agent.is_none() {
            return Err(ServiceError::NotFound("Agent not found".into()));
        }

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM customer_policy_agents WHERE customer_policy_id = $1 AND agent_id = $2",
        )
        .bind(customer_policy_id)
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "This agent is already assigned to this policy".into(),
            ));
        }

        let assignment = sqlx::query_as::<_, CustomerPolicyAgent>(
            r#"
            INSERT INTO customer_policy_agents (customer_policy_id, agent_id)
            VALUES ($1, $2)
            RETURNING id, customer_policy_id, agent_id
            "#,
        )
        .bind(customer_policy_id)
        .bind(agent_id)
        .fetch_one(&mut *tx)
        .await?;

        // Implicit customer-agent relation for the underlying customer
        let pair: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM customer_agents WHERE customer_id = $1 AND agent_id = $2",
        )
        .bind(customer_id)
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?;

        if pair.is_none() {
            let (has_primary,): (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM customer_agents WHERE customer_id = $1 AND is_primary)",
            )
            .bind(customer_id)
            .fetch_one(&mut *tx)
            .await?;

            let is_primary = !has_primary;
            let relation = sqlx::query_as::<_, CustomerAgent>(
                r#"
                INSERT INTO customer_agents (customer_id, agent_id, is_primary)
                VALUES ($1, $2, $3)
                RETURNING id, customer_id, agent_id, is_primary
                "#,
            )
            .bind(customer_id)
            .bind(agent_id)
            .bind(is_primary)
            .fetch_one(&mut *tx)
            .await?;

            if is_primary {
                sqlx::query("UPDATE customers SET primary_agent_relation_id = $1 WHERE id = $2")
                    .bind(relation.id)
                    .bind(customer_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(assignment)
    }

    pub async fn delete_policy_agent(&self, id: Uuid) -> Result<(), ServiceError> {
        let deleted = sqlx::query("DELETE FROM customer_policy_agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Assignment not found".into()));
        }
        Ok(())
    }

    /// Create a policy holder together with their policy assignments. When a
    /// creating agent is given, they become the customer's primary agent.
    pub async fn create_customer_with_policies(
        &self,
        policy_holder_id: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        policy_ids: &[Uuid],
        creator_agent_id: Option<Uuid>,
    ) -> Result<crate::database::models::Customer, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM customers WHERE policy_holder_id = $1")
                .bind(policy_holder_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("Policy Holder ID already exists".into()));
        }

        for policy_id in policy_ids {
            let found: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM insurance_policies WHERE id = $1")
                    .bind(policy_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if found.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "Insurance policy {} not found",
                    policy_id
                )));
            }
        }

        let mut customer = sqlx::query_as::<_, crate::database::models::Customer>(
            r#"
            INSERT INTO customers (policy_holder_id, first_name, last_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, policy_holder_id, first_name, last_name, email,
                      primary_agent_relation_id
            "#,
        )
        .bind(policy_holder_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&mut *tx)
        .await?;

        for policy_id in policy_ids {
            sqlx::query(
                "INSERT INTO customer_policies (customer_id, insurance_policy_id) VALUES ($1, $2)",
            )
            .bind(customer.id)
            .bind(policy_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(agent_id) = creator_agent_id {
            let relation = sqlx::query_as::<_, CustomerAgent>(
                r#"
                INSERT INTO customer_agents (customer_id, agent_id, is_primary)
                VALUES ($1, $2, true)
                RETURNING id, customer_id, agent_id, is_primary
                "#,
            )
            .bind(customer.id)
            .bind(agent_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("UPDATE customers SET primary_agent_relation_id = $1 WHERE id = $2")
                .bind(relation.id)
                .bind(customer.id)
                .execute(&mut *tx)
                .await?;
            customer.primary_agent_relation_id = Some(relation.id);
        }

        tx.commit().await?;
        Ok(customer)
    }
}
