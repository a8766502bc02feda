//! Assignment and role-transition behavior against a live database.
//!
//! Every test skips itself when /health reports the database down, so the
//! suite stays green on machines without a migrated Postgres.

mod common;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use insurance_admin_api::auth::{generate_jwt, Claims};
use insurance_admin_api::database::models::Role;

/// Authenticated client. The admin token is minted directly with the same
/// secret the server resolves from its config, so no seed admin is needed.
struct Api {
    client: Client,
    base: String,
    token: String,
}

impl Api {
    fn new(base: &str) -> Self {
        let claims = Claims::new(Uuid::new_v4(), "admin@tests.local".to_string(), Role::Admin);
        let token = generate_jwt(&claims).expect("admin token");
        Self { client: Client::new(), base: base.to_string(), token }
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .get(format!("{}{}", self.base, path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(format!("{}{}", self.base, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .put(format!("{}{}", self.base, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .delete(format!("{}{}", self.base, path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }
}

/// Register a user and return its id and email
async fn register_user(api: &Api, tag: &str) -> Result<(String, String)> {
    let email = format!("user-{}@tests.local", tag);
    let (status, body) = api
        .post(
            "/auth/register",
            json!({
                "name": format!("Test User {}", tag),
                "email": email,
                "password": "correct-horse-battery"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    let id = body["data"]["user"]["id"].as_str().context("user id")?.to_string();
    Ok((id, email))
}

async fn set_role(api: &Api, user_id: &str, role: &str) -> Result<()> {
    let (status, body) = api
        .post(
            "/api/administration/users/management",
            json!({ "user_id": user_id, "new_role": role }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "role change failed: {}", body);
    Ok(())
}

/// Resolve the agent id backing a user, via the role-filtered user listing
async fn agent_id_for(api: &Api, email: &str, role: &str) -> Result<String> {
    let (status, body) = api.get(&format!("/api/administration/users?role={}", role)).await?;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"]["users"].as_array().context("users array")?;
    let user = users.iter().find(|u| u["email"] == email).context("user missing from listing")?;
    Ok(user["agent_id"].as_str().context("agent_id")?.to_string())
}

/// Register a user, give them the AGENT role and return their agent id
async fn create_agent(api: &Api, tag: &str) -> Result<(String, String)> {
    let (user_id, email) = register_user(api, tag).await?;
    set_role(api, &user_id, "AGENT").await?;
    let agent_id = agent_id_for(api, &email, "AGENT").await?;
    Ok((user_id, agent_id))
}

async fn create_customer(api: &Api, tag: &str, policy_ids: &[&str]) -> Result<(String, String)> {
    let holder_id = format!("PH-{}", tag);
    let (status, body) = api
        .post(
            "/api/policyholders",
            json!({
                "policy_holder_id": holder_id,
                "first_name": "Pat",
                "last_name": format!("Holder-{}", tag),
                "email": format!("holder-{}@tests.local", tag),
                "policy_ids": policy_ids
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "customer creation failed: {}", body);
    let id = body["data"]["id"].as_str().context("customer id")?.to_string();
    Ok((id, holder_id))
}

/// Fetch one customer's pointer from the policyholder listing
async fn primary_pointer(api: &Api, holder_id: &str) -> Result<Value> {
    let (status, body) = api.get("/api/policyholders").await?;
    assert_eq!(status, StatusCode::OK);
    let holders = body["data"]["policy_holders"].as_array().context("holders")?;
    let holder = holders
        .iter()
        .find(|h| h["policy_holder_id"] == holder_id)
        .context("customer missing from listing")?;
    Ok(holder["primary_agent_relation_id"].clone())
}

/// All customer-agent rows for one customer
async fn customer_rows(api: &Api, customer_id: &str) -> Result<Vec<Value>> {
    let (status, body) = api.get("/api/administration/customer-agents").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["data"]
        .as_array()
        .context("assignments array")?
        .iter()
        .filter(|r| r["customer_id"] == customer_id)
        .cloned()
        .collect())
}

#[tokio::test]
async fn creating_second_primary_displaces_first() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (customer_id, holder_id) = create_customer(&api, &tag, &[]).await?;
    let (_, agent_a) = create_agent(&api, &format!("{}-a", tag)).await?;
    let (_, agent_b) = create_agent(&api, &format!("{}-b", tag)).await?;

    let (status, _) = api
        .post(
            "/api/administration/customer-agents",
            json!({ "customer_id": customer_id, "agent_id": agent_a, "is_primary": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = api
        .post(
            "/api/administration/customer-agents",
            json!({ "customer_id": customer_id, "agent_id": agent_b, "is_primary": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let second_rel = body["data"]["id"].as_str().context("assignment id")?.to_string();

    // Exactly one primary row survives, and it is the newer assignment
    let rows = customer_rows(&api, &customer_id).await?;
    assert_eq!(rows.len(), 2);
    let primaries: Vec<&Value> =
        rows.iter().filter(|r| r["is_primary"] == true).collect();
    assert_eq!(primaries.len(), 1, "expected exactly one primary: {:?}", rows);
    assert_eq!(primaries[0]["id"], second_rel.as_str());

    // The customer's pointer follows the primary row
    assert_eq!(primary_pointer(&api, &holder_id).await?, json!(second_rel));
    Ok(())
}

#[tokio::test]
async fn demoting_the_primary_clears_the_pointer() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (customer_id, holder_id) = create_customer(&api, &tag, &[]).await?;
    let (_, agent) = create_agent(&api, &tag).await?;

    let (status, body) = api
        .post(
            "/api/administration/customer-agents",
            json!({ "customer_id": customer_id, "agent_id": agent, "is_primary": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let rel = body["data"]["id"].as_str().context("assignment id")?.to_string();
    assert_eq!(primary_pointer(&api, &holder_id).await?, json!(rel));

    let (status, body) = api
        .put(
            "/api/administration/customer-agents",
            json!({ "id": rel, "is_primary": false }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_primary"], false);

    // No auto-promotion: the customer is left without a primary agent
    assert_eq!(primary_pointer(&api, &holder_id).await?, Value::Null);
    let rows = customer_rows(&api, &customer_id).await?;
    assert!(rows.iter().all(|r| r["is_primary"] == false), "{:?}", rows);
    Ok(())
}

#[tokio::test]
async fn deleting_the_primary_clears_the_pointer() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (customer_id, holder_id) = create_customer(&api, &tag, &[]).await?;
    let (_, agent) = create_agent(&api, &tag).await?;

    let (status, body) = api
        .post(
            "/api/administration/customer-agents",
            json!({ "customer_id": customer_id, "agent_id": agent, "is_primary": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let rel = body["data"]["id"].as_str().context("assignment id")?.to_string();

    let (status, _) =
        api.delete(&format!("/api/administration/customer-agents?id={}", rel)).await?;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(primary_pointer(&api, &holder_id).await?, Value::Null);
    assert!(customer_rows(&api, &customer_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn policy_agent_creation_backfills_customer_relation() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (status, body) = api
        .post(
            "/api/policies",
            json!({
                "insurance_policy_id": format!("POL-{}", tag),
                "name": format!("Term Life {}", tag),
                "base_price_sgd": 120.5,
                "type_of_policy": "Life"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let policy_id = body["data"]["id"].as_str().context("policy id")?.to_string();

    // Created by an admin, so the customer starts with no agent at all
    let (customer_id, holder_id) = create_customer(&api, &tag, &[policy_id.as_str()]).await?;

    let (status, body) = api.get("/api/administration/customer-policies").await?;
    assert_eq!(status, StatusCode::OK);
    let customer_policy_id = body["data"]["customer_policies"]
        .as_array()
        .context("customer policies")?
        .iter()
        .find(|cp| cp["customer_id"] == customer_id)
        .context("customer policy missing")?["id"]
        .as_str()
        .context("id")?
        .to_string();

    let (_, agent_a) = create_agent(&api, &format!("{}-a", tag)).await?;
    let (status, _) = api
        .post(
            "/api/administration/policy-agents",
            json!({ "customer_policy_id": customer_policy_id, "agent_id": agent_a }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    // First agent on the policy becomes the customer's primary
    let rows = customer_rows(&api, &customer_id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["agent_id"], agent_a.as_str());
    assert_eq!(rows[0]["is_primary"], true);
    assert_eq!(primary_pointer(&api, &holder_id).await?, rows[0]["id"]);

    // Second agent backfills a non-primary relation; the primary is untouched
    let (_, agent_b) = create_agent(&api, &format!("{}-b", tag)).await?;
    let (status, _) = api
        .post(
            "/api/administration/policy-agents",
            json!({ "customer_policy_id": customer_policy_id, "agent_id": agent_b }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let rows = customer_rows(&api, &customer_id).await?;
    assert_eq!(rows.len(), 2);
    let primaries: Vec<&Value> = rows.iter().filter(|r| r["is_primary"] == true).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["agent_id"], agent_a.as_str());
    Ok(())
}

#[tokio::test]
async fn supervisor_demotion_cascades_to_supervisees() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (sup_user, sup_email) = register_user(&api, &format!("{}-sup", tag)).await?;
    set_role(&api, &sup_user, "AGENT").await?;
    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": sup_user, "action": "promote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let sup_agent = agent_id_for(&api, &sup_email, "SUPERVISOR").await?;

    let (_, agent) = create_agent(&api, &format!("{}-sub", tag)).await?;
    let (status, body) = api
        .post(
            "/api/administration/supervisor-agent-assignment",
            json!({ "agent_id": agent, "supervisor_id": sup_agent }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["agent"]["supervisor_id"], sup_agent.as_str());

    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": sup_user, "action": "demote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    // The supervisee edge is gone in the same transaction as the demotion
    let (status, body) = api.get("/api/administration/supervisor-batch-assignment").await?;
    assert_eq!(status, StatusCode::OK);
    let supervisee = body["data"]["agents"]
        .as_array()
        .context("agents")?
        .iter()
        .find(|a| a["id"] == agent.as_str())
        .context("supervisee missing")?;
    assert_eq!(supervisee["supervisor_id"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn batch_assignment_reports_applied_counts() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (sup_user, sup_email) = register_user(&api, &format!("{}-sup", tag)).await?;
    set_role(&api, &sup_user, "AGENT").await?;
    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": sup_user, "action": "promote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let sup_agent = agent_id_for(&api, &sup_email, "SUPERVISOR").await?;

    let (_, agent) = create_agent(&api, &tag).await?;

    // An unknown id must not inflate the applied count
    let (status, body) = api
        .post(
            "/api/administration/supervisor-batch-assignment",
            json!({ "supervisor_id": sup_agent, "agent_ids": [agent, Uuid::new_v4()] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["added"], 1, "{}", body);
    assert_eq!(body["data"]["removed"], 0);

    let (status, body) = api
        .post(
            "/api/administration/supervisor-batch-assignment",
            json!({ "supervisor_id": sup_agent, "agent_ids": [] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["added"], 0);
    assert_eq!(body["data"]["removed"], 1);
    Ok(())
}

#[tokio::test]
async fn promote_and_demote_require_matching_current_role() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let api = Api::new(&server.base_url);
    let tag = Uuid::new_v4().simple().to_string();

    let (user_id, _) = register_user(&api, &tag).await?;

    // Plain USER: neither transition applies
    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": user_id, "action": "promote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": user_id, "action": "demote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // AGENT promotes; a second promote is rejected as already SUPERVISOR
    set_role(&api, &user_id, "AGENT").await?;
    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": user_id, "action": "promote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": user_id, "action": "promote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post(
            "/api/administration/supervisors",
            json!({ "user_id": user_id, "action": "demote" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
