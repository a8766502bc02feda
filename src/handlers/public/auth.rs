// POST /auth/register and POST /auth/login - credential authentication
use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register - Create a credential account with the default USER role
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Value> {
    let mut field_errors = HashMap::new();
    if payload.name.trim().is_empty() {
        field_errors.insert("name".to_string(), "This field is required".to_string());
    }
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        field_errors.insert("email".to_string(), "A valid email is required".to_string());
    }
    if payload.password.len() < 8 {
        field_errors
            .insert("password".to_string(), "Must be at least 8 characters".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Invalid fields", Some(field_errors)));
    }

    let existing: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&payload.email)
            .fetch_optional(&state.pool)
            .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email already exists"));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal_server_error("Failed to create user")
    })?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, name, email, password_hash, role, created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(json!({ "user": user })))
}

/// POST /auth/login - Verify credentials and return a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Value> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, role, created_at, updated_at
        FROM users WHERE email = $1
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await?;

    // One generic message for unknown email, provider-only account or bad
    // password, so credentials cannot be probed.
    let user = match user {
        Some(user) => user,
        None => return Err(ApiError::unauthorized("Invalid credentials")),
    };
    let valid = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(hash, &payload.password))
        .unwrap_or(false);
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::new(user.id, user.email.clone(), user.role);
    let expires_in = (claims.exp - claims.iat).max(0);
    let token = generate_jwt(&claims).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Failed to create session token")
    })?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "user": user,
        "expires_in": expires_in
    })))
}
