// GET /api/auth/whoami - identity of the authenticated caller
use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user_id": user.user_id,
        "email": user.email,
        "role": user.role,
    })))
}
