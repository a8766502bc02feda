use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::{extract::State, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use insurance_admin_api::middleware::jwt_auth_middleware;
use insurance_admin_api::{config, database, handlers, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting insurance admin API in {:?} mode", config.environment);

    let pool = match database::connect() {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to configure database pool: {}", e);
            std::process::exit(1);
        }
    };
    let state = AppState { pool: pool.clone() };

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("INSURANCE_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Insurance admin API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    database::close(&pool).await;
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        // Protected API
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_auth_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn api_routes() -> Router<AppState> {
    use handlers::administration as admin;

    Router::new()
        .route("/api/auth/whoami", get(handlers::session::whoami))
        .route("/api/overview", get(handlers::overview::get))
        .route("/api/policies", get(handlers::policies::list).post(handlers::policies::create))
        .route(
            "/api/policyholders",
            get(handlers::policyholders::list).post(handlers::policyholders::create),
        )
        .route("/api/administration/agents", get(admin::agents::list))
        .route(
            "/api/administration/customer-agents",
            get(admin::customer_agents::list)
                .post(admin::customer_agents::create)
                .put(admin::customer_agents::update)
                .delete(admin::customer_agents::delete),
        )
        .route(
            "/api/administration/policy-agents",
            get(admin::policy_agents::list)
                .post(admin::policy_agents::create)
                .delete(admin::policy_agents::delete),
        )
        .route(
            "/api/administration/customer-policies",
            get(admin::customer_policies::list),
        )
        .route(
            "/api/administration/supervisors",
            get(admin::supervisors::list).post(admin::supervisors::act),
        )
        .route(
            "/api/administration/supervisor-agent-assignment",
            post(admin::supervisor_assignment::set_supervisor),
        )
        .route(
            "/api/administration/supervisor-batch-assignment",
            get(admin::supervisor_assignment::batch_options)
                .post(admin::supervisor_assignment::batch_assign),
        )
        .route(
            "/api/administration/users",
            get(admin::users::list_by_role),
        )
        .route(
            "/api/administration/users/management",
            get(admin::users::list).post(admin::users::change_role),
        )
        .layer(from_fn(jwt_auth_middleware))
}

async fn root() -> axum::Json<Value> {
    axum::Json(json!({
        "name": "insurance-admin-api",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    }))
}

async fn health(State(state): State<AppState>) -> axum::response::Response {
    use axum::response::IntoResponse;

    match database::health_check(&state.pool).await {
        Ok(()) => (
            axum::http::StatusCode::OK,
            axum::Json(json!({ "status": "healthy", "database": "up" })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(json!({ "status": "degraded", "database": "down" })),
            )
                .into_response()
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
