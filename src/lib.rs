pub mod auth;
pub mod authz;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

/// Shared application state, injected into every handler through axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
}
