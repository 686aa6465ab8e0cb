//! dvp-api library interface
//!
//! Exposes the router and state so integration tests can drive the HTTP
//! surface without binding a port.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Resource routes live under /api/v1; the health check stays unprefixed
/// for monitoring.
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(api::auth_routes())
        .merge(api::recognition_routes())
        .merge(api::passport_routes());

    Router::new()
        .nest("/api/v1", v1)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
