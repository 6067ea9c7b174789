//! Health check endpoints.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness check: 200 OK if the process is running. Does not verify
/// dependencies.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// Readiness check: 200 OK when the service can reach its database.
///
/// When no pool is configured (mock-backed tests) the service reports
/// ready.
pub async fn readiness_check(pool: Option<Arc<PgPool>>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match pool {
        Some(pool) => sqlx::query("SELECT 1").execute(pool.as_ref()).await.is_ok(),
        None => true,
    };
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}
