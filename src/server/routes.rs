//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{incidents, notifications, resources};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Build the complete Axum router.
///
/// `pool` is the database behind the readiness probe; pass `None` when
/// the state is mock-backed (tests) and readiness should always pass.
pub fn build_router(state: AppState, pool: Option<Arc<PgPool>>) -> Router {
    let api_routes = Router::new()
        // Incident reporting and lifecycle
        .route("/incidents", post(incidents::report_incident))
        .route("/incidents", get(incidents::list_incidents))
        .route("/incidents/:id", get(incidents::get_incident))
        .route("/incidents/:id", delete(incidents::delete_incident))
        .route("/incidents/:id/approve", post(incidents::approve_incident))
        .route("/incidents/:id/reject", post(incidents::reject_incident))
        .route("/incidents/:id/dispatch", post(incidents::dispatch_incident))
        .route("/incidents/:id/resolve", post(incidents::resolve_incident))
        // Resource administration
        .route("/resources", post(resources::create_resource))
        .route("/resources", get(resources::list_resources))
        .route("/resources/available", get(resources::list_available_resources))
        .route("/resources/:id", put(resources::update_resource))
        .route("/resources/:id", delete(resources::delete_resource))
        .route("/resources/:id/status", post(resources::set_resource_status))
        // Notification feed
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(move || readiness_check(pool)))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .with_state(state)
}
