//! Incident API endpoints.
//!
//! - POST /api/incidents - Report a new emergency (any authenticated user)
//! - GET /api/incidents - List incidents, filterable by status
//! - GET /api/incidents/:id - Incident details
//! - POST /api/incidents/:id/approve - Approve a reported incident (admin)
//! - POST /api/incidents/:id/reject - Reject a reported incident (admin)
//! - POST /api/incidents/:id/dispatch - Dispatch resources (admin)
//! - POST /api/incidents/:id/resolve - Resolve an incident (admin)
//! - DELETE /api/incidents/:id - Delete an incident (admin)

use super::error::ApiError;
use crate::lifecycle::{NewReport, Outcome};
use crate::server::state::AppState;
use crate::stores::IncidentFilter;
use crate::types::{Incident, IncidentId, IncidentStatus, RequestContext, ResourceId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for incident listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListIncidentsQuery {
    /// Only incidents in this status (`reported`, `active`, ...)
    pub status: Option<String>,
    /// Only the caller's own reports
    #[serde(default)]
    pub mine: bool,
}

/// Response for incident listings.
#[derive(Debug, Serialize)]
pub struct ListIncidentsResponse {
    /// Matching incidents, newest first
    pub incidents: Vec<Incident>,
    /// Total count
    pub total: usize,
}

/// Request to dispatch resources to an incident.
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    /// Resource ids to assign
    pub resources: Vec<Uuid>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Report a new emergency.
///
/// Open to any authenticated user. The incident starts in `reported`
/// and administrators are notified.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/incidents \
///   -H "x-user-id: 550e8400-e29b-41d4-a716-446655440000" \
///   -H "x-user-role: reporter" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "title": "Warehouse fire",
///     "description": "Smoke visible from the street",
///     "location": "12 Dock Rd",
///     "latitude": 25.28,
///     "longitude": 51.53,
///     "severity": "high"
///   }'
/// ```
pub async fn report_incident(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(request): Json<NewReport>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    let incident = state.lifecycle.report(ctx, request).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

/// List incidents, newest first.
///
/// Supports `?status=` to filter by lifecycle status and `?mine=true`
/// to restrict to the caller's own reports (dashboards use the former,
/// the reporter's "my reports" view the latter).
pub async fn list_incidents(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<Json<ListIncidentsResponse>, ApiError> {
    let mut filter = IncidentFilter::all();
    if let Some(status) = query.status.as_deref() {
        let status = IncidentStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown status '{status}'")))?;
        filter.status = Some(status);
    }
    if query.mine {
        filter.reported_by = Some(ctx.user_id);
    }

    let incidents = state.incidents.list(filter).await?;
    let total = incidents.len();
    Ok(Json(ListIncidentsResponse { incidents, total }))
}

/// Get incident details by id.
pub async fn get_incident(
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Incident>, ApiError> {
    let id = IncidentId::from_uuid(id);
    let incident = state
        .incidents
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Incident", id))?;
    Ok(Json(incident))
}

/// Approve a reported incident, moving it to `active`. Admin only.
pub async fn approve_incident(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Outcome>, ApiError> {
    let outcome = state
        .lifecycle
        .approve(ctx, IncidentId::from_uuid(id))
        .await?;
    Ok(Json(outcome))
}

/// Reject a reported incident. Admin only.
pub async fn reject_incident(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Outcome>, ApiError> {
    let outcome = state
        .lifecycle
        .reject(ctx, IncidentId::from_uuid(id))
        .await?;
    Ok(Json(outcome))
}

/// Dispatch resources to an active incident. Admin only.
///
/// The assignment is all-or-nothing: either the incident moves to
/// `responding` with at least one resource assigned, or nothing
/// changes.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/incidents/<id>/dispatch \
///   -H "x-user-id: ..." -H "x-user-role: admin" \
///   -H "Content-Type: application/json" \
///   -d '{"resources": ["660e8400-e29b-41d4-a716-446655440001"]}'
/// ```
pub async fn dispatch_incident(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<Outcome>, ApiError> {
    let resource_ids: Vec<ResourceId> = request
        .resources
        .into_iter()
        .map(ResourceId::from_uuid)
        .collect();
    let outcome = state
        .lifecycle
        .dispatch(ctx, IncidentId::from_uuid(id), &resource_ids)
        .await?;
    Ok(Json(outcome))
}

/// Resolve an active or responding incident, releasing its resources.
/// Admin only.
pub async fn resolve_incident(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Outcome>, ApiError> {
    let outcome = state
        .lifecycle
        .resolve(ctx, IncidentId::from_uuid(id))
        .await?;
    Ok(Json(outcome))
}

/// Delete an incident from any status. Admin only.
pub async fn delete_incident(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Outcome>, ApiError> {
    let outcome = state
        .lifecycle
        .delete(ctx, IncidentId::from_uuid(id))
        .await?;
    Ok(Json(outcome))
}
