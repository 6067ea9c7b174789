//! Resource management API endpoints.
//!
//! - GET /api/resources - List resources, filterable by category
//! - GET /api/resources/available - List resources available for dispatch
//! - POST /api/resources - Register a resource (admin)
//! - PUT /api/resources/:id - Update a resource (admin)
//! - POST /api/resources/:id/status - Change availability status (admin)
//! - DELETE /api/resources/:id - Delete an unassigned resource (admin)

use super::error::ApiError;
use crate::lifecycle::ResourceUpdate;
use crate::server::state::AppState;
use crate::types::{NewResource, RequestContext, Resource, ResourceCategory, ResourceId, ResourceStatus};
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

/// Query parameters for resource listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListResourcesQuery {
    /// Only resources in this category (`vehicle`, `equipment`, ...)
    pub category: Option<String>,
}

/// Response for resource listings.
#[derive(Debug, Serialize)]
pub struct ListResourcesResponse {
    /// Matching resources, sorted by name
    pub resources: Vec<Resource>,
    /// Total count
    pub total: usize,
}

/// Request to change a resource's availability status.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// The new status (`available`, `unavailable`, `maintenance`;
    /// `in_use` is only ever set by dispatch)
    pub status: ResourceStatus,
}

fn parse_category(query: &ListResourcesQuery) -> Result<Option<ResourceCategory>, ApiError> {
    query
        .category
        .as_deref()
        .map(|value| {
            ResourceCategory::parse(value)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown category '{value}'")))
        })
        .transpose()
}

// ============================================================================
// Handlers
// ============================================================================

/// List all resources, sorted by name.
pub async fn list_resources(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<ListResourcesQuery>,
) -> Result<Json<ListResourcesResponse>, ApiError> {
    let category = parse_category(&query)?;
    let resources = state.resources.list(category).await?;
    let total = resources.len();
    Ok(Json(ListResourcesResponse { resources, total }))
}

/// List resources currently available for dispatch.
pub async fn list_available_resources(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<ListResourcesQuery>,
) -> Result<Json<ListResourcesResponse>, ApiError> {
    let category = parse_category(&query)?;
    let resources = state.resources.list_available(category).await?;
    let total = resources.len();
    Ok(Json(ListResourcesResponse { resources, total }))
}

/// Register a new resource. Admin only.
pub async fn create_resource(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(request): Json<NewResource>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let resource = state.lifecycle.add_resource(ctx, request).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// Update a resource's descriptive fields. Admin only.
pub async fn update_resource(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<ResourceUpdate>,
) -> Result<Json<Resource>, ApiError> {
    let resource = state
        .lifecycle
        .update_resource(ctx, ResourceId::from_uuid(id), request)
        .await?;
    Ok(Json(resource))
}

/// Change a resource's availability status. Admin only.
///
/// Marking a resource `available` also clears any assignment, which is
/// how an administrator frees a resource stranded by an incident
/// deletion.
pub async fn set_resource_status(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Resource>, ApiError> {
    let resource = state
        .lifecycle
        .set_resource_status(ctx, ResourceId::from_uuid(id), request.status)
        .await?;
    Ok(Json(resource))
}

/// Delete a resource. Admin only; refused while the resource is
/// assigned to an incident.
pub async fn delete_resource(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .lifecycle
        .delete_resource(ctx, ResourceId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
