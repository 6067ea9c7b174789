//! Notification API endpoints.
//!
//! - GET /api/notifications - The caller's notifications, newest first
//! - GET /api/notifications/unread-count - Unread badge count
//! - POST /api/notifications/:id/read - Mark one notification read
//! - POST /api/notifications/read-all - Mark everything read
//!
//! All endpoints are scoped to the authenticated caller; there is no
//! way to read or mark another user's notifications.

use super::error::ApiError;
use crate::server::state::AppState;
use crate::types::{Notification, NotificationId, RequestContext};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// Response Types
// ============================================================================

/// Response for notification listings.
#[derive(Debug, Serialize)]
pub struct ListNotificationsResponse {
    /// The caller's notifications, newest first
    pub notifications: Vec<Notification>,
    /// Total count
    pub total: usize,
}

/// Response for the unread badge count.
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    /// Number of unread notifications
    pub unread: u64,
}

/// Response after marking notifications read.
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    /// Number of notifications that changed
    pub marked: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// List the caller's notifications, newest first.
pub async fn list_notifications(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<ListNotificationsResponse>, ApiError> {
    let notifications = state.notifications.list_for(ctx.user_id).await?;
    let total = notifications.len();
    Ok(Json(ListNotificationsResponse {
        notifications,
        total,
    }))
}

/// Count the caller's unread notifications.
pub async fn unread_count(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread = state.notifications.unread_count(ctx.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Mark one of the caller's notifications as read.
///
/// Idempotent: marking an already-read (or unknown) notification
/// reports zero changes rather than failing.
pub async fn mark_read(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let id = NotificationId::from_uuid(id);
    let changed = state.notifications.mark_read(ctx.user_id, id).await?;
    Ok(Json(MarkReadResponse {
        marked: u64::from(changed),
    }))
}

/// Mark all of the caller's notifications as read.
pub async fn mark_all_read(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let marked = state.notifications.mark_all_read(ctx.user_id).await?;
    Ok(Json(MarkReadResponse { marked }))
}
