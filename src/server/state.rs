//! Application state for the HTTP server.
//!
//! Contains the shared resources the handlers need: the lifecycle
//! service for commands, and the read-side stores for queries. It's
//! cloned (cheaply via Arc) for each request.

use crate::lifecycle::LifecycleService;
use crate::stores::{IncidentStore, NotificationStore, ResourceStore};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Commands (report, approve, dispatch, ...) go through the lifecycle
/// service; plain reads go straight to the stores.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle service for all state-changing operations
    pub lifecycle: Arc<LifecycleService>,

    /// Incident reads (list, get)
    pub incidents: Arc<dyn IncidentStore>,

    /// Resource reads (list, available)
    pub resources: Arc<dyn ResourceStore>,

    /// Stored notifications (list, unread count, mark read)
    pub notifications: Arc<dyn NotificationStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        lifecycle: Arc<LifecycleService>,
        incidents: Arc<dyn IncidentStore>,
        resources: Arc<dyn ResourceStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            lifecycle,
            incidents,
            resources,
            notifications,
        }
    }
}
