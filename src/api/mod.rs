//! HTTP API handlers.
//!
//! Organized by domain:
//! - Incidents: reporting and the lifecycle commands
//! - Resources: resource administration
//! - Notifications: the caller's notification feed
//!
//! Identity arrives in `x-user-id`/`x-user-role` headers set by the
//! upstream auth proxy; the [`context`] extractor turns them into a
//! [`crate::types::RequestContext`]. Role checks live in the lifecycle
//! service, and [`error::ApiError`] maps the domain error taxonomy onto
//! HTTP statuses.

pub mod context;
pub mod error;
pub mod incidents;
pub mod notifications;
pub mod resources;

pub use error::ApiError;
pub use incidents::{
    approve_incident, delete_incident, dispatch_incident, get_incident, list_incidents,
    reject_incident, report_incident, resolve_incident,
};
pub use notifications::{list_notifications, mark_all_read, mark_read, unread_count};
pub use resources::{
    create_resource, delete_resource, list_available_resources, list_resources,
    set_resource_status, update_resource,
};
