//! Store traits for incidents, resources, and notifications.
//!
//! The lifecycle service talks to persistence exclusively through
//! these traits, so the same service logic runs against `PostgreSQL`
//! in production and against in-memory mocks in tests.
//!
//! All queries behind these traits are parameterized; no SQL is ever
//! built by string concatenation.

use crate::error::Result;
use crate::types::{
    Incident, IncidentId, IncidentStatus, NewIncident, NewResource, Notification, NotificationId,
    NotificationKind, Resource, ResourceCategory, ResourceId, ResourceStatus, UserId, UserRole,
};
use async_trait::async_trait;

pub mod postgres;

pub use postgres::{
    PostgresDispatchStore, PostgresIncidentStore, PostgresNotificationStore,
    PostgresResourceStore,
};

/// Filter for incident listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    /// Only incidents in this status
    pub status: Option<IncidentStatus>,
    /// Only incidents reported by this user
    pub reported_by: Option<UserId>,
}

impl IncidentFilter {
    /// Filter matching every incident.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            status: None,
            reported_by: None,
        }
    }
}

/// Outcome of attempting to delete a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The row was deleted
    Deleted,
    /// No row with that id exists
    NotFound,
    /// The resource is assigned to an incident; deletion refused
    Assigned,
}

/// Persistence for incident records.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert a new incident with status `reported`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the insert fails.
    async fn insert(&self, incident: NewIncident) -> Result<Incident>;

    /// Fetch an incident by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn get(&self, id: IncidentId) -> Result<Option<Incident>>;

    /// List incidents matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn list(&self, filter: IncidentFilter) -> Result<Vec<Incident>>;

    /// Conditionally transition an incident's status.
    ///
    /// The precondition check and the write are one statement
    /// (`UPDATE ... WHERE status IN (...)`), so a concurrent transition
    /// cannot slip between a read and the write. Returns `true` when a
    /// row actually changed. When `stamp_resolved` is set, the
    /// `resolved_at` timestamp is written alongside the status.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the update fails.
    async fn transition(
        &self,
        id: IncidentId,
        allowed_from: &[IncidentStatus],
        to: IncidentStatus,
        stamp_resolved: bool,
    ) -> Result<bool>;

    /// Hard-delete an incident row. Returns `true` if a row was
    /// removed. Resources assigned to the incident are NOT released;
    /// the storage layer only clears their dangling reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the delete fails.
    async fn delete(&self, id: IncidentId) -> Result<bool>;
}

/// Persistence for deployable resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Register a new resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the insert fails.
    async fn insert(&self, resource: NewResource) -> Result<Resource>;

    /// Fetch a resource by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn get(&self, id: ResourceId) -> Result<Option<Resource>>;

    /// List all resources, optionally restricted to a category.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn list(&self, category: Option<ResourceCategory>) -> Result<Vec<Resource>>;

    /// List resources currently available for dispatch, optionally
    /// restricted to a category.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn list_available(&self, category: Option<ResourceCategory>) -> Result<Vec<Resource>>;

    /// Update a resource's descriptive fields (name, category,
    /// description, location, status). An edit that sets the status
    /// to `available` also clears any assignment, same as
    /// [`Self::set_status`]; assignment is never set here. Returns
    /// `true` if a row changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the update fails.
    async fn update(&self, resource: &Resource) -> Result<bool>;

    /// Set a resource's status. Marking a resource `available` also
    /// clears any assignment. Returns `true` if a row changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the update fails.
    async fn set_status(&self, id: ResourceId, status: ResourceStatus) -> Result<bool>;

    /// Delete a resource, refusing while it is assigned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the delete fails.
    async fn delete_unassigned(&self, id: ResourceId) -> Result<DeleteOutcome>;
}

/// The transactional operations of the lifecycle: dispatch and resolve
/// each mutate the incident row and resource rows as one atomic unit.
///
/// Implementations guarantee that a failure anywhere inside either
/// operation leaves every row unchanged from before the call.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Atomically dispatch resources to an incident.
    ///
    /// In one transaction: flip the incident `active -> responding`
    /// (conditional on the current status, re-checked inside the
    /// transaction), then conditionally assign each requested resource
    /// (`WHERE status = 'available'`). Resources that were concurrently
    /// taken or are otherwise unavailable are skipped silently. The
    /// transaction commits only if at least one resource was assigned.
    ///
    /// Returns the resources actually assigned, in request order.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidTransition`] if the incident was not
    ///   `active` inside the transaction (everything rolled back).
    /// - [`crate::Error::DispatchFailed`] if no requested resource was
    ///   available (everything rolled back).
    /// - [`crate::Error::Storage`] on database failure (rolled back).
    async fn dispatch(
        &self,
        incident_id: IncidentId,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<Resource>>;

    /// Atomically resolve an incident and release its resources.
    ///
    /// In one transaction: flip the incident from `active` or
    /// `responding` to `resolved` with `resolved_at` stamped, then
    /// release every resource assigned to it. Returns the resolved
    /// incident and the resources that were released.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidTransition`] if the incident was not
    ///   in a resolvable status inside the transaction.
    /// - [`crate::Error::Storage`] on database failure (rolled back).
    async fn resolve(&self, incident_id: IncidentId) -> Result<(Incident, Vec<Resource>)>;
}

/// Outbound notification requests.
///
/// Delivery is best-effort: the lifecycle service logs failures and
/// never lets them roll back a committed transition. Sends are
/// idempotent at the level the lifecycle cares about — a failed
/// lifecycle call sends nothing, a successful one sends exactly one
/// request per recipient.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Notify a single user.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the notification could not
    /// be recorded. Callers treat this as non-fatal.
    async fn notify(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<()>;

    /// Notify every user holding a role (e.g. all admins).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the fan-out could not be
    /// recorded. Callers treat this as non-fatal.
    async fn notify_role(
        &self,
        role: UserRole,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<()>;
}

/// Read side of stored notifications, for the HTTP API.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// List a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn list_for(&self, user_id: UserId) -> Result<Vec<Notification>>;

    /// Count a user's unread notifications.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the query fails.
    async fn unread_count(&self, user_id: UserId) -> Result<u64>;

    /// Mark one of the user's notifications as read. Returns `true`
    /// if a row changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the update fails.
    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<bool>;

    /// Mark all of the user's notifications as read. Returns the
    /// number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the update fails.
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64>;
}
