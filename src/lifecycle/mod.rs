//! The incident lifecycle service.
//!
//! Owns the status state machine and orchestrates the transactional
//! resource assignment during dispatch:
//!
//! ```text
//!                  approve                dispatch
//!   reported ────────────────▶ active ───────────────▶ responding
//!      │                         │                         │
//!      │ reject                  │ resolve                 │ resolve
//!      ▼                         ▼                         ▼
//!   rejected                  resolved ◀──────────────── resolved
//! ```
//!
//! `resolved` and `rejected` are terminal. Delete is a destructive
//! administrative operation outside the state machine: it removes the
//! incident from any status and deliberately does NOT release resources
//! assigned to it (the storage layer only clears their dangling
//! reference); freeing them again is manual cleanup via the resource
//! administration operations.
//!
//! Every operation takes an explicit [`RequestContext`] — there is no
//! ambient "current user". All lifecycle operations require the admin
//! role except [`LifecycleService::report`]. Notifications are
//! best-effort: a failed send is logged and never rolls back a
//! committed transition.

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::stores::{
    DeleteOutcome, DispatchStore, IncidentStore, NotificationSink, ResourceStore,
};
use crate::types::{
    Incident, IncidentDetails, IncidentId, IncidentStatus, NewIncident, NewResource,
    NotificationKind, RequestContext, Resource, ResourceCategory, ResourceId, ResourceStatus,
    Severity, UserRole,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A citizen's emergency report, before the reporter identity is
/// attached from the request context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    /// Short title / category of the emergency
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Human-readable location
    pub location: String,
    /// Latitude of the incident site
    pub latitude: f64,
    /// Longitude of the incident site
    pub longitude: f64,
    /// Severity as assessed by the reporter
    pub severity: Severity,
    /// Additional structured data from the report form
    #[serde(default)]
    pub details: Option<IncidentDetails>,
}

/// Result of a lifecycle operation, for display to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outcome {
    /// The incident the operation acted on
    pub incident_id: IncidentId,
    /// The incident's status after the operation (`None` after delete)
    pub status: Option<IncidentStatus>,
    /// Human-readable result message
    pub message: String,
    /// Names of resources assigned by a dispatch (empty otherwise)
    pub assigned_resources: Vec<String>,
}

impl Outcome {
    fn new(incident_id: IncidentId, status: IncidentStatus, message: String) -> Self {
        Self {
            incident_id,
            status: Some(status),
            message,
            assigned_resources: Vec::new(),
        }
    }
}

/// Fields an administrator may change on an existing resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceUpdate {
    /// Resource name
    pub name: String,
    /// Resource category
    pub category: ResourceCategory,
    /// Free-text description
    pub description: String,
    /// Availability status
    pub status: ResourceStatus,
    /// Where the resource is stationed
    pub location: Option<String>,
}

/// The incident lifecycle service.
///
/// All persistence goes through the store traits, so the same service
/// runs against Postgres in production and the in-memory mocks in
/// tests.
pub struct LifecycleService {
    incidents: Arc<dyn IncidentStore>,
    resources: Arc<dyn ResourceStore>,
    dispatcher: Arc<dyn DispatchStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl LifecycleService {
    /// Create a new lifecycle service over the given stores.
    #[must_use]
    pub fn new(
        incidents: Arc<dyn IncidentStore>,
        resources: Arc<dyn ResourceStore>,
        dispatcher: Arc<dyn DispatchStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            incidents,
            resources,
            dispatcher,
            notifier,
        }
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Submit a new emergency report. Open to any authenticated user;
    /// the incident starts in `reported` and every administrator gets
    /// an emergency notification (best effort).
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty title/description/location
    ///   or out-of-range coordinates.
    /// - [`Error::Storage`] if the insert fails.
    pub async fn report(&self, ctx: RequestContext, report: NewReport) -> Result<Incident> {
        validate_report(&report)?;

        let incident = self
            .incidents
            .insert(NewIncident {
                title: report.title,
                description: report.description,
                location: report.location,
                latitude: report.latitude,
                longitude: report.longitude,
                severity: report.severity,
                reported_by: ctx.user_id,
                details: report.details,
            })
            .await?;

        tracing::info!(
            incident = %incident.id,
            severity = %incident.severity,
            reporter = %ctx.user_id,
            "incident reported"
        );

        let title = format!("New {} Emergency", severity_label(incident.severity));
        let message = format!(
            "A new {} emergency '{}' has been reported at {}.",
            incident.severity, incident.title, incident.location
        );
        self.fan_out_to_admins(NotificationKind::Emergency, &title, &message, incident.id)
            .await;

        Ok(incident)
    }

    // ========================================================================
    // Lifecycle transitions (admin only)
    // ========================================================================

    /// Approve a reported incident, moving it to `active`.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::NotFound`] if the incident does not exist.
    /// - [`Error::InvalidTransition`] if it is not in `reported`.
    /// - [`Error::Storage`] on database failure.
    pub async fn approve(&self, ctx: RequestContext, id: IncidentId) -> Result<Outcome> {
        require_admin(ctx)?;
        let incident = self.get_incident(id).await?;

        let moved = self
            .incidents
            .transition(id, &[IncidentStatus::Reported], IncidentStatus::Active, false)
            .await?;
        if !moved {
            return Err(self.lost_transition(id, incident.status, "approve").await);
        }

        tracing::info!(incident = %id, admin = %ctx.user_id, "incident approved");

        self.notify_reporter(
            &incident,
            NotificationKind::IncidentUpdate,
            "Emergency Report Approved",
            "Your emergency report has been approved and is now active.",
        )
        .await;

        Ok(Outcome::new(
            id,
            IncidentStatus::Active,
            format!("Incident {id} approved and marked as active."),
        ))
    }

    /// Reject a reported incident, moving it to the terminal
    /// `rejected` status.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::approve`].
    pub async fn reject(&self, ctx: RequestContext, id: IncidentId) -> Result<Outcome> {
        require_admin(ctx)?;
        let incident = self.get_incident(id).await?;

        let moved = self
            .incidents
            .transition(id, &[IncidentStatus::Reported], IncidentStatus::Rejected, false)
            .await?;
        if !moved {
            return Err(self.lost_transition(id, incident.status, "reject").await);
        }

        tracing::info!(incident = %id, admin = %ctx.user_id, "incident rejected");

        self.notify_reporter(
            &incident,
            NotificationKind::IncidentUpdate,
            "Emergency Report Rejected",
            "Your emergency report has been reviewed and rejected.",
        )
        .await;

        Ok(Outcome::new(
            id,
            IncidentStatus::Rejected,
            format!("Incident {id} has been rejected."),
        ))
    }

    /// Dispatch resources to an active incident, moving it to
    /// `responding`.
    ///
    /// The assignment is transactional: either the incident flips to
    /// `responding` with at least one resource assigned, or nothing
    /// changes at all. Selected resources that are not available at
    /// commit time are skipped silently — partial success is valid.
    /// One notification goes to the reporter listing the names of the
    /// resources actually assigned.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::NoResourcesSelected`] for an empty selection.
    /// - [`Error::NotFound`] if the incident does not exist.
    /// - [`Error::InvalidTransition`] if it is not `active`.
    /// - [`Error::DispatchFailed`] if no selected resource could be
    ///   assigned; the incident remains `active`.
    /// - [`Error::Storage`] on database failure (rolled back).
    pub async fn dispatch(
        &self,
        ctx: RequestContext,
        id: IncidentId,
        resource_ids: &[ResourceId],
    ) -> Result<Outcome> {
        require_admin(ctx)?;
        if resource_ids.is_empty() {
            return Err(Error::NoResourcesSelected);
        }

        let incident = self.get_incident(id).await?;
        if incident.status != IncidentStatus::Active {
            return Err(Error::InvalidTransition {
                status: incident.status,
                operation: "dispatch",
            });
        }

        let assigned = self.dispatcher.dispatch(id, resource_ids).await?;
        let names: Vec<String> = assigned.iter().map(|r| r.name.clone()).collect();

        tracing::info!(
            incident = %id,
            admin = %ctx.user_id,
            assigned = assigned.len(),
            requested = resource_ids.len(),
            "resources dispatched"
        );

        let message = format!(
            "A response team has been dispatched to your emergency ({}).",
            names.join(", ")
        );
        self.notify_reporter(
            &incident,
            NotificationKind::IncidentUpdate,
            "Response Team Dispatched",
            &message,
        )
        .await;

        Ok(Outcome {
            incident_id: id,
            status: Some(IncidentStatus::Responding),
            message: format!(
                "Response team dispatched to incident {id}; {} resource(s) assigned.",
                names.len()
            ),
            assigned_resources: names,
        })
    }

    /// Resolve an active or responding incident.
    ///
    /// Stamps the resolution timestamp and releases every resource
    /// assigned to the incident, all in one transaction.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::NotFound`] if the incident does not exist.
    /// - [`Error::InvalidTransition`] if it is not `active` or
    ///   `responding`.
    /// - [`Error::Storage`] on database failure (rolled back).
    pub async fn resolve(&self, ctx: RequestContext, id: IncidentId) -> Result<Outcome> {
        require_admin(ctx)?;
        let incident = self.get_incident(id).await?;
        if !matches!(
            incident.status,
            IncidentStatus::Active | IncidentStatus::Responding
        ) {
            return Err(Error::InvalidTransition {
                status: incident.status,
                operation: "resolve",
            });
        }

        let (resolved, released) = self.dispatcher.resolve(id).await?;

        tracing::info!(
            incident = %id,
            admin = %ctx.user_id,
            released = released.len(),
            "incident resolved"
        );

        self.notify_reporter(
            &resolved,
            NotificationKind::IncidentUpdate,
            "Emergency Resolved",
            "Your emergency has been marked as resolved.",
        )
        .await;

        Ok(Outcome::new(
            id,
            IncidentStatus::Resolved,
            format!("Incident {id} has been resolved."),
        ))
    }

    /// Hard-delete an incident from any status (administrative
    /// override, outside the state machine).
    ///
    /// Resources assigned to the incident are NOT released: the
    /// storage layer clears their dangling reference but leaves them
    /// `in_use`, and an administrator frees them manually via
    /// [`Self::set_resource_status`]. This mirrors the long-standing
    /// behavior of the system and is covered by tests.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::NotFound`] if the incident does not exist.
    /// - [`Error::Storage`] on database failure.
    pub async fn delete(&self, ctx: RequestContext, id: IncidentId) -> Result<Outcome> {
        require_admin(ctx)?;
        let deleted = self.incidents.delete(id).await?;
        if !deleted {
            return Err(Error::incident_not_found(id));
        }

        tracing::info!(incident = %id, admin = %ctx.user_id, "incident deleted");

        Ok(Outcome {
            incident_id: id,
            status: None,
            message: format!("Incident {id} has been deleted."),
            assigned_resources: Vec::new(),
        })
    }

    // ========================================================================
    // Resource administration (admin only)
    // ========================================================================

    /// Register a new resource.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::Validation`] for an empty name.
    /// - [`Error::InvalidResourceStatus`] for an initial status of
    ///   `in_use` — assignment only ever happens through dispatch.
    /// - [`Error::Storage`] on database failure.
    pub async fn add_resource(
        &self,
        ctx: RequestContext,
        resource: NewResource,
    ) -> Result<Resource> {
        require_admin(ctx)?;
        if resource.name.trim().is_empty() {
            return Err(Error::Validation("resource name must not be empty".to_string()));
        }
        if resource.status == ResourceStatus::InUse {
            return Err(Error::InvalidResourceStatus {
                status: ResourceStatus::InUse,
            });
        }

        let created = self.resources.insert(resource).await?;
        tracing::info!(resource = %created.id, admin = %ctx.user_id, "resource registered");
        Ok(created)
    }

    /// Update a resource's descriptive fields.
    ///
    /// An edit that sets the status to `available` also clears any
    /// assignment, so an available resource never carries one.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::NotFound`] if the resource does not exist.
    /// - [`Error::InvalidResourceStatus`] when trying to move a
    ///   resource into `in_use` through an edit.
    /// - [`Error::Storage`] on database failure.
    pub async fn update_resource(
        &self,
        ctx: RequestContext,
        id: ResourceId,
        update: ResourceUpdate,
    ) -> Result<Resource> {
        require_admin(ctx)?;
        let mut resource = self
            .resources
            .get(id)
            .await?
            .ok_or_else(|| Error::resource_not_found(id))?;

        if update.status == ResourceStatus::InUse && resource.status != ResourceStatus::InUse {
            return Err(Error::InvalidResourceStatus {
                status: ResourceStatus::InUse,
            });
        }

        resource.name = update.name;
        resource.category = update.category;
        resource.description = update.description;
        resource.status = update.status;
        resource.location = update.location;
        if resource.status == ResourceStatus::Available {
            resource.assigned_to = None;
        }

        let changed = self.resources.update(&resource).await?;
        if !changed {
            return Err(Error::resource_not_found(id));
        }

        tracing::info!(resource = %id, admin = %ctx.user_id, "resource updated");
        Ok(resource)
    }

    /// Set a resource's availability status. Marking a resource
    /// `available` also clears any assignment. Fans out a status
    /// notification to administrators (best effort).
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::InvalidResourceStatus`] for `in_use` — assignment
    ///   only ever happens through dispatch.
    /// - [`Error::NotFound`] if the resource does not exist.
    /// - [`Error::Storage`] on database failure.
    pub async fn set_resource_status(
        &self,
        ctx: RequestContext,
        id: ResourceId,
        status: ResourceStatus,
    ) -> Result<Resource> {
        require_admin(ctx)?;
        if status == ResourceStatus::InUse {
            return Err(Error::InvalidResourceStatus {
                status: ResourceStatus::InUse,
            });
        }

        let changed = self.resources.set_status(id, status).await?;
        if !changed {
            return Err(Error::resource_not_found(id));
        }
        let resource = self
            .resources
            .get(id)
            .await?
            .ok_or_else(|| Error::resource_not_found(id))?;

        tracing::info!(resource = %id, status = %status, admin = %ctx.user_id, "resource status changed");

        let message = format!("The resource '{}' is now {}.", resource.name, status);
        if let Err(err) = self
            .notifier
            .notify_role(
                UserRole::Admin,
                NotificationKind::ResourceUpdate,
                "Resource Status Update",
                &message,
                None,
            )
            .await
        {
            tracing::warn!(resource = %id, error = %err, "failed to fan out resource notification");
        }

        Ok(resource)
    }

    /// Delete a resource, refusing while it is assigned to an
    /// incident.
    ///
    /// # Errors
    ///
    /// - [`Error::Forbidden`] if the caller is not an administrator.
    /// - [`Error::NotFound`] if the resource does not exist.
    /// - [`Error::ResourceAssigned`] if it is currently assigned.
    /// - [`Error::Storage`] on database failure.
    pub async fn delete_resource(&self, ctx: RequestContext, id: ResourceId) -> Result<()> {
        require_admin(ctx)?;
        match self.resources.delete_unassigned(id).await? {
            DeleteOutcome::Deleted => {
                tracing::info!(resource = %id, admin = %ctx.user_id, "resource deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(Error::resource_not_found(id)),
            DeleteOutcome::Assigned => Err(Error::ResourceAssigned),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn get_incident(&self, id: IncidentId) -> Result<Incident> {
        self.incidents
            .get(id)
            .await?
            .ok_or_else(|| Error::incident_not_found(id))
    }

    /// The conditional update didn't land: either the incident was
    /// deleted concurrently, or another administrator won the race.
    /// Report the freshest status we can see.
    async fn lost_transition(
        &self,
        id: IncidentId,
        last_seen: IncidentStatus,
        operation: &'static str,
    ) -> Error {
        let status = match self.incidents.get(id).await {
            Ok(Some(incident)) => incident.status,
            Ok(None) => return Error::incident_not_found(id),
            Err(_) => last_seen,
        };
        Error::InvalidTransition { status, operation }
    }

    /// Best-effort notification to the incident's reporter.
    async fn notify_reporter(
        &self,
        incident: &Incident,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) {
        let link = format!("/incidents/{}", incident.id);
        if let Err(err) = self
            .notifier
            .notify(incident.reported_by, kind, title, message, Some(&link))
            .await
        {
            tracing::warn!(
                incident = %incident.id,
                reporter = %incident.reported_by,
                error = %err,
                "failed to notify reporter"
            );
        }
    }

    /// Best-effort fan-out to all administrators.
    async fn fan_out_to_admins(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        incident_id: IncidentId,
    ) {
        let link = format!("/incidents/{incident_id}");
        if let Err(err) = self
            .notifier
            .notify_role(UserRole::Admin, kind, title, message, Some(&link))
            .await
        {
            tracing::warn!(
                incident = %incident_id,
                error = %err,
                "failed to fan out admin notification"
            );
        }
    }
}

fn require_admin(ctx: RequestContext) -> Result<()> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden { required: "admin" })
    }
}

fn validate_report(report: &NewReport) -> Result<()> {
    if report.title.trim().is_empty() {
        return Err(Error::Validation("title must not be empty".to_string()));
    }
    if report.description.trim().is_empty() {
        return Err(Error::Validation("description must not be empty".to_string()));
    }
    if report.location.trim().is_empty() {
        return Err(Error::Validation("location must not be empty".to_string()));
    }
    if !(-90.0..=90.0).contains(&report.latitude) {
        return Err(Error::Validation("latitude must be between -90 and 90".to_string()));
    }
    if !(-180.0..=180.0).contains(&report.longitude) {
        return Err(Error::Validation(
            "longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "Low",
        Severity::Medium => "Medium",
        Severity::High => "High",
        Severity::Critical => "Critical",
    }
}
