//! In-memory incident/resource store.

use crate::error::{Error, Result};
use crate::stores::{DeleteOutcome, DispatchStore, IncidentFilter, IncidentStore, ResourceStore};
use crate::types::{
    Incident, IncidentId, IncidentStatus, NewIncident, NewResource, Resource, ResourceCategory,
    ResourceId, ResourceStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    incidents: HashMap<IncidentId, Incident>,
    resources: HashMap<ResourceId, Resource>,
}

/// In-memory store implementing [`IncidentStore`], [`ResourceStore`],
/// and [`DispatchStore`].
///
/// Both tables live under one mutex, so dispatch and resolve are
/// atomic: staged changes are written back only after every step
/// succeeded, matching the all-or-nothing guarantee of the Postgres
/// transactions.
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    inner: Arc<Mutex<Inner>>,
    fail_dispatch: Arc<AtomicBool>,
    fail_resolve: Arc<AtomicBool>,
}

impl MockStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next (and every subsequent) dispatch fail with a
    /// storage error after its status flip was staged, without
    /// persisting anything — simulating a mid-transaction failure.
    pub fn fail_dispatch(&self, fail: bool) {
        self.fail_dispatch.store(fail, Ordering::SeqCst);
    }

    /// Same as [`Self::fail_dispatch`], for resolve.
    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    /// Seed an incident with a specific status, for test setup.
    pub fn seed_incident(&self, incident: Incident) -> Result<()> {
        self.lock()?.incidents.insert(incident.id, incident);
        Ok(())
    }

    /// Seed a resource, for test setup.
    pub fn seed_resource(&self, resource: Resource) -> Result<()> {
        self.lock()?.resources.insert(resource.id, resource);
        Ok(())
    }

    /// Look up an incident directly, for test assertions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the mutex is poisoned.
    pub fn incident(&self, id: IncidentId) -> Result<Option<Incident>> {
        Ok(self.lock()?.incidents.get(&id).cloned())
    }

    /// Look up a resource directly, for test assertions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the mutex is poisoned.
    pub fn resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.lock()?.resources.get(&id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("mock store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl IncidentStore for MockStore {
    async fn insert(&self, incident: NewIncident) -> Result<Incident> {
        let stored = Incident {
            id: IncidentId::new(),
            title: incident.title,
            description: incident.description,
            location: incident.location,
            latitude: incident.latitude,
            longitude: incident.longitude,
            severity: incident.severity,
            status: IncidentStatus::Reported,
            reported_by: incident.reported_by,
            reported_at: Utc::now(),
            resolved_at: None,
            details: incident.details.filter(|d| !d.is_empty()),
        };
        self.lock()?.incidents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: IncidentId) -> Result<Option<Incident>> {
        Ok(self.lock()?.incidents.get(&id).cloned())
    }

    async fn list(&self, filter: IncidentFilter) -> Result<Vec<Incident>> {
        let mut incidents: Vec<Incident> = self
            .lock()?
            .incidents
            .values()
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .filter(|i| filter.reported_by.is_none_or(|u| i.reported_by == u))
            .cloned()
            .collect();
        incidents.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        Ok(incidents)
    }

    async fn transition(
        &self,
        id: IncidentId,
        allowed_from: &[IncidentStatus],
        to: IncidentStatus,
        stamp_resolved: bool,
    ) -> Result<bool> {
        let mut inner = self.lock()?;
        let Some(incident) = inner.incidents.get_mut(&id) else {
            return Ok(false);
        };
        if !allowed_from.contains(&incident.status) {
            return Ok(false);
        }
        incident.status = to;
        if stamp_resolved {
            incident.resolved_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn delete(&self, id: IncidentId) -> Result<bool> {
        let mut inner = self.lock()?;
        let removed = inner.incidents.remove(&id).is_some();
        if removed {
            // Mirror the FK's ON DELETE SET NULL: the dangling reference
            // is cleared but the resource stays in_use.
            for resource in inner.resources.values_mut() {
                if resource.assigned_to == Some(id) {
                    resource.assigned_to = None;
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ResourceStore for MockStore {
    async fn insert(&self, resource: NewResource) -> Result<Resource> {
        let stored = Resource {
            id: ResourceId::new(),
            name: resource.name,
            category: resource.category,
            description: resource.description,
            status: resource.status,
            location: resource.location,
            assigned_to: None,
            created_at: Utc::now(),
        };
        self.lock()?.resources.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.lock()?.resources.get(&id).cloned())
    }

    async fn list(&self, category: Option<ResourceCategory>) -> Result<Vec<Resource>> {
        let mut resources: Vec<Resource> = self
            .lock()?
            .resources
            .values()
            .filter(|r| category.is_none_or(|c| r.category == c))
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    async fn list_available(&self, category: Option<ResourceCategory>) -> Result<Vec<Resource>> {
        let mut resources: Vec<Resource> = self
            .lock()?
            .resources
            .values()
            .filter(|r| r.status == ResourceStatus::Available)
            .filter(|r| category.is_none_or(|c| r.category == c))
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    async fn update(&self, resource: &Resource) -> Result<bool> {
        let mut inner = self.lock()?;
        let Some(stored) = inner.resources.get_mut(&resource.id) else {
            return Ok(false);
        };
        stored.name.clone_from(&resource.name);
        stored.category = resource.category;
        stored.description.clone_from(&resource.description);
        stored.status = resource.status;
        stored.location.clone_from(&resource.location);
        if resource.status == ResourceStatus::Available {
            stored.assigned_to = None;
        }
        Ok(true)
    }

    async fn set_status(&self, id: ResourceId, status: ResourceStatus) -> Result<bool> {
        let mut inner = self.lock()?;
        let Some(resource) = inner.resources.get_mut(&id) else {
            return Ok(false);
        };
        resource.status = status;
        if status == ResourceStatus::Available {
            resource.assigned_to = None;
        }
        Ok(true)
    }

    async fn delete_unassigned(&self, id: ResourceId) -> Result<DeleteOutcome> {
        let mut inner = self.lock()?;
        match inner.resources.get(&id) {
            None => Ok(DeleteOutcome::NotFound),
            Some(resource) if resource.assigned_to.is_some() => Ok(DeleteOutcome::Assigned),
            Some(_) => {
                inner.resources.remove(&id);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}

#[async_trait]
impl DispatchStore for MockStore {
    async fn dispatch(
        &self,
        incident_id: IncidentId,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<Resource>> {
        let mut inner = self.lock()?;

        let Some(incident) = inner.incidents.get(&incident_id) else {
            return Err(Error::incident_not_found(incident_id));
        };
        if incident.status != IncidentStatus::Active {
            return Err(Error::InvalidTransition {
                status: incident.status,
                operation: "dispatch",
            });
        }

        // Stage the per-resource assignments before touching anything.
        let mut assigned = Vec::new();
        for resource_id in resource_ids {
            if let Some(resource) = inner.resources.get(resource_id) {
                if resource.status == ResourceStatus::Available {
                    let mut updated = resource.clone();
                    updated.status = ResourceStatus::InUse;
                    updated.assigned_to = Some(incident_id);
                    assigned.push(updated);
                }
            }
        }

        if self.fail_dispatch.load(Ordering::SeqCst) {
            // Simulated mid-transaction failure: nothing written back.
            return Err(Error::Storage("simulated dispatch failure".to_string()));
        }

        if assigned.is_empty() {
            return Err(Error::DispatchFailed {
                reason: "none of the selected resources were available".to_string(),
            });
        }

        // Commit: write the staged changes back under the same lock.
        if let Some(incident) = inner.incidents.get_mut(&incident_id) {
            incident.status = IncidentStatus::Responding;
        }
        for resource in &assigned {
            inner.resources.insert(resource.id, resource.clone());
        }

        Ok(assigned)
    }

    async fn resolve(&self, incident_id: IncidentId) -> Result<(Incident, Vec<Resource>)> {
        let mut inner = self.lock()?;

        let Some(incident) = inner.incidents.get(&incident_id) else {
            return Err(Error::incident_not_found(incident_id));
        };
        if !matches!(
            incident.status,
            IncidentStatus::Active | IncidentStatus::Responding
        ) {
            return Err(Error::InvalidTransition {
                status: incident.status,
                operation: "resolve",
            });
        }

        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(Error::Storage("simulated resolve failure".to_string()));
        }

        let mut resolved = incident.clone();
        resolved.status = IncidentStatus::Resolved;
        resolved.resolved_at = Some(Utc::now());

        let mut released = Vec::new();
        for resource in inner.resources.values_mut() {
            if resource.assigned_to == Some(incident_id) {
                resource.status = ResourceStatus::Available;
                resource.assigned_to = None;
                released.push(resource.clone());
            }
        }
        inner.incidents.insert(incident_id, resolved.clone());

        Ok((resolved, released))
    }
}
