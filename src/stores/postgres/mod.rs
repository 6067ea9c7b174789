//! `PostgreSQL` store implementations.
//!
//! Each store wraps a shared [`PgPool`]. All statements are
//! parameterized with `$n` placeholders; status preconditions are
//! folded into the `WHERE` clause of the write itself so a check never
//! races its write. The multi-row operations (dispatch, resolve) run
//! inside a single transaction and roll back on any error.

mod dispatch;
mod incidents;
mod notifications;
mod resources;

pub use dispatch::PostgresDispatchStore;
pub use incidents::PostgresIncidentStore;
pub use notifications::PostgresNotificationStore;
pub use resources::PostgresResourceStore;

use crate::error::{Error, Result};
use crate::types::{
    Incident, IncidentDetails, IncidentId, IncidentStatus, Resource, ResourceCategory, ResourceId,
    ResourceStatus, Severity, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

/// Map an `incidents` row to the domain entity, collapsing legacy
/// status synonyms on the way out.
pub(crate) fn incident_from_row(row: &PgRow) -> Result<Incident> {
    let status_raw: String = row
        .try_get("status")
        .map_err(|e| Error::storage("failed to read incident status", &e))?;
    let status = IncidentStatus::parse(&status_raw)
        .ok_or_else(|| Error::Storage(format!("unknown incident status in storage: {status_raw}")))?;

    let severity_raw: String = row
        .try_get("severity")
        .map_err(|e| Error::storage("failed to read incident severity", &e))?;
    let severity = Severity::parse(&severity_raw)
        .ok_or_else(|| Error::Storage(format!("unknown severity in storage: {severity_raw}")))?;

    let details: Option<serde_json::Value> = row
        .try_get("details")
        .map_err(|e| Error::storage("failed to read incident details", &e))?;
    let details = details
        .map(serde_json::from_value::<IncidentDetails>)
        .transpose()
        .map_err(|e| Error::Storage(format!("malformed incident details in storage: {e}")))?;

    Ok(Incident {
        id: IncidentId::from_uuid(
            row.try_get("id")
                .map_err(|e| Error::storage("failed to read incident id", &e))?,
        ),
        title: row
            .try_get("title")
            .map_err(|e| Error::storage("failed to read incident title", &e))?,
        description: row
            .try_get("description")
            .map_err(|e| Error::storage("failed to read incident description", &e))?,
        location: row
            .try_get("location")
            .map_err(|e| Error::storage("failed to read incident location", &e))?,
        latitude: row
            .try_get("latitude")
            .map_err(|e| Error::storage("failed to read incident latitude", &e))?,
        longitude: row
            .try_get("longitude")
            .map_err(|e| Error::storage("failed to read incident longitude", &e))?,
        severity,
        status,
        reported_by: UserId::from_uuid(
            row.try_get("reported_by")
                .map_err(|e| Error::storage("failed to read incident reporter", &e))?,
        ),
        reported_at: row
            .try_get("reported_at")
            .map_err(|e| Error::storage("failed to read incident reported_at", &e))?,
        resolved_at: row
            .try_get("resolved_at")
            .map_err(|e| Error::storage("failed to read incident resolved_at", &e))?,
        details,
    })
}

/// Map a `resources` row to the domain entity.
pub(crate) fn resource_from_row(row: &PgRow) -> Result<Resource> {
    let status_raw: String = row
        .try_get("status")
        .map_err(|e| Error::storage("failed to read resource status", &e))?;
    let status = ResourceStatus::parse(&status_raw)
        .ok_or_else(|| Error::Storage(format!("unknown resource status in storage: {status_raw}")))?;

    let category_raw: String = row
        .try_get("category")
        .map_err(|e| Error::storage("failed to read resource category", &e))?;
    let category = ResourceCategory::parse(&category_raw)
        .ok_or_else(|| Error::Storage(format!("unknown resource category in storage: {category_raw}")))?;

    let assigned_to: Option<uuid::Uuid> = row
        .try_get("assigned_to")
        .map_err(|e| Error::storage("failed to read resource assignment", &e))?;

    Ok(Resource {
        id: ResourceId::from_uuid(
            row.try_get("id")
                .map_err(|e| Error::storage("failed to read resource id", &e))?,
        ),
        name: row
            .try_get("name")
            .map_err(|e| Error::storage("failed to read resource name", &e))?,
        category,
        description: row
            .try_get("description")
            .map_err(|e| Error::storage("failed to read resource description", &e))?,
        status,
        location: row
            .try_get("location")
            .map_err(|e| Error::storage("failed to read resource location", &e))?,
        assigned_to: assigned_to.map(IncidentId::from_uuid),
        created_at: row
            .try_get("created_at")
            .map_err(|e| Error::storage("failed to read resource created_at", &e))?,
    })
}

/// Flatten a status set into every storage value it matches, legacy
/// synonyms included.
pub(crate) fn storage_values(statuses: &[IncidentStatus]) -> Vec<String> {
    statuses.iter().flat_map(IncidentStatus::storage_values).collect()
}
