//! Transactional dispatch and resolve over `PostgreSQL`.
//!
//! These are the only multi-row mutations in the system. Both run in a
//! single transaction; dropping the transaction on any error path rolls
//! everything back, so the incident and every resource are unchanged
//! from before the call whenever an error is returned.

use super::{incident_from_row, resource_from_row};
use crate::error::{Error, Result};
use crate::stores::DispatchStore;
use crate::types::{Incident, IncidentId, IncidentStatus, Resource, ResourceId};
use async_trait::async_trait;
use sqlx::PgPool;

/// `PostgreSQL`-backed transactional lifecycle operations.
#[derive(Clone)]
pub struct PostgresDispatchStore {
    pool: PgPool,
}

impl PostgresDispatchStore {
    /// Create a new dispatch store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DispatchStore for PostgresDispatchStore {
    async fn dispatch(
        &self,
        incident_id: IncidentId,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<Resource>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage("failed to begin dispatch transaction", &e))?;

        // Status precondition re-checked inside the transaction: the
        // flip only lands if the incident is still active.
        let flipped = sqlx::query(
            "UPDATE incidents SET status = 'responding' \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(incident_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::storage("failed to mark incident responding", &e))?
        .rows_affected();

        if flipped == 0 {
            // Transaction dropped here, rolling back.
            return Err(Error::InvalidTransition {
                status: current_status(&self.pool, incident_id).await?,
                operation: "dispatch",
            });
        }

        // Conditional per-resource assignment. A resource that was
        // concurrently taken or is otherwise not available simply
        // doesn't match the WHERE clause and is skipped.
        let mut assigned = Vec::new();
        for resource_id in resource_ids {
            let row = sqlx::query(
                "UPDATE resources SET status = 'in_use', assigned_to = $1 \
                 WHERE id = $2 AND status = 'available' \
                 RETURNING id, name, category, description, status, location, \
                           assigned_to, created_at",
            )
            .bind(incident_id.as_uuid())
            .bind(resource_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::storage("failed to assign resource", &e))?;

            if let Some(row) = row {
                assigned.push(resource_from_row(&row)?);
            }
        }

        if assigned.is_empty() {
            // Nothing could be assigned: abort the whole dispatch so
            // the incident stays active.
            return Err(Error::DispatchFailed {
                reason: "none of the selected resources were available".to_string(),
            });
        }

        tx.commit()
            .await
            .map_err(|e| Error::storage("failed to commit dispatch transaction", &e))?;

        Ok(assigned)
    }

    async fn resolve(&self, incident_id: IncidentId) -> Result<(Incident, Vec<Resource>)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage("failed to begin resolve transaction", &e))?;

        let incident_row = sqlx::query(
            "UPDATE incidents SET status = 'resolved', resolved_at = NOW() \
             WHERE id = $1 AND status = ANY($2) \
             RETURNING id, title, description, location, latitude, longitude, \
                       severity, status, reported_by, reported_at, resolved_at, details",
        )
        .bind(incident_id.as_uuid())
        .bind(vec!["active".to_string(), "responding".to_string()])
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Error::storage("failed to resolve incident", &e))?;

        let Some(incident_row) = incident_row else {
            return Err(Error::InvalidTransition {
                status: current_status(&self.pool, incident_id).await?,
                operation: "resolve",
            });
        };
        let incident = incident_from_row(&incident_row)?;

        // Release every resource serving this incident in the same
        // transaction as the status flip.
        let released_rows = sqlx::query(
            "UPDATE resources SET status = 'available', assigned_to = NULL \
             WHERE assigned_to = $1 \
             RETURNING id, name, category, description, status, location, \
                       assigned_to, created_at",
        )
        .bind(incident_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| Error::storage("failed to release resources", &e))?;

        let released = released_rows
            .iter()
            .map(resource_from_row)
            .collect::<Result<Vec<_>>>()?;

        tx.commit()
            .await
            .map_err(|e| Error::storage("failed to commit resolve transaction", &e))?;

        Ok((incident, released))
    }
}

/// Fetch the incident's current status for an `InvalidTransition`
/// message, mapping a vanished row to `NotFound`.
async fn current_status(pool: &PgPool, incident_id: IncidentId) -> Result<IncidentStatus> {
    let status: Option<(String,)> = sqlx::query_as("SELECT status FROM incidents WHERE id = $1")
        .bind(incident_id.as_uuid())
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::storage("failed to fetch incident status", &e))?;

    let (raw,) = status.ok_or_else(|| Error::incident_not_found(incident_id))?;
    IncidentStatus::parse(&raw)
        .ok_or_else(|| Error::Storage(format!("unknown incident status in storage: {raw}")))
}
