//! `PostgreSQL` incident store.

use super::{incident_from_row, storage_values};
use crate::error::{Error, Result};
use crate::stores::{IncidentFilter, IncidentStore};
use crate::types::{Incident, IncidentId, IncidentStatus, NewIncident};
use async_trait::async_trait;
use sqlx::PgPool;

const INCIDENT_COLUMNS: &str = "id, title, description, location, latitude, longitude, \
     severity, status, reported_by, reported_at, resolved_at, details";

/// `PostgreSQL`-backed incident store.
#[derive(Clone)]
pub struct PostgresIncidentStore {
    pool: PgPool,
}

impl PostgresIncidentStore {
    /// Create a new incident store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentStore for PostgresIncidentStore {
    async fn insert(&self, incident: NewIncident) -> Result<Incident> {
        let details = incident
            .details
            .as_ref()
            .filter(|d| !d.is_empty())
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::Storage(format!("failed to encode incident details: {e}")))?;

        let row = sqlx::query(&format!(
            "INSERT INTO incidents \
                 (id, title, description, location, latitude, longitude, \
                  severity, status, reported_by, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'reported', $8, $9) \
             RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(IncidentId::new().as_uuid())
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(&incident.location)
        .bind(incident.latitude)
        .bind(incident.longitude)
        .bind(incident.severity.as_str())
        .bind(incident.reported_by.as_uuid())
        .bind(details)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to insert incident", &e))?;

        incident_from_row(&row)
    }

    async fn get(&self, id: IncidentId) -> Result<Option<Incident>> {
        let row = sqlx::query(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to fetch incident", &e))?;

        row.as_ref().map(incident_from_row).transpose()
    }

    async fn list(&self, filter: IncidentFilter) -> Result<Vec<Incident>> {
        let status_values = filter.status.map(|s| s.storage_values());

        let rows = sqlx::query(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents \
             WHERE ($1::text[] IS NULL OR status = ANY($1)) \
               AND ($2::uuid IS NULL OR reported_by = $2) \
             ORDER BY reported_at DESC"
        ))
        .bind(status_values)
        .bind(filter.reported_by.map(|u| *u.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to list incidents", &e))?;

        rows.iter().map(incident_from_row).collect()
    }

    async fn transition(
        &self,
        id: IncidentId,
        allowed_from: &[IncidentStatus],
        to: IncidentStatus,
        stamp_resolved: bool,
    ) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE incidents \
             SET status = $2, \
                 resolved_at = CASE WHEN $3 THEN NOW() ELSE resolved_at END \
             WHERE id = $1 AND status = ANY($4)",
        )
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(stamp_resolved)
        .bind(storage_values(allowed_from))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to transition incident", &e))?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn delete(&self, id: IncidentId) -> Result<bool> {
        // Assigned resources are deliberately NOT released here; the
        // FK's ON DELETE SET NULL clears the dangling reference but
        // leaves each resource in_use for manual cleanup.
        let affected = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("failed to delete incident", &e))?
            .rows_affected();

        Ok(affected > 0)
    }
}
