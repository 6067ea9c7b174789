//! `PostgreSQL` resource store.

use super::resource_from_row;
use crate::error::{Error, Result};
use crate::stores::{DeleteOutcome, ResourceStore};
use crate::types::{NewResource, Resource, ResourceCategory, ResourceId, ResourceStatus};
use async_trait::async_trait;
use sqlx::PgPool;

const RESOURCE_COLUMNS: &str =
    "id, name, category, description, status, location, assigned_to, created_at";

/// `PostgreSQL`-backed resource store.
#[derive(Clone)]
pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    /// Create a new resource store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    async fn insert(&self, resource: NewResource) -> Result<Resource> {
        let row = sqlx::query(&format!(
            "INSERT INTO resources (id, name, category, description, status, location) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(ResourceId::new().as_uuid())
        .bind(&resource.name)
        .bind(resource.category.as_str())
        .bind(&resource.description)
        .bind(resource.status.as_str())
        .bind(&resource.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to insert resource", &e))?;

        resource_from_row(&row)
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>> {
        let row = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to fetch resource", &e))?;

        row.as_ref().map(resource_from_row).transpose()
    }

    async fn list(&self, category: Option<ResourceCategory>) -> Result<Vec<Resource>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources \
             WHERE ($1::text IS NULL OR category = $1) \
             ORDER BY category, name"
        ))
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to list resources", &e))?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn list_available(&self, category: Option<ResourceCategory>) -> Result<Vec<Resource>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources \
             WHERE status = 'available' \
               AND ($1::text IS NULL OR category = $1) \
             ORDER BY category, name"
        ))
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to list available resources", &e))?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn update(&self, resource: &Resource) -> Result<bool> {
        // Same rule as set_status: a resource edited back to available
        // cannot keep an assignment.
        let affected = sqlx::query(
            "UPDATE resources \
             SET name = $2, category = $3, description = $4, status = $5, location = $6, \
                 assigned_to = CASE WHEN $5 = 'available' THEN NULL ELSE assigned_to END \
             WHERE id = $1",
        )
        .bind(resource.id.as_uuid())
        .bind(&resource.name)
        .bind(resource.category.as_str())
        .bind(&resource.description)
        .bind(resource.status.as_str())
        .bind(&resource.location)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to update resource", &e))?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn set_status(&self, id: ResourceId, status: ResourceStatus) -> Result<bool> {
        // Marking a resource available clears its assignment; other
        // statuses leave the assignment untouched.
        let affected = sqlx::query(
            "UPDATE resources \
             SET status = $2, \
                 assigned_to = CASE WHEN $2 = 'available' THEN NULL ELSE assigned_to END \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to set resource status", &e))?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn delete_unassigned(&self, id: ResourceId) -> Result<DeleteOutcome> {
        // The assignment check and the delete share one statement so a
        // concurrent dispatch cannot slip in between.
        let affected = sqlx::query("DELETE FROM resources WHERE id = $1 AND assigned_to IS NULL")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("failed to delete resource", &e))?
            .rows_affected();

        if affected > 0 {
            return Ok(DeleteOutcome::Deleted);
        }

        // Distinguish "missing" from "assigned" for the caller.
        let exists: Option<(bool,)> =
            sqlx::query_as("SELECT assigned_to IS NOT NULL FROM resources WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::storage("failed to check resource assignment", &e))?;

        Ok(match exists {
            // Row still present: the delete was blocked by an assignment
            // (even if it was released between the two statements).
            Some(_) => DeleteOutcome::Assigned,
            None => DeleteOutcome::NotFound,
        })
    }
}
