//! `PostgreSQL` notification sink and read store.
//!
//! Notifications are rows in the `notifications` table; "delivery" is
//! the recipient reading them through the API. The sink is best-effort
//! from the lifecycle's perspective — the service logs a failed insert
//! and carries on.

use crate::error::{Error, Result};
use crate::stores::{NotificationSink, NotificationStore};
use crate::types::{Notification, NotificationId, NotificationKind, UserId, UserRole};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, link, is_read, created_at";

/// `PostgreSQL`-backed notification sink and store.
#[derive(Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    /// Create a new notification store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let kind_raw: String = row
        .try_get("kind")
        .map_err(|e| Error::storage("failed to read notification kind", &e))?;
    let kind = NotificationKind::parse(&kind_raw)
        .ok_or_else(|| Error::Storage(format!("unknown notification kind in storage: {kind_raw}")))?;

    Ok(Notification {
        id: NotificationId::from_uuid(
            row.try_get("id")
                .map_err(|e| Error::storage("failed to read notification id", &e))?,
        ),
        user_id: UserId::from_uuid(
            row.try_get("user_id")
                .map_err(|e| Error::storage("failed to read notification recipient", &e))?,
        ),
        kind,
        title: row
            .try_get("title")
            .map_err(|e| Error::storage("failed to read notification title", &e))?,
        message: row
            .try_get("message")
            .map_err(|e| Error::storage("failed to read notification message", &e))?,
        link: row
            .try_get("link")
            .map_err(|e| Error::storage("failed to read notification link", &e))?,
        is_read: row
            .try_get("is_read")
            .map_err(|e| Error::storage("failed to read notification read flag", &e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| Error::storage("failed to read notification created_at", &e))?,
    })
}

#[async_trait]
impl NotificationSink for PostgresNotificationStore {
    async fn notify(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, message, link) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(NotificationId::new().as_uuid())
        .bind(user_id.as_uuid())
        .bind(kind.as_str())
        .bind(title)
        .bind(message)
        .bind(link)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to insert notification", &e))?;

        Ok(())
    }

    async fn notify_role(
        &self,
        role: UserRole,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<()> {
        // One statement fans out to every user holding the role.
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, message, link) \
             SELECT gen_random_uuid(), id, $2, $3, $4, $5 \
             FROM users WHERE role = $1",
        )
        .bind(role.as_str())
        .bind(kind.as_str())
        .bind(title)
        .bind(message)
        .bind(link)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to fan out notification", &e))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn list_for(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to list notifications", &e))?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to count unread notifications", &e))?;

        // COUNT(*) is never negative
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<bool> {
        // Scoped to the recipient so one user cannot mark another's.
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to mark notification read", &e))?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage("failed to mark notifications read", &e))?
        .rows_affected();

        Ok(affected)
    }
}
