//! In-memory notification sink and store.

use crate::error::{Error, Result};
use crate::stores::{NotificationSink, NotificationStore};
use crate::types::{Notification, NotificationId, NotificationKind, UserId, UserRole};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    notifications: Vec<Notification>,
    users: HashMap<UserId, UserRole>,
}

/// In-memory [`NotificationSink`] and [`NotificationStore`].
///
/// Records every send so tests can assert on exactly what was
/// notified. Role fan-out targets users registered via
/// [`Self::register_user`].
#[derive(Clone, Debug, Default)]
pub struct MockNotificationStore {
    inner: Arc<Mutex<Inner>>,
    fail_sends: Arc<AtomicBool>,
}

impl MockNotificationStore {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user for role fan-outs.
    pub fn register_user(&self, user_id: UserId, role: UserRole) -> Result<()> {
        self.lock()?.users.insert(user_id, role);
        Ok(())
    }

    /// Make every send fail, to verify that notification failures
    /// never affect lifecycle outcomes.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every notification sent so far, in send order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the mutex is poisoned.
    pub fn sent(&self) -> Result<Vec<Notification>> {
        Ok(self.lock()?.notifications.clone())
    }

    /// Notifications sent to one user, in send order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the mutex is poisoned.
    pub fn sent_to(&self, user_id: UserId) -> Result<Vec<Notification>> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("mock notification mutex poisoned".to_string()))
    }

    fn push(
        inner: &mut Inner,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) {
        inner.notifications.push(Notification {
            id: NotificationId::new(),
            user_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            link: link.map(ToString::to_string),
            is_read: false,
            created_at: Utc::now(),
        });
    }
}

#[async_trait]
impl NotificationSink for MockNotificationStore {
    async fn notify(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Storage("simulated notification failure".to_string()));
        }
        let mut inner = self.lock()?;
        Self::push(&mut inner, user_id, kind, title, message, link);
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
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Storage("simulated notification failure".to_string()));
        }
        let mut inner = self.lock()?;
        let recipients: Vec<UserId> = inner
            .users
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(id, _)| *id)
            .collect();
        for user_id in recipients {
            Self::push(&mut inner, user_id, kind, title, message, link);
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MockNotificationStore {
    async fn list_for(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let mut notifications = self.sent_to(user_id)?;
        notifications.reverse(); // newest first
        Ok(notifications)
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<bool> {
        let mut inner = self.lock()?;
        for notification in &mut inner.notifications {
            if notification.id == id && notification.user_id == user_id {
                let changed = !notification.is_read;
                notification.is_read = true;
                return Ok(changed);
            }
        }
        Ok(false)
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let mut inner = self.lock()?;
        let mut changed = 0;
        for notification in &mut inner.notifications {
            if notification.user_id == user_id && !notification.is_read {
                notification.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
