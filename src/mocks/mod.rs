//! Mock store implementations for testing.
//!
//! In-memory implementations of the store traits, for unit and
//! integration tests. [`MockStore`] keeps incidents and resources under
//! one mutex so its dispatch/resolve are atomic the way the Postgres
//! transactions are, and it can be told to fail mid-operation to
//! exercise rollback behavior.

mod notifications;
mod store;

pub use notifications::MockNotificationStore;
pub use store::MockStore;
