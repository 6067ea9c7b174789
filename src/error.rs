//! Error types for lifecycle and store operations.

use crate::types::{IncidentStatus, ResourceStatus};
use thiserror::Error;

/// Result type alias for QRCS operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the incident lifecycle and its stores.
///
/// Every variant carries a human-readable message suitable for display
/// to the calling administrator. Nothing is silently swallowed except
/// per-resource assignment skips during dispatch, which are valid
/// partial successes rather than errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The referenced incident or resource does not exist.
    #[error("{kind} with id {id} not found")]
    NotFound {
        /// What kind of record was looked up ("incident", "resource", ...)
        kind: &'static str,
        /// The id that was requested
        id: String,
    },

    /// The requested operation is not legal from the incident's
    /// current status.
    #[error("cannot {operation} an incident in status {status}")]
    InvalidTransition {
        /// The incident's current status
        status: IncidentStatus,
        /// The operation that was attempted
        operation: &'static str,
    },

    /// Dispatch was called with an empty resource selection.
    #[error("no resources selected; select at least one resource to dispatch")]
    NoResourcesSelected,

    /// The dispatch transaction was aborted. The incident and all
    /// resources are unchanged from before the call.
    #[error("dispatch failed: {reason}")]
    DispatchFailed {
        /// Why the transaction aborted
        reason: String,
    },

    /// A resource cannot be deleted while assigned to an incident.
    #[error("resource is assigned to an incident and cannot be deleted")]
    ResourceAssigned,

    /// A resource status change that is not allowed administratively
    /// (`in_use` is only ever set by dispatch).
    #[error("resource status {status} cannot be set directly")]
    InvalidResourceStatus {
        /// The status that was requested
        status: ResourceStatus,
    },

    /// The caller lacks the role required for this operation.
    #[error("operation requires the {required} role")]
    Forbidden {
        /// The role that was required
        required: &'static str,
    },

    /// Request payload failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Generic storage failure from the underlying database. Any
    /// in-flight transaction has been rolled back.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] on an incident.
    #[must_use]
    pub fn incident_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: "incident",
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] on a resource.
    #[must_use]
    pub fn resource_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: "resource",
            id: id.to_string(),
        }
    }

    /// Wrap a sqlx error as a storage failure.
    #[must_use]
    pub fn storage(context: &str, err: &sqlx::Error) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }
}
