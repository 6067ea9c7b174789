//! QRCS — emergency incident reporting and response coordination.
//!
//! Citizens report emergencies; administrators triage them, dispatch
//! resources, and resolve them. The core is a small state machine over
//! the incident status plus a transactional resource assignment step:
//!
//! ```text
//!                  approve                dispatch
//!   reported ────────────────▶ active ───────────────▶ responding
//!      │                         │                         │
//!      │ reject                  └───────── resolve ───────┘
//!      ▼                                       │
//!   rejected                                   ▼
//!                                           resolved
//! ```
//!
//! # Architecture
//!
//! - [`types`]: ids, enums, and entities shared by every layer
//! - [`stores`]: persistence traits plus the Postgres implementations;
//!   the transactional seam is [`stores::DispatchStore`], whose
//!   dispatch/resolve are each one database transaction
//! - [`lifecycle`]: the service owning the state machine, validation,
//!   role checks, and notification fan-out
//! - [`api`] / [`server`]: the Axum HTTP surface
//! - [`mocks`]: in-memory stores for tests, with failure injection to
//!   exercise rollback behavior
//!
//! # Key guarantees
//!
//! - **Transition safety**: status changes are conditional updates
//!   (`UPDATE ... WHERE status IN (...)`), so concurrent commands can't
//!   interleave a read and a write.
//! - **Dispatch atomicity**: either the incident flips to `responding`
//!   with at least one resource assigned, or nothing changes at all.
//! - **Exactly-one winner**: a resource is assigned by conditional
//!   update (`WHERE status = 'available'`), so two concurrent
//!   dispatches of the same resource can't both take it.
//! - **Best-effort notifications**: a failed send is logged and never
//!   rolls back a committed transition.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mocks;
pub mod server;
pub mod stores;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{LifecycleService, NewReport, Outcome};
pub use server::{build_router, AppState};
pub use types::*;
