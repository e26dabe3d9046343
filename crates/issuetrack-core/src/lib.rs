//! # issuetrack-core
//!
//! Issue lifecycle and work-in-progress governance on top of SQLite.
//!
//! - [`issues`]: create and update issues, stamping `started_at` and
//!   `finished_at` as the status moves, with the WIP guard on entry into
//!   `in_progress`
//! - [`metrics`]: average cycle time and weekly throughput
//! - [`standups`]: stand-up windows and the issues changed since the last one
//! - [`store`]: the SQLite [`Store`] plus project, user, scope and sprint
//!   bookkeeping
//!
//! Every operation is a method on an `*Ops` trait implemented by [`Store`];
//! bring the trait into scope to call it.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Non-test code
//! never unwraps.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
mod error;
pub mod issues;
pub mod metrics;
pub mod standups;
pub mod store;
pub mod wip;

pub use config::{load_config, Config};
pub use domain::{
    Issue, IssueCreate, IssueId, IssueKey, IssueStatus, IssueUpdate, Project, ProjectKey,
    ProjectPayload, Standup, StandupStarted,
};
pub use error::{Error, FieldViolation, Result};
pub use issues::IssueOps;
pub use metrics::{CycleTimeSummary, MetricsOps};
pub use standups::StandupOps;
pub use store::{AssignmentOps, PoolAccess, ProjectOps, ScopeOps, SprintOps, Store, UserOps};
pub use wip::WipUsage;
