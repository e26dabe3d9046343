//! Domain records, identifiers and inbound payload validation.
//!
//! Nothing here touches the store; the persistence modules build these
//! values from rows and validated payloads.

mod duration;
mod issue;
mod payload;
mod project;
mod scope;
mod sprint;
mod standup;
mod status;
mod user;
pub(crate) mod validation;

pub use duration::{format_duration, Elapsed};
pub use issue::{Issue, IssueId, IssueKey, NewIssue, ProjectKey};
pub use payload::{IssueCreate, IssueUpdate};
pub use project::{NewProject, Project, ProjectPayload};
pub(crate) use project::check_wip_limit;
pub use scope::{NewScope, Scope, ScopePayload};
pub use sprint::{NewSprint, Sprint, SprintPayload, DATE_FORMAT};
pub use standup::{Standup, StandupStarted};
pub use status::{IssueStatus, Transition};
pub use user::{NewUser, ProjectMember, User, UserPayload};
