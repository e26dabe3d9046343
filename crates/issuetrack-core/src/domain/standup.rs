use chrono::{DateTime, Utc};
use serde::Serialize;

use super::issue::{Issue, ProjectKey};

/// One stand-up window. `end_time` is `None` while the stand-up is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standup {
    pub id: i64,
    pub project_key: ProjectKey,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Standup {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

/// A freshly started stand-up together with what changed since the last one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandupStarted {
    pub standup: Standup,
    /// End of the previous stand-up; `None` on the first one.
    pub since: Option<DateTime<Utc>>,
    pub changed_issues: Vec<Issue>,
}
