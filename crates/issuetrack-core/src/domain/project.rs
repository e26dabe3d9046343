use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{issue::ProjectKey, validation::Violations};
use crate::Result;

/// A project owns issues, stand-ups and sprints, and caps its work in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub project_lead: String,
    pub project_key: ProjectKey,
    /// Maximum number of issues allowed in `in_progress` at once.
    pub wip_limit: u32,
    /// Issues ever created in this project; the last issue key's sequence.
    pub issue_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub project_lead: String,
    pub project_key: ProjectKey,
    pub wip_limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub project_lead: Option<String>,
    pub project_key: Option<String>,
    pub wip_limit: Option<u32>,
}

/// A WIP limit of zero would make `in_progress` unreachable.
pub(crate) fn check_wip_limit(v: &mut Violations, limit: u32) {
    if limit == 0 {
        v.push("wipLimit", "must be at least 1");
    }
}

impl ProjectPayload {
    /// Validate, falling back to `default_wip_limit` when none is given.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` listing each violated field.
    pub fn validate(&self, default_wip_limit: u32) -> Result<NewProject> {
        let mut v = Violations::new();
        let name = v.require("name", self.name.as_deref());
        let description = self
            .description
            .as_deref()
            .map_or_else(String::new, |d| d.trim().to_string());
        let project_lead = v.require("projectLead", self.project_lead.as_deref());
        let project_key = v
            .require("projectKey", self.project_key.as_deref())
            .and_then(|key| v.check("projectKey", ProjectKey::new(key)));
        let wip_limit = self.wip_limit.unwrap_or(default_wip_limit);
        check_wip_limit(&mut v, wip_limit);
        v.finish()?;

        match (name, project_lead, project_key) {
            (Some(name), Some(project_lead), Some(project_key)) => Ok(NewProject {
                name,
                description,
                project_lead,
                project_key,
                wip_limit,
            }),
            _ => Err(crate::Error::invalid_field("payload", "is incomplete")),
        }
    }
}
