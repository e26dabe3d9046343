use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{issue::ProjectKey, validation::Violations};
use crate::Result;

/// A named grouping of projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub project_keys: Vec<ProjectKey>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScope {
    pub name: String,
    pub description: String,
    /// Deduplicated, in first-seen order.
    pub project_keys: Vec<ProjectKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub project_keys: Vec<String>,
}

impl ScopePayload {
    /// # Errors
    ///
    /// Returns `Error::Validation` listing each violated field.
    pub fn validate(&self) -> Result<NewScope> {
        let mut v = Violations::new();
        let name = v.require("name", self.name.as_deref());
        let description = self
            .description
            .as_deref()
            .map_or_else(String::new, |d| d.trim().to_string());
        let project_keys: Vec<ProjectKey> = self
            .project_keys
            .iter()
            .filter_map(|key| v.check("projectKeys", ProjectKey::new(key.as_str())))
            .unique()
            .collect();
        v.finish()?;

        name.map(|name| NewScope {
            name,
            description,
            project_keys,
        })
        .ok_or_else(|| crate::Error::invalid_field("payload", "is incomplete"))
    }
}
