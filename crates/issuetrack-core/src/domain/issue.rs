//! The issue record and its identifiers.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::{duration::Elapsed, status::IssueStatus, validation::Violations};
use crate::{Error, Result};

/// Store-assigned numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub i64);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IssueId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(Self)
            .ok_or_else(|| {
                Error::invalid_field("id", format!("must be a positive integer (got '{s}')"))
            })
    }
}

/// Short project identifier such as `PRJ`, used as the prefix of issue keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectKey(String);

impl ProjectKey {
    pub const MAX_LEN: usize = 32;

    /// Validate a project key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the key is empty, longer than
    /// [`Self::MAX_LEN`] or contains anything other than ASCII letters,
    /// digits, `-` and `_`.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_field("projectKey", "is required"));
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(Error::invalid_field(
                "projectKey",
                format!("must be at most {} characters", Self::MAX_LEN),
            ));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_field(
                "projectKey",
                "may only contain letters, digits, '-' and '_'",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProjectKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ProjectKey> for String {
    fn from(key: ProjectKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ProjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Human-readable issue key, `<PROJECT_KEY>-<sequence>` with the sequence
/// zero-padded to three digits (`PRJ-003`, `PRJ-1024`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    #[must_use]
    pub fn new(project: &ProjectKey, sequence: i64) -> Self {
        Self(format!("{project}-{sequence:03}"))
    }

    /// Wrap a key read back from the store.
    pub(crate) const fn from_stored(key: String) -> Self {
        Self(key)
    }

    /// The numeric suffix, when it parses.
    #[must_use]
    pub fn sequence(&self) -> Option<i64> {
        self.0.rsplit_once('-').and_then(|(_, seq)| seq.parse().ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted issue.
///
/// `cycle_time` is not stored; it is derived from `started_at` and
/// `finished_at` whenever the issue is read or serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: IssueId,
    pub key: IssueKey,
    pub summary: String,
    pub description: String,
    pub project_key: ProjectKey,
    pub reporter: String,
    pub assignee: String,
    pub status: IssueStatus,
    pub issue_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// `finished_at - started_at`, present only when both are set.
    #[must_use]
    pub fn cycle_time(&self) -> Option<Duration> {
        self.started_at
            .zip(self.finished_at)
            .map(|(started, finished)| finished - started)
    }

    /// Check the free-text fields of a record handed in for update.
    pub(crate) fn check_fields(&self) -> Result<()> {
        let mut violations = Violations::new();
        for (field, value) in [
            ("summary", &self.summary),
            ("description", &self.description),
            ("reporter", &self.reporter),
            ("assignee", &self.assignee),
            ("issueType", &self.issue_type),
        ] {
            if value.trim().is_empty() {
                violations.push(field, "is required");
            }
        }
        violations.finish()
    }
}

impl Serialize for Issue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Issue", 14)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("summary", &self.summary)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("projectKey", &self.project_key)?;
        state.serialize_field("reporter", &self.reporter)?;
        state.serialize_field("assignee", &self.assignee)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("issueType", &self.issue_type)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("updatedAt", &self.updated_at)?;
        state.serialize_field("startedAt", &self.started_at)?;
        state.serialize_field("finishedAt", &self.finished_at)?;
        state.serialize_field("cycleTime", &self.cycle_time().map(Elapsed))?;
        state.end()
    }
}

/// A validated creation payload. Identity and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    pub project_key: ProjectKey,
    pub reporter: String,
    pub assignee: String,
    pub status: IssueStatus,
    pub issue_type: String,
}
