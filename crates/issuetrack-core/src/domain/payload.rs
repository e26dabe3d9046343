//! Inbound issue payloads.
//!
//! Payloads arrive already deserialized, with every field optional, so that
//! validation can report all problems at once rather than failing in serde on
//! the first missing key.

use serde::Deserialize;

use super::{
    issue::{Issue, NewIssue, ProjectKey},
    status::IssueStatus,
    validation::Violations,
};
use crate::Result;

/// Creation payload. Every field is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub project_key: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub issue_type: Option<String>,
}

impl IssueCreate {
    /// Validate the payload, reporting every missing or invalid field.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` listing each violated field.
    pub fn validate(&self) -> Result<NewIssue> {
        let mut v = Violations::new();
        let summary = v.require("summary", self.summary.as_deref());
        let description = v.require("description", self.description.as_deref());
        let project_key = v
            .require("projectKey", self.project_key.as_deref())
            .and_then(|key| v.check("projectKey", ProjectKey::new(key)));
        let reporter = v.require("reporter", self.reporter.as_deref());
        let assignee = v.require("assignee", self.assignee.as_deref());
        let status = v.require_parsed::<IssueStatus>(
            "status",
            self.status.as_deref(),
            IssueStatus::EXPECTED,
        );
        let issue_type = v.require("issueType", self.issue_type.as_deref());
        v.finish()?;

        match (
            summary,
            description,
            project_key,
            reporter,
            assignee,
            status,
            issue_type,
        ) {
            (
                Some(summary),
                Some(description),
                Some(project_key),
                Some(reporter),
                Some(assignee),
                Some(status),
                Some(issue_type),
            ) => Ok(NewIssue {
                summary,
                description,
                project_key,
                reporter,
                assignee,
                status,
                issue_type,
            }),
            // every None above recorded a violation, so finish() already returned
            _ => Err(crate::Error::invalid_field("payload", "is incomplete")),
        }
    }
}

/// Sparse update payload: only present fields overwrite the stored issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub project_key: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub issue_type: Option<String>,
}

impl IssueUpdate {
    /// True when the payload carries no fields at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.project_key.is_none()
            && self.reporter.is_none()
            && self.assignee.is_none()
            && self.status.is_none()
            && self.issue_type.is_none()
    }

    /// Merge the present fields onto `existing`.
    ///
    /// Timestamps are left alone; the lifecycle engine owns them. Issues
    /// cannot move between projects, so a different `projectKey` is rejected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` listing each violated field.
    pub fn apply_to(&self, existing: &Issue) -> Result<Issue> {
        let mut v = Violations::new();
        let summary = v.non_blank("summary", self.summary.as_deref());
        let description = v.non_blank("description", self.description.as_deref());
        let reporter = v.non_blank("reporter", self.reporter.as_deref());
        let assignee = v.non_blank("assignee", self.assignee.as_deref());
        let issue_type = v.non_blank("issueType", self.issue_type.as_deref());
        let status =
            v.parsed::<IssueStatus>("status", self.status.as_deref(), IssueStatus::EXPECTED);
        if let Some(key) = v.non_blank("projectKey", self.project_key.as_deref()) {
            if key != existing.project_key.as_str() {
                v.push("projectKey", "cannot be changed once the issue exists");
            }
        }
        v.finish()?;

        Ok(Issue {
            summary: summary.unwrap_or_else(|| existing.summary.clone()),
            description: description.unwrap_or_else(|| existing.description.clone()),
            reporter: reporter.unwrap_or_else(|| existing.reporter.clone()),
            assignee: assignee.unwrap_or_else(|| existing.assignee.clone()),
            issue_type: issue_type.unwrap_or_else(|| existing.issue_type.clone()),
            status: status.unwrap_or(existing.status),
            ..existing.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        domain::{IssueId, IssueKey},
        Error,
    };

    fn full_create() -> IssueCreate {
        IssueCreate {
            summary: Some("Login fails".into()),
            description: Some("500 on submit".into()),
            project_key: Some("PRJ".into()),
            reporter: Some("ana".into()),
            assignee: Some("bo".into()),
            status: Some("open".into()),
            issue_type: Some("bug".into()),
        }
    }

    fn field_names(err: &Error) -> Vec<&str> {
        err.violations().iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn test_validate_complete_payload() -> Result<()> {
        let issue = full_create().validate()?;
        assert_eq!(issue.project_key.as_str(), "PRJ");
        assert_eq!(issue.status, IssueStatus::Open);
        Ok(())
    }

    #[test]
    fn test_validate_lists_every_missing_field() {
        let err = IssueCreate::default().validate().err();
        let err = err.as_ref();
        assert_eq!(
            err.map(field_names).unwrap_or_default(),
            vec![
                "summary",
                "description",
                "projectKey",
                "reporter",
                "assignee",
                "status",
                "issueType"
            ]
        );
    }

    #[test]
    fn test_validate_rejects_unknown_status_and_bad_key() {
        let payload = IssueCreate {
            status: Some("done".into()),
            project_key: Some("P R J".into()),
            ..full_create()
        };
        let err = payload.validate().err();
        assert_eq!(
            err.as_ref().map(field_names).unwrap_or_default(),
            vec!["projectKey", "status"]
        );
    }

    #[test]
    fn test_create_payload_deserializes_camel_case() -> Result<()> {
        let payload: IssueCreate = serde_json::from_str(
            r#"{"summary":"s","projectKey":"PRJ","issueType":"task"}"#,
        )?;
        assert_eq!(payload.project_key.as_deref(), Some("PRJ"));
        assert_eq!(payload.issue_type.as_deref(), Some("task"));
        assert!(payload.reporter.is_none());
        Ok(())
    }

    fn existing() -> Result<Issue> {
        let new = full_create().validate()?;
        let now = Utc::now();
        Ok(Issue {
            id: IssueId(7),
            key: IssueKey::new(&new.project_key, 7),
            summary: new.summary,
            description: new.description,
            project_key: new.project_key,
            reporter: new.reporter,
            assignee: new.assignee,
            status: new.status,
            issue_type: new.issue_type,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        })
    }

    #[test]
    fn test_update_overwrites_only_present_fields() -> Result<()> {
        let base = existing()?;
        let update = IssueUpdate {
            assignee: Some("cy".into()),
            status: Some("in_progress".into()),
            ..IssueUpdate::default()
        };
        let merged = update.apply_to(&base)?;
        assert_eq!(merged.assignee, "cy");
        assert_eq!(merged.status, IssueStatus::InProgress);
        assert_eq!(merged.summary, base.summary);
        assert_eq!(merged.key, base.key);
        assert_eq!(merged.created_at, base.created_at);
        Ok(())
    }

    #[test]
    fn test_empty_update_is_identity() -> Result<()> {
        let base = existing()?;
        assert!(IssueUpdate::default().is_empty());
        assert_eq!(IssueUpdate::default().apply_to(&base)?, base);
        Ok(())
    }

    #[test]
    fn test_update_rejects_project_move_and_blank_fields() -> Result<()> {
        let base = existing()?;
        let update = IssueUpdate {
            summary: Some(" ".into()),
            project_key: Some("OTHER".into()),
            ..IssueUpdate::default()
        };
        let err = update.apply_to(&base).err();
        assert_eq!(
            err.as_ref().map(field_names).unwrap_or_default(),
            vec!["summary", "projectKey"]
        );

        let same_project = IssueUpdate {
            project_key: Some("PRJ".into()),
            ..IssueUpdate::default()
        };
        assert!(same_project.apply_to(&base).is_ok());
        Ok(())
    }
}
