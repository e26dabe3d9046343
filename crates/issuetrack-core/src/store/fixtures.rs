//! Shared builders for unit tests.

use super::{ProjectOps, Store};
use crate::{
    domain::{IssueCreate, ProjectKey, ProjectPayload},
    Result,
};

pub(crate) fn project_payload(key: &str, wip_limit: Option<u32>) -> ProjectPayload {
    ProjectPayload {
        name: Some(format!("Project {key}")),
        description: Some("test project".into()),
        project_lead: Some("ana".into()),
        project_key: Some(key.into()),
        wip_limit,
    }
}

pub(crate) fn issue_payload(key: &str, summary: &str) -> IssueCreate {
    IssueCreate {
        summary: Some(summary.into()),
        description: Some(format!("{summary} description")),
        project_key: Some(key.into()),
        reporter: Some("ana".into()),
        assignee: Some("bo".into()),
        status: Some("open".into()),
        issue_type: Some("task".into()),
    }
}

/// In-memory store with one project.
pub(crate) async fn store_with_project(key: &str, wip_limit: u32) -> Result<(Store, ProjectKey)> {
    let store = Store::open_in_memory().await?;
    let project = store
        .create_project(&project_payload(key, Some(wip_limit)))
        .await?;
    Ok((store, project.project_key))
}
