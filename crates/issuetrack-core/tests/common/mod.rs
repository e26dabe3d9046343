//! Shared setup for integration tests: a file-backed store with a real
//! multi-connection pool, so transactions actually contend.

#![allow(dead_code)]

use issuetrack_core::{
    Config, IssueCreate, IssueId, IssueOps, IssueUpdate, ProjectKey, ProjectOps, ProjectPayload,
    Result, Store,
};
use tempfile::TempDir;

pub struct TestContext {
    _temp_dir: TempDir,
    pub store: Store,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let config = Config {
            database_url: format!("sqlite:{}", temp_dir.path().join("tracker.db").display()),
            max_connections: 8,
            busy_timeout_ms: 10_000,
            ..Config::default()
        };
        let store = Store::connect(&config).await?;
        Ok(Self {
            _temp_dir: temp_dir,
            store,
        })
    }

    pub async fn project(&self, key: &str, wip_limit: u32) -> Result<ProjectKey> {
        let project = self
            .store
            .create_project(&ProjectPayload {
                name: Some(format!("Project {key}")),
                description: Some(String::new()),
                project_lead: Some("lead".into()),
                project_key: Some(key.into()),
                wip_limit: Some(wip_limit),
            })
            .await?;
        Ok(project.project_key)
    }

    pub async fn issue(&self, key: &ProjectKey, summary: &str) -> Result<IssueId> {
        let issue = self
            .store
            .create_issue(&IssueCreate {
                summary: Some(summary.into()),
                description: Some(format!("{summary} details")),
                project_key: Some(key.to_string()),
                reporter: Some("ana".into()),
                assignee: Some("bo".into()),
                status: Some("open".into()),
                issue_type: Some("task".into()),
            })
            .await?;
        Ok(issue.id)
    }
}

pub fn status(value: &str) -> IssueUpdate {
    IssueUpdate {
        status: Some(value.into()),
        ..IssueUpdate::default()
    }
}
