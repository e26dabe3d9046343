//! Command dispatch against a temporary database file.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use issuetrack::cli::{build_cli, handlers::dispatch};
use issuetrack_core::{
    Config, Error, IssueOps, IssueStatus, ProjectKey, ProjectOps, StandupOps, Store,
};
use tempfile::TempDir;

fn config(dir: &TempDir) -> Config {
    Config {
        database_url: format!("sqlite:{}", dir.path().join("cli.db").display()),
        ..Config::default()
    }
}

async fn run(config: &Config, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["issuetrack"];
    argv.extend_from_slice(args);
    let matches = build_cli().try_get_matches_from(argv)?;
    dispatch(&matches, config).await
}

async fn seed(config: &Config) -> anyhow::Result<()> {
    run(
        config,
        &[
            "project", "create", "--name", "Platform", "--description", "core services", "--lead",
            "ana", "--key", "PRJ", "--wip-limit", "1",
        ],
    )
    .await?;
    for summary in ["first", "second"] {
        run(
            config,
            &[
                "issue", "create", "--project", "PRJ", "--summary", summary, "--description",
                "details", "--reporter", "ana", "--assignee", "bo", "--type", "task", "--status",
                "open",
            ],
        )
        .await?;
    }
    Ok(())
}

#[tokio::test]
async fn issue_commands_drive_the_lifecycle() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(&dir);
    seed(&config).await?;

    run(&config, &["issue", "update", "PRJ-001", "--status", "in_progress"]).await?;
    let err = run(&config, &["issue", "update", "2", "--status", "in_progress"])
        .await
        .unwrap_err();
    let core = err.downcast_ref::<Error>().expect("core error survives dispatch");
    assert!(matches!(core, Error::WipLimitExceeded { limit: 1, .. }));
    assert_eq!(core.exit_code(), 1);

    run(&config, &["issue", "update", "PRJ-001", "--status", "resolved"]).await?;

    let store = Store::connect(&config).await?;
    let key = ProjectKey::new("PRJ")?;
    let issues = store.get_issues_by_project(&key).await?;
    assert_eq!(issues[0].status, IssueStatus::Resolved);
    assert!(issues[0].cycle_time().is_some());
    assert_eq!(issues[1].status, IssueStatus::Open);
    assert_eq!(store.get_project_by_key(&key).await?.wip_limit, 1);
    store.close().await;
    Ok(())
}

#[tokio::test]
async fn incomplete_issue_reports_every_missing_field() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(&dir);
    seed(&config).await?;

    let err = run(&config, &["issue", "create", "--project", "PRJ", "--summary", "half"])
        .await
        .unwrap_err();
    let fields: Vec<&str> = err
        .downcast_ref::<Error>()
        .unwrap()
        .violations()
        .iter()
        .map(|v| v.field.as_str())
        .collect();
    for field in ["description", "reporter", "assignee", "status", "issueType"] {
        assert!(fields.contains(&field), "{field} missing from {fields:?}");
    }
    Ok(())
}

#[tokio::test]
async fn update_without_fields_is_rejected_before_touching_the_store() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(&dir);
    seed(&config).await?;

    let err = run(&config, &["issue", "update", "PRJ-001"]).await.unwrap_err();
    assert!(err.downcast_ref::<Error>().is_none());
    assert!(err.to_string().contains("nothing to update"));
    Ok(())
}

#[tokio::test]
async fn standup_commands_share_the_store() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(&dir);
    seed(&config).await?;

    run(&config, &["standup", "start", "PRJ"]).await?;
    let again = run(&config, &["standup", "start", "PRJ"]).await.unwrap_err();
    assert!(matches!(again.downcast_ref::<Error>(), Some(Error::Conflict(_))));

    run(&config, &["standup", "end", "PRJ"]).await?;
    run(&config, &["standup", "delta", "PRJ"]).await?;

    let store = Store::connect(&config).await?;
    let key = ProjectKey::new("PRJ")?;
    assert!(store.get_active_standup(&key).await?.is_none());
    assert!(store.get_last_standup_end_time(&key).await?.is_some());
    store.close().await;
    Ok(())
}

#[tokio::test]
async fn metrics_without_resolved_issues_exit_as_not_found() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(&dir);
    seed(&config).await?;

    let err = run(&config, &["metrics", "cycle-time", "PRJ"]).await.unwrap_err();
    assert_eq!(err.downcast_ref::<Error>().map(Error::exit_code), Some(3));
    run(&config, &["metrics", "throughput", "PRJ"]).await?;
    Ok(())
}
