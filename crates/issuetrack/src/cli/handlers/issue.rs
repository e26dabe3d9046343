use anyhow::{bail, Result};
use clap::ArgMatches;
use issuetrack_core::{IssueCreate, IssueOps, IssueUpdate, Store};

use super::{json_payload, optional, project_key, required, resolve_issue, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub_m)) => {
            let payload = create_payload(sub_m)?;
            print_json(&store.create_issue(&payload).await?)
        }
        Some(("get", sub_m)) => {
            print_json(&resolve_issue(store, required(sub_m, "issue")?).await?)
        }
        Some(("list", sub_m)) => {
            print_json(&store.get_issues_by_project(&project_key(sub_m)?).await?)
        }
        Some(("update", sub_m)) => {
            let update = update_payload(sub_m)?;
            if update.is_empty() {
                bail!("nothing to update: pass at least one field flag or --json");
            }
            let issue = resolve_issue(store, required(sub_m, "issue")?).await?;
            print_json(&store.update_issue_fields(issue.id, &update).await?)
        }
        _ => Err(unknown_subcommand("issue", matches)),
    }
}

fn create_payload(matches: &ArgMatches) -> Result<IssueCreate> {
    let base: IssueCreate = json_payload(matches)?;
    Ok(IssueCreate {
        summary: optional(matches, "summary").or(base.summary),
        description: optional(matches, "description").or(base.description),
        project_key: optional(matches, "project").or(base.project_key),
        reporter: optional(matches, "reporter").or(base.reporter),
        assignee: optional(matches, "assignee").or(base.assignee),
        status: optional(matches, "status").or(base.status),
        issue_type: optional(matches, "type").or(base.issue_type),
    })
}

fn update_payload(matches: &ArgMatches) -> Result<IssueUpdate> {
    let base: IssueUpdate = json_payload(matches)?;
    Ok(IssueUpdate {
        summary: optional(matches, "summary").or(base.summary),
        description: optional(matches, "description").or(base.description),
        project_key: base.project_key,
        reporter: optional(matches, "reporter").or(base.reporter),
        assignee: optional(matches, "assignee").or(base.assignee),
        status: optional(matches, "status").or(base.status),
        issue_type: optional(matches, "type").or(base.issue_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_cli;

    fn sub_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["issuetrack", "issue"];
        argv.extend_from_slice(args);
        let matches = build_cli().try_get_matches_from(argv).unwrap();
        let (_, issue) = matches.subcommand().unwrap();
        issue.subcommand().unwrap().1.clone()
    }

    #[test]
    fn test_flags_override_json_payload() {
        let m = sub_matches(&[
            "create",
            "--json",
            r#"{"summary":"from json","projectKey":"PRJ","issueType":"bug"}"#,
            "--summary",
            "from flag",
        ]);
        let payload = create_payload(&m).unwrap();
        assert_eq!(payload.summary.as_deref(), Some("from flag"));
        assert_eq!(payload.project_key.as_deref(), Some("PRJ"));
        assert_eq!(payload.issue_type.as_deref(), Some("bug"));
        assert_eq!(payload.reporter, None);
    }

    #[test]
    fn test_update_without_fields_is_empty() {
        let m = sub_matches(&["update", "PRJ-001"]);
        assert!(update_payload(&m).unwrap().is_empty());

        let m = sub_matches(&["update", "PRJ-001", "--assignee", "bo"]);
        let update = update_payload(&m).unwrap();
        assert!(!update.is_empty());
        assert_eq!(update.assignee.as_deref(), Some("bo"));
    }
}
