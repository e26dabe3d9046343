use anyhow::Result;
use clap::ArgMatches;
use issuetrack_core::{domain::SprintPayload, store::SprintOps, Store};
use serde_json::json;

use super::{optional, required, required_id, resolve_issue, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub_m)) => {
            let payload = SprintPayload {
                name: optional(sub_m, "name"),
                description: optional(sub_m, "description"),
                start_date: optional(sub_m, "start"),
                end_date: optional(sub_m, "end"),
                project_key: optional(sub_m, "project"),
            };
            print_json(&store.create_sprint(&payload).await?)
        }
        Some(("get", sub_m)) => print_json(&store.get_sprint(required_id(sub_m, "sprint")?).await?),
        Some(("add-issue", sub_m)) => {
            let sprint_id = required_id(sub_m, "sprint")?;
            let issue = resolve_issue(store, required(sub_m, "issue")?).await?;
            store.add_issue_to_sprint(issue.id, sprint_id).await?;
            print_json(&json!({ "sprintId": sprint_id, "issueKey": issue.key }))
        }
        Some(("issues", sub_m)) => {
            print_json(&store.issues_in_sprint(required_id(sub_m, "sprint")?).await?)
        }
        _ => Err(unknown_subcommand("sprint", matches)),
    }
}
