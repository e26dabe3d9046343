use anyhow::Result;
use clap::ArgMatches;
use issuetrack_core::{ProjectKey, ProjectOps, ProjectPayload, Store};
use serde_json::json;

use super::{optional, project_key, required, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub_m)) => {
            let payload = ProjectPayload {
                name: optional(sub_m, "name"),
                description: optional(sub_m, "description"),
                project_lead: optional(sub_m, "lead"),
                project_key: optional(sub_m, "key"),
                wip_limit: sub_m.get_one::<u32>("wip-limit").copied(),
            };
            print_json(&store.create_project(&payload).await?)
        }
        Some(("get", sub_m)) => {
            let project = if sub_m.get_flag("by-name") {
                store.get_project_by_name(required(sub_m, "project")?).await?
            } else {
                store.get_project_by_key(&project_key(sub_m)?).await?
            };
            print_json(&project)
        }
        Some(("list", _)) => print_json(&store.list_projects().await?),
        Some(("set-wip", sub_m)) => {
            let key: ProjectKey = project_key(sub_m)?;
            let limit = sub_m.get_one::<u32>("limit").copied().unwrap_or_default();
            print_json(&store.set_wip_limit(&key, limit).await?)
        }
        Some(("wip", sub_m)) => {
            let key = project_key(sub_m)?;
            let usage = store.wip_usage(&key).await?;
            print_json(&json!({
                "projectKey": key,
                "limit": usage.limit,
                "inProgress": usage.in_progress,
                "remaining": usage.remaining(),
                "hasCapacity": usage.has_capacity(),
            }))
        }
        _ => Err(unknown_subcommand("project", matches)),
    }
}
