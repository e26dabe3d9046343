use anyhow::Result;
use clap::ArgMatches;
use issuetrack_core::{
    domain::UserPayload,
    store::{AssignmentOps, ProjectOps, UserOps},
    Store,
};
use serde_json::json;

use super::{optional, project_key, required, required_id, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub_m)) => {
            let payload = UserPayload {
                first_name: optional(sub_m, "first-name"),
                last_name: optional(sub_m, "last-name"),
                email: optional(sub_m, "email"),
            };
            print_json(&store.create_user(&payload).await?)
        }
        Some(("get", sub_m)) => {
            let reference = required(sub_m, "user")?;
            let user = match reference.parse::<i64>() {
                Ok(id) => store.get_user_by_id(id).await?,
                Err(_) => store.get_user_by_email(reference).await?,
            };
            print_json(&user)
        }
        Some(("list", _)) => print_json(&store.list_users().await?),
        _ => Err(unknown_subcommand("user", matches)),
    }
}

/// Project membership, addressed by project key.
pub async fn handle_assign(matches: &ArgMatches, store: &Store) -> Result<()> {
    let Some((name, sub_m)) = matches.subcommand() else {
        return Err(unknown_subcommand("assign", matches));
    };
    let project = store.get_project_by_key(&project_key(sub_m)?).await?;

    match name {
        "add" => {
            let user_id = required_id(sub_m, "user")?;
            let role = required(sub_m, "role")?;
            print_json(&store.assign_user(project.id, user_id, role).await?)
        }
        "remove" => {
            let user_id = required_id(sub_m, "user")?;
            let removed = store.remove_user(project.id, user_id).await?;
            print_json(&json!({
                "projectKey": project.project_key,
                "userId": user_id,
                "removed": removed,
            }))
        }
        "list" => print_json(&store.users_for_project(project.id).await?),
        _ => Err(unknown_subcommand("assign", matches)),
    }
}
