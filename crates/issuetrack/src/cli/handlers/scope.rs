use anyhow::Result;
use clap::ArgMatches;
use issuetrack_core::{domain::ScopePayload, store::ScopeOps, Store};

use super::{optional, project_key, required_id, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub_m)) => {
            let payload = ScopePayload {
                name: optional(sub_m, "name"),
                description: optional(sub_m, "description"),
                project_keys: sub_m
                    .get_many::<String>("project")
                    .map(|keys| keys.cloned().collect())
                    .unwrap_or_default(),
            };
            print_json(&store.create_scope(&payload).await?)
        }
        Some(("get", sub_m)) => print_json(&store.get_scope(required_id(sub_m, "scope")?).await?),
        Some(("add-project", sub_m)) => {
            let scope_id = required_id(sub_m, "scope")?;
            print_json(&store.add_project_to_scope(scope_id, &project_key(sub_m)?).await?)
        }
        Some(("issues", sub_m)) => {
            print_json(&store.issues_for_scope(required_id(sub_m, "scope")?).await?)
        }
        _ => Err(unknown_subcommand("scope", matches)),
    }
}
