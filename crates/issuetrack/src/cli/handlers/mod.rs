mod issue;
mod metrics;
mod project;
mod scope;
mod sprint;
mod standup;
mod user;

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use issuetrack_core::{Config, Issue, IssueId, IssueOps, ProjectKey, Store};
use serde::de::DeserializeOwned;

/// Open the store named by `config` and run the selected command.
pub async fn dispatch(matches: &ArgMatches, config: &Config) -> Result<()> {
    let Some((name, sub_m)) = matches.subcommand() else {
        anyhow::bail!("Unknown command. Run 'issuetrack --help' for usage.");
    };

    let store = Store::connect(config).await?;
    tracing::debug!(command = name, "dispatching");

    let result = match name {
        "project" => project::handle(sub_m, &store).await,
        "issue" => issue::handle(sub_m, &store).await,
        "metrics" => metrics::handle(sub_m, &store).await,
        "standup" => standup::handle(sub_m, &store).await,
        "sprint" => sprint::handle(sub_m, &store).await,
        "scope" => scope::handle(sub_m, &store).await,
        "user" => user::handle(sub_m, &store).await,
        "assign" => user::handle_assign(sub_m, &store).await,
        _ => Err(anyhow!("Unknown command '{name}'. Run 'issuetrack --help' for usage.")),
    };

    store.close().await;
    result
}

fn unknown_subcommand(group: &str, matches: &ArgMatches) -> anyhow::Error {
    let name = matches.subcommand_name().unwrap_or("");
    anyhow!("Unknown {group} subcommand '{name}'. Run 'issuetrack {group} --help' for usage.")
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument <{name}>"))
}

fn optional(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn required_id(matches: &ArgMatches, name: &str) -> Result<i64> {
    matches
        .get_one::<i64>(name)
        .copied()
        .ok_or_else(|| anyhow!("missing argument <{name}>"))
}

fn project_key(matches: &ArgMatches) -> Result<ProjectKey> {
    Ok(required(matches, "project")?.parse::<ProjectKey>()?)
}

/// Base payload from `--json`, or the type's empty default.
fn json_payload<T: DeserializeOwned + Default>(matches: &ArgMatches) -> Result<T> {
    match matches.get_one::<String>("json") {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| anyhow::Error::new(issuetrack_core::Error::Parse(format!("--json: {e}")))),
        None => Ok(T::default()),
    }
}

/// Resolve `ISSUE` as a numeric id or an issue key.
async fn resolve_issue(store: &Store, reference: &str) -> Result<Issue> {
    let issue = match reference.parse::<IssueId>() {
        Ok(id) => store.get_issue_by_id(id).await?,
        Err(_) => store.get_issue_by_key(reference).await?,
    };
    Ok(issue)
}
