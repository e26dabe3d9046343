use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use issuetrack_core::{Error, StandupOps, Store};
use serde_json::json;

use super::{project_key, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("start", sub_m)) => print_json(&store.start_standup(&project_key(sub_m)?).await?),
        Some(("end", sub_m)) => {
            print_json(&store.end_current_standup(&project_key(sub_m)?).await?)
        }
        Some(("active", sub_m)) => {
            print_json(&store.get_active_standup(&project_key(sub_m)?).await?)
        }
        Some(("last", sub_m)) => {
            let key = project_key(sub_m)?;
            let ended = store.get_last_standup_end_time(&key).await?;
            print_json(&json!({ "projectKey": key, "lastEndTime": ended }))
        }
        Some(("delta", sub_m)) => {
            let key = project_key(sub_m)?;
            let since = match sub_m.get_one::<String>("since") {
                Some(raw) => Some(parse_since(raw)?),
                None => store.get_last_standup_end_time(&key).await?,
            };
            let issues = store.filter_tickets_by_end_time(&key, since).await?;
            print_json(&json!({ "projectKey": key, "since": since, "issues": issues }))
        }
        _ => Err(unknown_subcommand("standup", matches)),
    }
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::invalid_field("since", format!("expected an RFC3339 timestamp: {e}")))
}
