use anyhow::Result;
use clap::ArgMatches;
use issuetrack_core::{MetricsOps, Store};
use serde_json::json;

use super::{project_key, unknown_subcommand};
use crate::output::print_json;

pub async fn handle(matches: &ArgMatches, store: &Store) -> Result<()> {
    match matches.subcommand() {
        Some(("cycle-time", sub_m)) => {
            print_json(&store.average_cycle_time(&project_key(sub_m)?).await?)
        }
        Some(("throughput", sub_m)) => {
            let key = project_key(sub_m)?;
            let weeks = store.weekly_throughput(&key).await?;
            print_json(&json!({
                "projectKey": key,
                "total": weeks.values().sum::<u64>(),
                "weeks": weeks,
            }))
        }
        _ => Err(unknown_subcommand("metrics", matches)),
    }
}
