//! Cycle time and throughput aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    domain::{format_duration, Elapsed, ProjectKey},
    store::{rows::parse_timestamp, PoolAccess},
    Error, Result,
};

/// Mean cycle time over a project's completed issues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleTimeSummary {
    pub project_key: ProjectKey,
    pub average_seconds: f64,
    /// Human-readable form of the average, e.g. `1h2m3.5s`.
    pub average_duration: String,
    /// Number of issues averaged over.
    pub sample_size: usize,
}

#[allow(async_fn_in_trait)]
pub trait MetricsOps: PoolAccess {
    /// Average of `finished_at - started_at` over issues that have both.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoCompletedIssues` when no issue qualifies, including
    /// for an unknown project.
    async fn average_cycle_time(&self, key: &ProjectKey) -> Result<CycleTimeSummary> {
        let cycle_times = load_cycle_times(self.pool(), key).await?;
        summarize(key, &cycle_times)
    }

    /// Resolved-issue counts keyed by ISO week of `finished_at` (`2024-W09`).
    /// Empty when nothing is resolved.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or a stored timestamp is corrupt.
    async fn weekly_throughput(&self, key: &ProjectKey) -> Result<BTreeMap<String, u64>> {
        let finished: Vec<String> = sqlx::query_scalar(
            "SELECT finished_at FROM issues
             WHERE project_key = ? AND status = 'resolved' AND finished_at IS NOT NULL",
        )
        .bind(key.as_str())
        .fetch_all(self.pool())
        .await?;

        let finished = finished
            .iter()
            .map(|raw| parse_timestamp("finished_at", raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(bucket_by_iso_week(finished))
    }
}

async fn load_cycle_times(pool: &SqlitePool, key: &ProjectKey) -> Result<Vec<Duration>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT started_at, finished_at FROM issues
         WHERE project_key = ? AND started_at IS NOT NULL AND finished_at IS NOT NULL",
    )
    .bind(key.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|(started, finished)| {
            Ok(parse_timestamp("finished_at", finished)? - parse_timestamp("started_at", started)?)
        })
        .collect()
}

/// Arithmetic mean, exact to the microsecond. `None` for an empty slice.
#[must_use]
pub fn mean_duration(durations: &[Duration]) -> Option<Duration> {
    let count = i128::try_from(durations.len()).ok().filter(|n| *n > 0)?;
    let total: i128 = durations
        .iter()
        .map(|d| i128::from(d.num_microseconds().unwrap_or(i64::MAX)))
        .sum();
    i64::try_from(total / count).ok().map(Duration::microseconds)
}

fn summarize(key: &ProjectKey, cycle_times: &[Duration]) -> Result<CycleTimeSummary> {
    let average = mean_duration(cycle_times).ok_or_else(|| Error::NoCompletedIssues {
        project_key: key.to_string(),
    })?;
    Ok(CycleTimeSummary {
        project_key: key.clone(),
        average_seconds: Elapsed(average).as_seconds_f64(),
        average_duration: format_duration(average),
        sample_size: cycle_times.len(),
    })
}

/// ISO week label, `YYYY-Www`, using the ISO week-numbering year.
#[must_use]
pub fn iso_week_label(ts: DateTime<Utc>) -> String {
    let week = ts.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Count timestamps per ISO week. Labels sort chronologically.
pub fn bucket_by_iso_week(
    finished: impl IntoIterator<Item = DateTime<Utc>>,
) -> BTreeMap<String, u64> {
    finished
        .into_iter()
        .fold(BTreeMap::new(), |mut buckets, ts| {
            *buckets.entry(iso_week_label(ts)).or_insert(0) += 1;
            buckets
        })
}
