//! Work-in-progress limit guard.
//!
//! The guard only runs when an issue enters `in_progress`. It must be called
//! inside the same transaction as the write that follows it, after that
//! transaction has taken the write lock.

use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::warn;

use crate::{domain::ProjectKey, Error, Result};

/// A project's WIP limit and how much of it is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WipUsage {
    pub limit: u32,
    pub in_progress: u32,
}

impl WipUsage {
    #[must_use]
    pub const fn has_capacity(self) -> bool {
        self.in_progress < self.limit
    }

    #[must_use]
    pub const fn remaining(self) -> u32 {
        self.limit.saturating_sub(self.in_progress)
    }
}

/// Decide whether one more issue may enter `in_progress`.
///
/// # Errors
///
/// Returns `Error::WipLimitExceeded` when `in_progress >= limit`.
pub fn evaluate(project_key: &ProjectKey, usage: WipUsage) -> Result<WipUsage> {
    if usage.has_capacity() {
        Ok(usage)
    } else {
        Err(Error::WipLimitExceeded {
            project_key: project_key.to_string(),
            limit: usage.limit,
        })
    }
}

/// Read a project's limit and current in-progress count.
pub(crate) async fn load_usage<'e, E>(executor: E, project_key: &ProjectKey) -> Result<WipUsage>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT p.wip_limit,
                (SELECT COUNT(*) FROM issues i
                 WHERE i.project_key = p.project_key AND i.status = 'in_progress')
         FROM projects p WHERE p.project_key = ?",
    )
    .bind(project_key.as_str())
    .fetch_optional(executor)
    .await?;

    let (limit, in_progress) = row.ok_or_else(|| Error::not_found("project", project_key))?;
    let to_u32 = |value: i64, what: &str| {
        u32::try_from(value)
            .map_err(|e| Error::persistence(format!("Invalid stored {what} {value}: {e}")))
    };
    Ok(WipUsage {
        limit: to_u32(limit, "wip_limit")?,
        in_progress: to_u32(in_progress, "in-progress count")?,
    })
}

/// Run the guard inside `tx`.
///
/// # Errors
///
/// Returns `Error::WipLimitExceeded` when the project is at its limit and
/// `Error::NotFound` when the project does not exist.
pub(crate) async fn ensure_capacity(
    tx: &mut Transaction<'_, Sqlite>,
    project_key: &ProjectKey,
) -> Result<WipUsage> {
    let usage = load_usage(&mut **tx, project_key).await?;
    evaluate(project_key, usage).inspect_err(|_| {
        warn!(
            project_key = %project_key,
            limit = usage.limit,
            in_progress = usage.in_progress,
            "WIP limit reached, rejecting transition into in_progress"
        );
    })
}
