//! Issue lifecycle: creation, status transitions and reads.
//!
//! Timestamp rules applied on every write:
//! - `updated_at` is always set to now
//! - entering `in_progress` runs the WIP guard and stamps `started_at`
//! - entering `resolved` stamps `finished_at`
//! - leaving `resolved` (reopen) clears `finished_at`
//!
//! `started_at` is never cleared. Cycle time is derived on read.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument, warn};

use crate::{
    domain::{
        Issue, IssueCreate, IssueId, IssueKey, IssueStatus, IssueUpdate, NewIssue, ProjectKey,
        Transition,
    },
    store::{
        rows::{
            conflict_on_unique, format_timestamp, now, parse_issue_row, parse_rows, ISSUE_COLUMNS,
        },
        PoolAccess,
    },
    wip, Error, Result,
};

#[allow(async_fn_in_trait)]
pub trait IssueOps: PoolAccess {
    /// Validate a payload and create the issue with the project's next key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad payload, `Error::NotFound` for
    /// an unknown project and `Error::WipLimitExceeded` when the issue is
    /// created directly in `in_progress` and the project is at its limit.
    async fn create_issue(&self, payload: &IssueCreate) -> Result<Issue> {
        let new = payload.validate()?;
        insert_issue(self.pool(), new).await
    }

    /// Persist the full record `issue`, applying the lifecycle rules against
    /// the currently stored status. Timestamps on `issue` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound`, `Error::InvalidTransition`,
    /// `Error::WipLimitExceeded` or `Error::Validation` (blank text fields,
    /// changed project key). Nothing is written on error.
    async fn update_issue(&self, issue: &Issue) -> Result<Issue> {
        apply_update(self.pool(), issue.id, |_| Ok(issue.clone())).await
    }

    /// Merge a sparse payload onto the stored issue and update it.
    ///
    /// The merge happens inside the write transaction, so fields absent
    /// from `update` keep whatever the last committed write left there.
    ///
    /// # Errors
    ///
    /// As [`IssueOps::update_issue`].
    async fn update_issue_fields(&self, id: IssueId, update: &IssueUpdate) -> Result<Issue> {
        apply_update(self.pool(), id, |current| update.apply_to(current)).await
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no issue has this id.
    async fn get_issue_by_id(&self, id: IssueId) -> Result<Issue> {
        query_issue(self.pool(), id)
            .await?
            .ok_or_else(|| Error::not_found("issue", id))
    }

    /// Look an issue up by its human-readable key.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no issue has this key.
    async fn get_issue_by_key(&self, key: &str) -> Result<Issue> {
        sqlx::query(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE key = ?"))
            .bind(key)
            .fetch_optional(self.pool())
            .await?
            .map(|row| parse_issue_row(&row))
            .transpose()?
            .ok_or_else(|| Error::not_found("issue", key))
    }

    /// All issues of a project in key order. An unknown project or a project
    /// without issues yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn get_issues_by_project(&self, key: &ProjectKey) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_key = ? ORDER BY id"
        ))
        .bind(key.as_str())
        .fetch_all(self.pool())
        .await?;
        parse_rows(&rows, parse_issue_row)
    }
}

#[instrument(skip(pool, new), fields(project_key = %new.project_key))]
async fn insert_issue(pool: &SqlitePool, new: NewIssue) -> Result<Issue> {
    let mut tx = pool.begin().await?;

    let sequence = next_sequence(&mut tx, &new.project_key).await?;
    let now = now();
    if new.status.is_work_in_progress() {
        wip::ensure_capacity(&mut tx, &new.project_key).await?;
    }

    let key = IssueKey::new(&new.project_key, sequence);
    let started_at = new.status.is_work_in_progress().then_some(now);
    let finished_at = (new.status == IssueStatus::Resolved).then_some(now);

    let id = sqlx::query(
        "INSERT INTO issues (key, summary, description, project_key, reporter, assignee, status,
                             issue_type, created_at, updated_at, started_at, finished_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(key.as_str())
    .bind(&new.summary)
    .bind(&new.description)
    .bind(new.project_key.as_str())
    .bind(&new.reporter)
    .bind(&new.assignee)
    .bind(new.status.to_string())
    .bind(&new.issue_type)
    .bind(format_timestamp(now))
    .bind(format_timestamp(now))
    .bind(started_at.map(format_timestamp))
    .bind(finished_at.map(format_timestamp))
    .execute(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, || format!("issue key '{key}' already exists")))?
    .last_insert_rowid();

    tx.commit().await?;
    info!(issue_id = id, issue_key = %key, status = %new.status, "issue created");

    Ok(Issue {
        id: IssueId(id),
        key,
        summary: new.summary,
        description: new.description,
        project_key: new.project_key,
        reporter: new.reporter,
        assignee: new.assignee,
        status: new.status,
        issue_type: new.issue_type,
        created_at: now,
        updated_at: now,
        started_at,
        finished_at,
    })
}

/// Bump the project's issue counter and return the new value.
///
/// This is the first write of the creation transaction, so concurrent
/// creations in one project serialize here and never share a sequence.
async fn next_sequence(
    tx: &mut Transaction<'_, Sqlite>,
    project_key: &ProjectKey,
) -> Result<i64> {
    sqlx::query_scalar(
        "UPDATE projects SET issue_count = issue_count + 1
         WHERE project_key = ?
         RETURNING issue_count",
    )
    .bind(project_key.as_str())
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::not_found("project", project_key))
}

/// Write the record `merge` builds from the stored issue.
///
/// `merge` sees the row as of the write lock, and `now` is taken after the
/// lock too, so `updated_at` follows commit order.
#[instrument(skip(pool, merge), fields(issue_id = %id))]
async fn apply_update<F>(pool: &SqlitePool, id: IssueId, merge: F) -> Result<Issue>
where
    F: FnOnce(&Issue) -> Result<Issue>,
{
    let mut tx = pool.begin().await?;
    claim_issue(&mut tx, id).await?;
    let now = now();

    let current = fetch_issue(&mut tx, id)
        .await?
        .ok_or_else(|| Error::not_found("issue", id))?;
    let issue = merge(&current)?;
    issue.check_fields()?;

    if issue.project_key != current.project_key {
        return Err(Error::invalid_field(
            "projectKey",
            "cannot be changed once the issue exists",
        ));
    }

    let transition = Transition::new(current.status, issue.status).inspect_err(|e| {
        warn!(issue_key = %current.key, error = %e, "status transition rejected");
    })?;
    if transition.starts_work() {
        wip::ensure_capacity(&mut tx, &current.project_key).await?;
    }

    let (started_at, finished_at) = stamp(transition, &current, now);
    sqlx::query(
        "UPDATE issues
         SET summary = ?, description = ?, reporter = ?, assignee = ?, status = ?,
             issue_type = ?, updated_at = ?, started_at = ?, finished_at = ?
         WHERE id = ?",
    )
    .bind(&issue.summary)
    .bind(&issue.description)
    .bind(&issue.reporter)
    .bind(&issue.assignee)
    .bind(issue.status.to_string())
    .bind(&issue.issue_type)
    .bind(format_timestamp(now))
    .bind(started_at.map(format_timestamp))
    .bind(finished_at.map(format_timestamp))
    .bind(id.0)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if transition.is_noop() {
        info!(issue_key = %current.key, "issue updated");
    } else {
        info!(
            issue_key = %current.key,
            from = %transition.from,
            to = %transition.to,
            "issue status changed"
        );
    }

    Ok(Issue {
        summary: issue.summary,
        description: issue.description,
        reporter: issue.reporter,
        assignee: issue.assignee,
        status: issue.status,
        issue_type: issue.issue_type,
        updated_at: now,
        started_at,
        finished_at,
        ..current
    })
}

/// New `(started_at, finished_at)` for a transition.
fn stamp(
    transition: Transition,
    current: &Issue,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let started_at = if transition.starts_work() {
        Some(now)
    } else {
        current.started_at
    };
    let finished_at = if transition.resolves() {
        Some(now)
    } else if transition.reopens() {
        None
    } else {
        current.finished_at
    };
    (started_at, finished_at)
}

/// Take the write lock through the issue row; `NotFound` if it is missing.
async fn claim_issue(tx: &mut Transaction<'_, Sqlite>, id: IssueId) -> Result<()> {
    let claimed = sqlx::query("UPDATE issues SET id = id WHERE id = ?")
        .bind(id.0)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    if claimed == 0 {
        Err(Error::not_found("issue", id))
    } else {
        Ok(())
    }
}

async fn fetch_issue(tx: &mut Transaction<'_, Sqlite>, id: IssueId) -> Result<Option<Issue>> {
    sqlx::query(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await?
        .map(|row| parse_issue_row(&row))
        .transpose()
}

pub(crate) async fn query_issue(pool: &SqlitePool, id: IssueId) -> Result<Option<Issue>> {
    sqlx::query(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .map(|row| parse_issue_row(&row))
        .transpose()
}
