//! Sprints and their issue membership.

use sqlx::SqlitePool;
use tracing::info;

use super::{
    claim_project,
    rows::{
        conflict_on_unique, format_timestamp, now, parse_issue_row, parse_rows, parse_sprint_row,
        ISSUE_COLUMNS, SPRINT_COLUMNS,
    },
    PoolAccess,
};
use crate::{
    domain::{Issue, IssueId, NewSprint, Sprint, SprintPayload, DATE_FORMAT},
    issues::query_issue,
    Error, Result,
};

#[allow(async_fn_in_trait)]
pub trait SprintOps: PoolAccess {
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad payload and `Error::NotFound`
    /// for an unknown project.
    async fn create_sprint(&self, payload: &SprintPayload) -> Result<Sprint> {
        let new = payload.validate()?;
        insert_sprint(self.pool(), new).await
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no sprint has this id.
    async fn get_sprint(&self, sprint_id: i64) -> Result<Sprint> {
        query_sprint(self.pool(), sprint_id)
            .await?
            .ok_or_else(|| Error::not_found("sprint", sprint_id))
    }

    /// Put an issue into a sprint of the same project.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if either side is missing,
    /// `Error::Validation` if they belong to different projects and
    /// `Error::Conflict` if the issue is already in the sprint.
    async fn add_issue_to_sprint(&self, issue_id: IssueId, sprint_id: i64) -> Result<()> {
        let sprint = self.get_sprint(sprint_id).await?;
        let issue = query_issue(self.pool(), issue_id)
            .await?
            .ok_or_else(|| Error::not_found("issue", issue_id))?;
        if issue.project_key != sprint.project_key {
            return Err(Error::invalid_field(
                "issueId",
                format!(
                    "issue {} belongs to project {}, sprint {} to project {}",
                    issue.key, issue.project_key, sprint.id, sprint.project_key
                ),
            ));
        }

        sqlx::query("INSERT INTO sprint_issues (sprint_id, issue_id) VALUES (?, ?)")
            .bind(sprint_id)
            .bind(issue_id.0)
            .execute(self.pool())
            .await
            .map_err(|e| {
                conflict_on_unique(e, || {
                    format!("issue {} is already in sprint {sprint_id}", issue.key)
                })
            })?;

        info!(sprint_id, issue_key = %issue.key, "issue added to sprint");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if the sprint does not exist.
    async fn issues_in_sprint(&self, sprint_id: i64) -> Result<Vec<Issue>> {
        self.get_sprint(sprint_id).await?;
        let rows = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
             WHERE id IN (SELECT issue_id FROM sprint_issues WHERE sprint_id = ?)
             ORDER BY id"
        ))
        .bind(sprint_id)
        .fetch_all(self.pool())
        .await?;
        parse_rows(&rows, parse_issue_row)
    }
}

async fn insert_sprint(pool: &SqlitePool, new: NewSprint) -> Result<Sprint> {
    let created_at = now();
    let mut tx = pool.begin().await?;
    claim_project(&mut tx, &new.project_key).await?;

    let id = sqlx::query(
        "INSERT INTO sprints (name, description, start_date, end_date, project_key, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.start_date.format(DATE_FORMAT).to_string())
    .bind(new.end_date.format(DATE_FORMAT).to_string())
    .bind(new.project_key.as_str())
    .bind(format_timestamp(created_at))
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();
    tx.commit().await?;

    info!(sprint_id = id, project_key = %new.project_key, "sprint created");
    Ok(Sprint {
        id,
        name: new.name,
        description: new.description,
        start_date: new.start_date,
        end_date: new.end_date,
        project_key: new.project_key,
        created_at,
    })
}

async fn query_sprint(pool: &SqlitePool, sprint_id: i64) -> Result<Option<Sprint>> {
    sqlx::query(&format!("SELECT {SPRINT_COLUMNS} FROM sprints WHERE id = ?"))
        .bind(sprint_id)
        .fetch_optional(pool)
        .await?
        .map(|row| parse_sprint_row(&row))
        .transpose()
}
