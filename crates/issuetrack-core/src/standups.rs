//! Stand-ups and the "changed since last stand-up" delta.
//!
//! A project has at most one active stand-up (no end time). Starting and
//! ending take the project's write lock, so two concurrent starts cannot
//! both pass the "none active" check.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument};

use crate::{
    domain::{Issue, ProjectKey, Standup, StandupStarted},
    store::{
        claim_project,
        rows::{
            format_timestamp, now, parse_issue_row, parse_rows, parse_standup_row, parse_timestamp,
            ISSUE_COLUMNS, STANDUP_COLUMNS,
        },
        PoolAccess,
    },
    Error, Result,
};

#[allow(async_fn_in_trait)]
pub trait StandupOps: PoolAccess {
    /// End time of the most recently ended stand-up, `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn get_last_standup_end_time(&self, key: &ProjectKey) -> Result<Option<DateTime<Utc>>> {
        last_end_time(self.pool(), key).await
    }

    /// Issues changed strictly after `since`, or every issue of the project
    /// when `since` is `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn filter_tickets_by_end_time(
        &self,
        key: &ProjectKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Issue>> {
        changed_since(self.pool(), key, since).await
    }

    /// The stand-up currently running for the project, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn get_active_standup(&self, key: &ProjectKey) -> Result<Option<Standup>> {
        active_standup(self.pool(), key).await
    }

    /// Open a new stand-up starting now.
    ///
    /// Compute the delta with [`StandupOps::filter_tickets_by_end_time`]
    /// first, or use [`StandupOps::start_standup`] which does both.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown project and `Error::Conflict`
    /// if a stand-up is already active.
    async fn create_standup(&self, key: &ProjectKey) -> Result<Standup> {
        let mut tx = self.pool().begin().await?;
        let standup = open_standup(&mut tx, key).await?;
        tx.commit().await?;
        info!(project_key = %key, standup_id = standup.id, "stand-up started");
        Ok(standup)
    }

    /// Compute the delta since the last ended stand-up and open a new one,
    /// atomically.
    ///
    /// # Errors
    ///
    /// As [`StandupOps::create_standup`].
    async fn start_standup(&self, key: &ProjectKey) -> Result<StandupStarted> {
        begin_standup(self.pool(), key).await
    }

    /// Set the end time of the active stand-up to now.
    ///
    /// Should two stand-ups ever be active, the one started last is ended.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown project or if no stand-up
    /// is active.
    async fn end_current_standup(&self, key: &ProjectKey) -> Result<Standup> {
        finish_standup(self.pool(), key).await
    }
}

/// The end time is taken under the project's write lock, so any issue write
/// committed before it carries an earlier `updated_at`.
#[instrument(skip(pool))]
async fn finish_standup(pool: &SqlitePool, key: &ProjectKey) -> Result<Standup> {
    let mut tx = pool.begin().await?;
    claim_project(&mut tx, key).await?;

    let standup = sqlx::query(&format!(
        "UPDATE standups SET end_time = ?
         WHERE id = (SELECT id FROM standups
                     WHERE project_key = ? AND end_time IS NULL
                     ORDER BY start_time DESC, id DESC LIMIT 1)
         RETURNING {STANDUP_COLUMNS}"
    ))
    .bind(format_timestamp(now()))
    .bind(key.as_str())
    .fetch_optional(&mut *tx)
    .await?
    .map(|row| parse_standup_row(&row))
    .transpose()?
    .ok_or_else(|| Error::not_found("active stand-up", key))?;
    tx.commit().await?;

    info!(project_key = %key, standup_id = standup.id, "stand-up ended");
    Ok(standup)
}

#[instrument(skip(pool))]
async fn begin_standup(pool: &SqlitePool, key: &ProjectKey) -> Result<StandupStarted> {
    let mut tx = pool.begin().await?;
    claim_project(&mut tx, key).await?;
    ensure_none_active(&mut tx, key).await?;

    let since = last_end_time(&mut *tx, key).await?;
    let changed_issues = changed_since(&mut *tx, key, since).await?;
    let standup = insert_standup(&mut tx, key).await?;
    tx.commit().await?;

    info!(
        project_key = %key,
        standup_id = standup.id,
        changed = changed_issues.len(),
        "stand-up started"
    );
    Ok(StandupStarted {
        standup,
        since,
        changed_issues,
    })
}

async fn open_standup(tx: &mut Transaction<'_, Sqlite>, key: &ProjectKey) -> Result<Standup> {
    claim_project(tx, key).await?;
    ensure_none_active(tx, key).await?;
    insert_standup(tx, key).await
}

async fn ensure_none_active(
    tx: &mut Transaction<'_, Sqlite>,
    key: &ProjectKey,
) -> Result<()> {
    match active_standup(&mut **tx, key).await? {
        Some(active) => Err(Error::Conflict(format!(
            "stand-up {} for project {key} is still active",
            active.id
        ))),
        None => Ok(()),
    }
}

async fn insert_standup(tx: &mut Transaction<'_, Sqlite>, key: &ProjectKey) -> Result<Standup> {
    let start = now();
    let id = sqlx::query(
        "INSERT INTO standups (project_key, start_time, end_time, created_at)
         VALUES (?, ?, NULL, ?)",
    )
    .bind(key.as_str())
    .bind(format_timestamp(start))
    .bind(format_timestamp(start))
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();

    Ok(Standup {
        id,
        project_key: key.clone(),
        start_time: start,
        end_time: None,
        created_at: start,
    })
}

async fn last_end_time<'e, E>(executor: E, key: &ProjectKey) -> Result<Option<DateTime<Utc>>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let raw: Option<String> = sqlx::query_scalar(
        "SELECT end_time FROM standups
         WHERE project_key = ? AND end_time IS NOT NULL
         ORDER BY end_time DESC LIMIT 1",
    )
    .bind(key.as_str())
    .fetch_optional(executor)
    .await?;
    raw.map(|ts| parse_timestamp("end_time", &ts)).transpose()
}

async fn changed_since<'e, E>(
    executor: E,
    key: &ProjectKey,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Issue>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = match since {
        Some(since) => {
            sqlx::query(&format!(
                "SELECT {ISSUE_COLUMNS} FROM issues
                 WHERE project_key = ? AND updated_at > ? ORDER BY id"
            ))
            .bind(key.as_str())
            .bind(format_timestamp(since))
            .fetch_all(executor)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_key = ? ORDER BY id"
            ))
            .bind(key.as_str())
            .fetch_all(executor)
            .await?
        }
    };
    parse_rows(&rows, parse_issue_row)
}

async fn active_standup<'e, E>(executor: E, key: &ProjectKey) -> Result<Option<Standup>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(&format!(
        "SELECT {STANDUP_COLUMNS} FROM standups
         WHERE project_key = ? AND end_time IS NULL
         ORDER BY start_time DESC, id DESC LIMIT 1"
    ))
    .bind(key.as_str())
    .fetch_optional(executor)
    .await?
    .map(|row| parse_standup_row(&row))
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::IssueUpdate,
        issues::IssueOps,
        store::fixtures::{issue_payload, store_with_project},
    };

    #[tokio::test]
    async fn test_no_prior_standup_is_none() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        assert_eq!(store.get_last_standup_end_time(&key).await?, None);
        assert!(store.get_active_standup(&key).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_without_since_returns_all() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        store.create_issue(&issue_payload("PRJ", "a")).await?;
        store.create_issue(&issue_payload("PRJ", "b")).await?;
        let all = store.get_issues_by_project(&key).await?;
        let filtered = store.filter_tickets_by_end_time(&key, None).await?;
        assert_eq!(filtered, all);
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_boundary_is_exclusive() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        let a = store.create_issue(&issue_payload("PRJ", "a")).await?;

        let at_update = store
            .filter_tickets_by_end_time(&key, Some(a.updated_at))
            .await?;
        assert!(at_update.is_empty());

        let just_before = a.updated_at - chrono::Duration::microseconds(1);
        let before = store
            .filter_tickets_by_end_time(&key, Some(just_before))
            .await?;
        assert_eq!(before.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_with_sub_microsecond_since() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        let a = store.create_issue(&issue_payload("PRJ", "a")).await?;

        // stored stamps are whole microseconds; a finer `since` falls between two
        let inside = a.updated_at + chrono::Duration::nanoseconds(500);
        assert!(store
            .filter_tickets_by_end_time(&key, Some(inside))
            .await?
            .is_empty());

        let earlier = a.updated_at - chrono::Duration::nanoseconds(500);
        let changed = store
            .filter_tickets_by_end_time(&key, Some(earlier))
            .await?;
        assert_eq!(changed.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_active_standup_conflicts() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        let first = store.create_standup(&key).await?;
        assert!(first.is_active());

        assert!(matches!(
            store.create_standup(&key).await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            store.start_standup(&key).await,
            Err(Error::Conflict(_))
        ));

        let ended = store.end_current_standup(&key).await?;
        assert_eq!(ended.id, first.id);
        assert!(ended.end_time.is_some());
        assert_eq!(store.get_last_standup_end_time(&key).await?, ended.end_time);
        Ok(())
    }

    #[tokio::test]
    async fn test_end_without_active_is_not_found() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        assert!(matches!(
            store.end_current_standup(&key).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_standup_for_unknown_project() -> Result<()> {
        let (store, _) = store_with_project("PRJ", 3).await?;
        let other = ProjectKey::new("NOPE")?;
        assert!(matches!(
            store.create_standup(&other).await,
            Err(Error::NotFound { entity: "project", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_start_standup_reports_delta() -> Result<()> {
        let (store, key) = store_with_project("PRJ", 3).await?;
        let a = store.create_issue(&issue_payload("PRJ", "a")).await?;
        let b = store.create_issue(&issue_payload("PRJ", "b")).await?;

        let first = store.start_standup(&key).await?;
        assert_eq!(first.since, None);
        assert_eq!(first.changed_issues.len(), 2);
        store.end_current_standup(&key).await?;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        store
            .update_issue_fields(
                b.id,
                &IssueUpdate {
                    assignee: Some("cy".into()),
                    ..IssueUpdate::default()
                },
            )
            .await?;

        let second = store.start_standup(&key).await?;
        assert!(second.since.is_some());
        let changed: Vec<_> = second.changed_issues.iter().map(|i| i.id).collect();
        assert_eq!(changed, vec![b.id]);
        assert!(!changed.contains(&a.id));
        Ok(())
    }
}
