//! Timestamp encoding and row parsing.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use crate::{
    domain::{
        Issue, IssueId, IssueKey, IssueStatus, Project, ProjectKey, Sprint, Standup, User,
        DATE_FORMAT,
    },
    Error, Result,
};

pub(crate) const ISSUE_COLUMNS: &str = "id, key, summary, description, project_key, reporter, \
     assignee, status, issue_type, created_at, updated_at, started_at, finished_at";

pub(crate) const PROJECT_COLUMNS: &str =
    "id, name, description, project_lead, project_key, wip_limit, issue_count, created_at";

pub(crate) const STANDUP_COLUMNS: &str = "id, project_key, start_time, end_time, created_at";

pub(crate) const USER_COLUMNS: &str = "id, first_name, last_name, email, created_at";

pub(crate) const SPRINT_COLUMNS: &str =
    "id, name, description, start_date, end_date, project_key, created_at";

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339, e.g. `2024-03-04T09:15:00.000000Z`.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::persistence(format!("Invalid timestamp in {column}: '{raw}': {e}")))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| Error::persistence(format!("Failed to read {name}: {e}")))
}

fn timestamp(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>> {
    let raw: String = column(row, name)?;
    parse_timestamp(name, &raw)
}

fn optional_timestamp(row: &SqliteRow, name: &str) -> Result<Option<DateTime<Utc>>> {
    column::<Option<String>>(row, name)?
        .map(|raw| parse_timestamp(name, &raw))
        .transpose()
}

fn project_key(row: &SqliteRow) -> Result<ProjectKey> {
    let raw: String = column(row, "project_key")?;
    ProjectKey::new(raw).map_err(|e| Error::persistence(format!("Invalid stored project_key: {e}")))
}

pub(crate) fn parse_issue_row(row: &SqliteRow) -> Result<Issue> {
    let status_str: String = column(row, "status")?;
    let status = IssueStatus::from_str(&status_str)
        .map_err(|e| Error::persistence(format!("Invalid stored status '{status_str}': {e}")))?;

    Ok(Issue {
        id: IssueId(column(row, "id")?),
        key: IssueKey::from_stored(column(row, "key")?),
        summary: column(row, "summary")?,
        description: column(row, "description")?,
        project_key: project_key(row)?,
        reporter: column(row, "reporter")?,
        assignee: column(row, "assignee")?,
        status,
        issue_type: column(row, "issue_type")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
        started_at: optional_timestamp(row, "started_at")?,
        finished_at: optional_timestamp(row, "finished_at")?,
    })
}

pub(crate) fn parse_project_row(row: &SqliteRow) -> Result<Project> {
    let wip_limit: i64 = column(row, "wip_limit")?;
    let wip_limit = u32::try_from(wip_limit)
        .map_err(|e| Error::persistence(format!("Invalid stored wip_limit {wip_limit}: {e}")))?;

    Ok(Project {
        id: column(row, "id")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        project_lead: column(row, "project_lead")?,
        project_key: project_key(row)?,
        wip_limit,
        issue_count: column(row, "issue_count")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(crate) fn parse_standup_row(row: &SqliteRow) -> Result<Standup> {
    Ok(Standup {
        id: column(row, "id")?,
        project_key: project_key(row)?,
        start_time: timestamp(row, "start_time")?,
        end_time: optional_timestamp(row, "end_time")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(crate) fn parse_user_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: column(row, "id")?,
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        email: column(row, "email")?,
        created_at: timestamp(row, "created_at")?,
    })
}

fn date(row: &SqliteRow, name: &str) -> Result<NaiveDate> {
    let raw: String = column(row, name)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| Error::persistence(format!("Invalid date in {name}: '{raw}': {e}")))
}

pub(crate) fn parse_sprint_row(row: &SqliteRow) -> Result<Sprint> {
    Ok(Sprint {
        id: column(row, "id")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        start_date: date(row, "start_date")?,
        end_date: date(row, "end_date")?,
        project_key: project_key(row)?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(crate) fn parse_rows<T>(
    rows: &[SqliteRow],
    parse: impl Fn(&SqliteRow) -> Result<T>,
) -> Result<Vec<T>> {
    rows.iter().map(parse).collect()
}

/// Map a unique-constraint failure to `Conflict`, anything else to persistence.
pub(crate) fn conflict_on_unique(err: sqlx::Error, conflict: impl FnOnce() -> String) -> Error {
    let unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        Error::Conflict(conflict())
    } else {
        Error::from(err)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_timestamp_text_is_fixed_width_and_ordered() -> Result<()> {
        let a = Utc
            .with_ymd_and_hms(2024, 3, 4, 9, 15, 0)
            .single()
            .ok_or_else(|| Error::Parse("bad date".into()))?;
        let b = a + Duration::microseconds(1);
        let c = a + Duration::seconds(1);
        let (fa, fb, fc) = (format_timestamp(a), format_timestamp(b), format_timestamp(c));
        assert_eq!(fa, "2024-03-04T09:15:00.000000Z");
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb && fb < fc);
        assert_eq!(parse_timestamp("t", &fb)?, b);
        Ok(())
    }

    #[test]
    fn test_now_roundtrips_through_text() -> Result<()> {
        let ts = now();
        assert_eq!(parse_timestamp("t", &format_timestamp(ts))?, ts);
        Ok(())
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("created_at", "yesterday"),
            Err(Error::Persistence { .. })
        ));
    }
}
