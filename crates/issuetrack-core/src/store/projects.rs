//! Project persistence.

use sqlx::SqlitePool;
use tracing::info;

use super::{
    rows::{
        conflict_on_unique, format_timestamp, now, parse_project_row, parse_rows, PROJECT_COLUMNS,
    },
    PoolAccess,
};
use crate::{
    domain::{
        check_wip_limit, validation::Violations, NewProject, Project, ProjectKey, ProjectPayload,
    },
    wip::{self, WipUsage},
    Error, Result,
};

#[allow(async_fn_in_trait)]
pub trait ProjectOps: PoolAccess {
    /// WIP limit applied when a payload does not carry one.
    fn default_wip_limit(&self) -> u32;

    /// Create a project.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad payload and `Error::Conflict`
    /// when the key or name is taken.
    async fn create_project(&self, payload: &ProjectPayload) -> Result<Project> {
        let new = payload.validate(self.default_wip_limit())?;
        insert_project(self.pool(), new).await
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no project has this key.
    async fn get_project_by_key(&self, key: &ProjectKey) -> Result<Project> {
        query_project(self.pool(), "project_key", key.as_str())
            .await?
            .ok_or_else(|| Error::not_found("project", key))
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no project has this name.
    async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        query_project(self.pool(), "name", name)
            .await?
            .ok_or_else(|| Error::not_found("project", name))
    }

    /// All projects by creation order. Empty is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        parse_rows(&rows, parse_project_row)
    }

    /// Change a project's WIP limit.
    ///
    /// Lowering the limit below the current in-progress count is allowed; it
    /// only blocks further entries until enough issues leave `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a zero limit and `Error::NotFound` for
    /// an unknown project.
    async fn set_wip_limit(&self, key: &ProjectKey, limit: u32) -> Result<Project> {
        let mut v = Violations::new();
        check_wip_limit(&mut v, limit);
        v.finish()?;

        let updated = sqlx::query("UPDATE projects SET wip_limit = ? WHERE project_key = ?")
            .bind(i64::from(limit))
            .bind(key.as_str())
            .execute(self.pool())
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(Error::not_found("project", key));
        }
        info!(project_key = %key, limit, "WIP limit changed");
        self.get_project_by_key(key).await
    }

    /// Current WIP limit and in-progress count.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown project.
    async fn wip_usage(&self, key: &ProjectKey) -> Result<WipUsage> {
        wip::load_usage(self.pool(), key).await
    }
}

async fn insert_project(pool: &SqlitePool, new: NewProject) -> Result<Project> {
    let created_at = now();
    let id = sqlx::query(
        "INSERT INTO projects
             (name, description, project_lead, project_key, wip_limit, issue_count, created_at)
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.project_lead)
    .bind(new.project_key.as_str())
    .bind(i64::from(new.wip_limit))
    .bind(format_timestamp(created_at))
    .execute(pool)
    .await
    .map_err(|e| {
        conflict_on_unique(e, || {
            format!(
                "a project with key '{}' or name '{}' already exists",
                new.project_key, new.name
            )
        })
    })?
    .last_insert_rowid();

    info!(project_key = %new.project_key, wip_limit = new.wip_limit, "project created");
    Ok(Project {
        id,
        name: new.name,
        description: new.description,
        project_lead: new.project_lead,
        project_key: new.project_key,
        wip_limit: new.wip_limit,
        issue_count: 0,
        created_at,
    })
}

/// `column` is a literal from this module, never caller input.
async fn query_project(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<Project>> {
    sqlx::query(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE {column} = ?"
    ))
    .bind(value)
    .fetch_optional(pool)
    .await?
    .map(|row| parse_project_row(&row))
    .transpose()
}

pub(crate) async fn query_project_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
    sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(|row| parse_project_row(&row))
        .transpose()
}
