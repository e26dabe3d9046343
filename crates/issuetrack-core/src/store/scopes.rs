//! Scopes group projects; their issue list spans every member project.

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::info;

use super::{
    claim_project,
    rows::{
        conflict_on_unique, format_timestamp, now, parse_issue_row, parse_rows, parse_timestamp,
        ISSUE_COLUMNS,
    },
    PoolAccess,
};
use crate::{
    domain::{Issue, NewScope, ProjectKey, Scope, ScopePayload},
    Error, Result,
};

#[allow(async_fn_in_trait)]
pub trait ScopeOps: PoolAccess {
    /// Create a scope and link its projects in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad payload, `Error::NotFound` if a
    /// listed project does not exist and `Error::Conflict` for a taken name.
    async fn create_scope(&self, payload: &ScopePayload) -> Result<Scope> {
        let new = payload.validate()?;
        insert_scope(self.pool(), new).await
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no scope has this id.
    async fn get_scope(&self, scope_id: i64) -> Result<Scope> {
        query_scope(self.pool(), scope_id)
            .await?
            .ok_or_else(|| Error::not_found("scope", scope_id))
    }

    /// Link a project to a scope. Linking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the scope or project does not exist.
    async fn add_project_to_scope(&self, scope_id: i64, key: &ProjectKey) -> Result<Scope> {
        let mut tx = self.pool().begin().await?;
        claim_project(&mut tx, key).await?;
        ensure_scope_exists(&mut tx, scope_id).await?;
        link_project(&mut tx, scope_id, key).await?;
        tx.commit().await?;

        info!(scope_id, project_key = %key, "project added to scope");
        self.get_scope(scope_id).await
    }

    /// Every issue of every project in the scope, grouped by project.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the scope does not exist.
    async fn issues_for_scope(&self, scope_id: i64) -> Result<Vec<Issue>> {
        self.get_scope(scope_id).await?;
        let rows = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
             WHERE project_key IN (SELECT project_key FROM project_scope WHERE scope_id = ?)
             ORDER BY project_key, id"
        ))
        .bind(scope_id)
        .fetch_all(self.pool())
        .await?;
        parse_rows(&rows, parse_issue_row)
    }
}

async fn insert_scope(pool: &SqlitePool, new: NewScope) -> Result<Scope> {
    let created_at = now();
    let mut tx = pool.begin().await?;

    let id = sqlx::query("INSERT INTO scopes (name, description, created_at) VALUES (?, ?, ?)")
        .bind(&new.name)
        .bind(&new.description)
        .bind(format_timestamp(created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("scope '{}' already exists", new.name)))?
        .last_insert_rowid();

    for key in &new.project_keys {
        claim_project(&mut tx, key).await?;
        link_project(&mut tx, id, key).await?;
    }
    tx.commit().await?;

    info!(scope_id = id, projects = new.project_keys.len(), "scope created");
    Ok(Scope {
        id,
        name: new.name,
        description: new.description,
        project_keys: new.project_keys,
        created_at,
    })
}

async fn link_project(
    tx: &mut Transaction<'_, Sqlite>,
    scope_id: i64,
    key: &ProjectKey,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO project_scope (scope_id, project_key) VALUES (?, ?)")
        .bind(scope_id)
        .bind(key.as_str())
        .execute(&mut **tx)
        .await
        .map(|_| ())
        .map_err(Error::from)
}

async fn ensure_scope_exists(tx: &mut Transaction<'_, Sqlite>, scope_id: i64) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM scopes WHERE id = ?")
        .bind(scope_id)
        .fetch_optional(&mut **tx)
        .await?;
    found.map(|_| ()).ok_or_else(|| Error::not_found("scope", scope_id))
}

async fn query_scope(pool: &SqlitePool, scope_id: i64) -> Result<Option<Scope>> {
    let Some(row) = sqlx::query("SELECT id, name, description, created_at FROM scopes WHERE id = ?")
        .bind(scope_id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let keys: Vec<String> = sqlx::query_scalar(
        "SELECT project_key FROM project_scope WHERE scope_id = ? ORDER BY project_key",
    )
    .bind(scope_id)
    .fetch_all(pool)
    .await?;
    let project_keys = keys
        .into_iter()
        .map(|key| {
            ProjectKey::new(key)
                .map_err(|e| Error::persistence(format!("Invalid stored project_key: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let read = |name: &str| -> Result<String> {
        row.try_get(name)
            .map_err(|e| Error::persistence(format!("Failed to read {name}: {e}")))
    };
    let created_at = read("created_at")?;
    Ok(Some(Scope {
        id: row
            .try_get("id")
            .map_err(|e| Error::persistence(format!("Failed to read id: {e}")))?,
        name: read("name")?,
        description: read("description")?,
        project_keys,
        created_at: parse_timestamp("created_at", &created_at)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        issues::IssueOps,
        store::{
            fixtures::{issue_payload, project_payload, store_with_project},
            ProjectOps,
        },
    };

    fn scope(keys: &[&str]) -> ScopePayload {
        ScopePayload {
            name: Some("Platform".into()),
            description: Some("shared services".into()),
            project_keys: keys.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_scope_spans_projects() -> Result<()> {
        let (store, _) = store_with_project("WEB", 3).await?;
        store.create_project(&project_payload("API", None)).await?;
        store.create_issue(&issue_payload("WEB", "w1")).await?;
        store.create_issue(&issue_payload("API", "a1")).await?;
        store.create_issue(&issue_payload("API", "a2")).await?;

        let created = store.create_scope(&scope(&["WEB", "API"])).await?;
        let fetched = store.get_scope(created.id).await?;
        let keys: Vec<&str> = fetched.project_keys.iter().map(ProjectKey::as_str).collect();
        assert_eq!(keys, vec!["API", "WEB"]);

        let issues = store.issues_for_scope(created.id).await?;
        let issue_keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(issue_keys, vec!["API-001", "API-002", "WEB-001"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_scope_with_unknown_project_is_rolled_back() -> Result<()> {
        let (store, _) = store_with_project("WEB", 3).await?;
        let result = store.create_scope(&scope(&["WEB", "NOPE"])).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "project", .. })));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scopes")
            .fetch_one(store.pool())
            .await?;
        assert_eq!(count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_project_is_idempotent() -> Result<()> {
        let (store, key) = store_with_project("WEB", 3).await?;
        let created = store.create_scope(&scope(&[])).await?;
        store.add_project_to_scope(created.id, &key).await?;
        let again = store.add_project_to_scope(created.id, &key).await?;
        assert_eq!(again.project_keys, vec![key.clone()]);

        assert!(matches!(
            store.add_project_to_scope(999, &key).await,
            Err(Error::NotFound { entity: "scope", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_scope_name_is_conflict() -> Result<()> {
        let (store, _) = store_with_project("WEB", 3).await?;
        store.create_scope(&scope(&[])).await?;
        assert!(matches!(
            store.create_scope(&scope(&[])).await,
            Err(Error::Conflict(_))
        ));
        Ok(())
    }
}
