//! Database schema, embedded and applied on open.

use sqlx::SqlitePool;

use crate::Result;

/// Timestamps are RFC 3339 UTC text with microsecond precision, so string
/// comparison in SQL orders them chronologically.
pub(crate) const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    project_lead TEXT NOT NULL,
    project_key TEXT UNIQUE NOT NULL,
    wip_limit INTEGER NOT NULL CHECK(wip_limit >= 1),
    issue_count INTEGER NOT NULL DEFAULT 0 CHECK(issue_count >= 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT UNIQUE NOT NULL,
    summary TEXT NOT NULL,
    description TEXT NOT NULL,
    project_key TEXT NOT NULL REFERENCES projects(project_key),
    reporter TEXT NOT NULL,
    assignee TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('open', 'in_progress', 'resolved')),
    issue_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_issues_project_status ON issues(project_key, status);
CREATE INDEX IF NOT EXISTS idx_issues_project_updated ON issues(project_key, updated_at);

CREATE TABLE IF NOT EXISTS standups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_key TEXT NOT NULL REFERENCES projects(project_key),
    start_time TEXT NOT NULL,
    end_time TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_standups_project_end ON standups(project_key, end_time);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_assignments (
    project_id INTEGER NOT NULL REFERENCES projects(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    role TEXT NOT NULL,
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS scopes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_scope (
    scope_id INTEGER NOT NULL REFERENCES scopes(id),
    project_key TEXT NOT NULL REFERENCES projects(project_key),
    PRIMARY KEY (scope_id, project_key)
);

CREATE TABLE IF NOT EXISTS sprints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL CHECK(end_date >= start_date),
    project_key TEXT NOT NULL REFERENCES projects(project_key),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sprint_issues (
    sprint_id INTEGER NOT NULL REFERENCES sprints(id),
    issue_id INTEGER NOT NULL REFERENCES issues(id),
    PRIMARY KEY (sprint_id, issue_id)
);
";

/// Initialize database schema
pub(crate) async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| crate::Error::persistence(format!("Failed to initialize schema: {e}")))
}
