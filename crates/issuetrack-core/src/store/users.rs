//! Users and project membership.

use sqlx::SqlitePool;
use tracing::info;

use super::{
    projects::query_project_by_id,
    rows::{
        conflict_on_unique, format_timestamp, now, parse_rows, parse_timestamp, parse_user_row,
        USER_COLUMNS,
    },
    PoolAccess,
};
use crate::{
    domain::{validation::Violations, NewUser, ProjectMember, User, UserPayload},
    Error, Result,
};

#[allow(async_fn_in_trait)]
pub trait UserOps: PoolAccess {
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad payload and `Error::Conflict`
    /// when the email is already registered.
    async fn create_user(&self, payload: &UserPayload) -> Result<User> {
        let new = payload.validate()?;
        insert_user(self.pool(), new).await
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no user has this id.
    async fn get_user_by_id(&self, id: i64) -> Result<User> {
        query_user_by_id(self.pool(), id)
            .await?
            .ok_or_else(|| Error::not_found("user", id))
    }

    /// Case-insensitive email lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no user has this email.
    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        query_user_by_email(self.pool(), &email.trim().to_lowercase())
            .await?
            .ok_or_else(|| Error::not_found("user", email))
    }

    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        parse_rows(&rows, parse_user_row)
    }
}

#[allow(async_fn_in_trait)]
pub trait AssignmentOps: PoolAccess {
    /// Add a user to a project with a role.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the project or user does not exist,
    /// `Error::Validation` for a blank role and `Error::Conflict` if the user
    /// is already a member.
    async fn assign_user(
        &self,
        project_id: i64,
        user_id: i64,
        role: &str,
    ) -> Result<ProjectMember> {
        let mut v = Violations::new();
        let role = v.require("role", Some(role));
        v.finish()?;
        let role = role.ok_or_else(|| Error::invalid_field("role", "is required"))?;

        let project = query_project_by_id(self.pool(), project_id)
            .await?
            .ok_or_else(|| Error::not_found("project", project_id))?;
        let user = query_user_by_id(self.pool(), user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", user_id))?;

        let assigned_at = now();
        sqlx::query(
            "INSERT INTO project_assignments (project_id, user_id, role, assigned_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(&role)
        .bind(format_timestamp(assigned_at))
        .execute(self.pool())
        .await
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("user {user_id} is already assigned to project {}", project.project_key)
            })
        })?;

        info!(project_key = %project.project_key, user_id, role = %role, "user assigned");
        Ok(ProjectMember {
            user,
            role,
            assigned_at,
        })
    }

    /// Remove a membership. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    async fn remove_user(&self, project_id: i64, user_id: i64) -> Result<bool> {
        let removed = sqlx::query(
            "DELETE FROM project_assignments WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(removed > 0)
    }

    /// Members of a project in assignment order.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the project does not exist.
    async fn users_for_project(&self, project_id: i64) -> Result<Vec<ProjectMember>> {
        query_project_by_id(self.pool(), project_id)
            .await?
            .ok_or_else(|| Error::not_found("project", project_id))?;

        let rows = sqlx::query(
            "SELECT u.id, u.first_name, u.last_name, u.email, u.created_at, a.role, a.assigned_at
             FROM project_assignments a JOIN users u ON u.id = a.user_id
             WHERE a.project_id = ?
             ORDER BY a.assigned_at, u.id",
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                use sqlx::Row;

                let role: String = row
                    .try_get("role")
                    .map_err(|e| Error::persistence(format!("Failed to read role: {e}")))?;
                let assigned_at: String = row
                    .try_get("assigned_at")
                    .map_err(|e| Error::persistence(format!("Failed to read assigned_at: {e}")))?;
                Ok(ProjectMember {
                    user: parse_user_row(row)?,
                    role,
                    assigned_at: parse_timestamp("assigned_at", &assigned_at)?,
                })
            })
            .collect()
    }
}

async fn insert_user(pool: &SqlitePool, new: NewUser) -> Result<User> {
    let created_at = now();
    let id = sqlx::query(
        "INSERT INTO users (first_name, last_name, email, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(format_timestamp(created_at))
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, || format!("email '{}' is already registered", new.email)))?
    .last_insert_rowid();

    info!(user_id = id, "user created");
    Ok(User {
        id,
        first_name: new.first_name,
        last_name: new.last_name,
        email: new.email,
        created_at,
    })
}

async fn query_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(|row| parse_user_row(&row))
        .transpose()
}

async fn query_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await?
        .map(|row| parse_user_row(&row))
        .transpose()
}
