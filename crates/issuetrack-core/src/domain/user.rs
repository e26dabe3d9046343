use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::Violations;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    /// Lower-cased.
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| {
                    !host.is_empty() && !tld.is_empty() && !tld.ends_with('.')
                })
    })
}

impl UserPayload {
    /// # Errors
    ///
    /// Returns `Error::Validation` listing each violated field.
    pub fn validate(&self) -> Result<NewUser> {
        let mut v = Violations::new();
        let first_name = v.require("firstName", self.first_name.as_deref());
        let last_name = v.require("lastName", self.last_name.as_deref());
        let email = v.require("email", self.email.as_deref()).and_then(|email| {
            if is_plausible_email(&email) {
                Some(email.to_lowercase())
            } else {
                v.push("email", format!("is not a valid address (got '{email}')"));
                None
            }
        });
        v.finish()?;

        match (first_name, last_name, email) {
            (Some(first_name), Some(last_name), Some(email)) => Ok(NewUser {
                first_name,
                last_name,
                email,
            }),
            _ => Err(crate::Error::invalid_field("payload", "is incomplete")),
        }
    }
}

/// A user's membership in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    #[serde(flatten)]
    pub user: User,
    pub role: String,
    pub assigned_at: DateTime<Utc>,
}
