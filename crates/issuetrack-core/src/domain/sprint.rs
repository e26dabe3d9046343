use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{issue::ProjectKey, validation::Violations};
use crate::Result;

/// Dates are calendar days, `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub project_key: ProjectKey,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSprint {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub project_key: ProjectKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project_key: Option<String>,
}

fn parse_date(v: &mut Violations, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    v.require(field, value).and_then(|raw| {
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_or_else(
            |_| {
                v.push(field, format!("must be a date in YYYY-MM-DD form (got '{raw}')"));
                None
            },
            Some,
        )
    })
}

impl SprintPayload {
    /// # Errors
    ///
    /// Returns `Error::Validation` listing each violated field, including an
    /// end date earlier than the start date.
    pub fn validate(&self) -> Result<NewSprint> {
        let mut v = Violations::new();
        let name = v.require("name", self.name.as_deref());
        let description = self
            .description
            .as_deref()
            .map_or_else(String::new, |d| d.trim().to_string());
        let start_date = parse_date(&mut v, "startDate", self.start_date.as_deref());
        let end_date = parse_date(&mut v, "endDate", self.end_date.as_deref());
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                v.push("endDate", "must not be before startDate");
            }
        }
        let project_key = v
            .require("projectKey", self.project_key.as_deref())
            .and_then(|key| v.check("projectKey", ProjectKey::new(key)));
        v.finish()?;

        match (name, start_date, end_date, project_key) {
            (Some(name), Some(start_date), Some(end_date), Some(project_key)) => Ok(NewSprint {
                name,
                description,
                start_date,
                end_date,
                project_key,
            }),
            _ => Err(crate::Error::invalid_field("payload", "is incomplete")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(start: &str, end: &str) -> SprintPayload {
        SprintPayload {
            name: Some("Sprint 1".into()),
            description: Some("first".into()),
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            project_key: Some("PRJ".into()),
        }
    }

    #[test]
    fn test_sprint_single_day_is_valid() -> Result<()> {
        let sprint = payload("2024-03-04", "2024-03-04").validate()?;
        assert_eq!(sprint.start_date, sprint.end_date);
        Ok(())
    }

    #[test]
    fn test_sprint_end_before_start() {
        let err = payload("2024-03-18", "2024-03-04").validate().err();
        let fields: Vec<String> = err
            .as_ref()
            .map(crate::Error::violations)
            .unwrap_or_default()
            .iter()
            .map(|v| v.field.clone())
            .collect();
        assert_eq!(fields, vec!["endDate"]);
    }

    #[test]
    fn test_sprint_bad_date_format() {
        assert!(payload("04/03/2024", "2024-03-18").validate().is_err());
    }
}
