//! Field-level validation shared by every inbound payload.
//!
//! Payload validators never stop at the first problem: each check records a
//! [`FieldViolation`] and the collector turns into one `Validation` error at
//! the end.

use std::str::FromStr;

use crate::{Error, FieldViolation, Result};

#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<FieldViolation>);

impl Violations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    /// A required, non-blank string. Returns the trimmed value when present.
    pub(crate) fn require(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.0.push(FieldViolation::missing(field));
                None
            }
        }
    }

    /// An optional string that must not be blank when present.
    pub(crate) fn non_blank(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                self.push(field, "must not be blank");
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// A required value parsed with `FromStr`.
    pub(crate) fn require_parsed<T: FromStr>(
        &mut self,
        field: &str,
        value: Option<&str>,
        expected: &str,
    ) -> Option<T> {
        self.require(field, value)
            .and_then(|v| self.parse_value(field, &v, expected))
    }

    /// An optional value parsed with `FromStr`.
    pub(crate) fn parsed<T: FromStr>(
        &mut self,
        field: &str,
        value: Option<&str>,
        expected: &str,
    ) -> Option<T> {
        self.non_blank(field, value)
            .and_then(|v| self.parse_value(field, &v, expected))
    }

    fn parse_value<T: FromStr>(&mut self, field: &str, value: &str, expected: &str) -> Option<T> {
        value.parse().map_or_else(
            |_| {
                self.push(field, format!("must be one of: {expected} (got '{value}')"));
                None
            },
            Some,
        )
    }

    /// Record the error of a fallible newtype constructor.
    pub(crate) fn check<T>(&mut self, field: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(Error::Validation { violations }) => {
                self.0.extend(violations.into_iter().map(|v| FieldViolation {
                    field: field.to_string(),
                    message: v.message,
                }));
                None
            }
            Err(other) => {
                self.push(field, other.to_string());
                None
            }
        }
    }

    /// `Ok(())` when nothing was recorded.
    pub(crate) fn finish(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(self.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueStatus;

    #[test]
    fn test_collects_all_violations() {
        let mut v = Violations::new();
        assert!(v.require("summary", None).is_none());
        assert!(v.require("reporter", Some("   ")).is_none());
        assert!(v
            .require_parsed::<IssueStatus>("status", Some("done"), IssueStatus::EXPECTED)
            .is_none());
        let err = v.finish().err();
        let violations = err.as_ref().map(Error::violations).unwrap_or_default();
        let fields: Vec<&str> = violations.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["summary", "reporter", "status"]);
    }

    #[test]
    fn test_require_trims() {
        let mut v = Violations::new();
        assert_eq!(v.require("summary", Some("  fix it ")), Some("fix it".into()));
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_absent_optional_is_not_a_violation() {
        let mut v = Violations::new();
        assert!(v.non_blank("assignee", None).is_none());
        assert!(v.parsed::<IssueStatus>("status", None, IssueStatus::EXPECTED).is_none());
        assert!(v.finish().is_ok());
    }
}
