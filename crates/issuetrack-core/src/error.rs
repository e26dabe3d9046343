//! Error types for issuetrack with categorization:
//!
//! - **User errors**: payload validation, illegal status transitions and
//!   business-rule rejections such as the WIP limit (exit code 1)
//! - **Lookup errors**: a referenced issue, project, sprint, scope or
//!   stand-up does not exist (exit code 3)
//! - **System errors**: persistence, IO and configuration parsing
//!   (exit code 2 or 4)

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::IssueStatus;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Payload field name, as the caller spelled it.
    pub field: String,
    /// What is wrong with the field.
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The field is absent or blank.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete payload; carries every violated field.
    #[error("Validation failed: {}", join_violations(.violations))]
    Validation { violations: Vec<FieldViolation> },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Too many issues in progress for project {project_key}, the WIP limit is {limit}")]
    WipLimitExceeded { project_key: String, limit: u32 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: IssueStatus, to: IssueStatus },

    #[error("No completed issues with a valid cycle time for project {project_key}")]
    NoCompletedIssues { project_key: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure. `transient` is set for connection-level causes that a
    /// caller may retry; constraint violations are never transient.
    #[error("Database error: {message}")]
    Persistence { message: String, transient: bool },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for issuetrack operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error from a list of violations.
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self::Validation { violations }
    }

    /// Create a validation error for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(vec![FieldViolation::new(field, message)])
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a non-transient persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            transient: false,
        }
    }

    /// Stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::WipLimitExceeded { .. } => "WIP_LIMIT_EXCEEDED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NoCompletedIssues { .. } => "NO_COMPLETED_ISSUES",
            Self::Conflict(_) => "CONFLICT",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
        }
    }

    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit code scheme:
    /// - 1: User error (validation, transition, WIP limit, conflict, config)
    /// - 2: System error (IO, parsing)
    /// - 3: Not found (including aggregates with no matching rows)
    /// - 4: Persistence failure
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. }
            | Self::WipLimitExceeded { .. }
            | Self::InvalidTransition { .. }
            | Self::Conflict(_)
            | Self::InvalidConfig(_) => 1,
            Self::Io(_) | Self::Parse(_) => 2,
            Self::NotFound { .. } | Self::NoCompletedIssues { .. } => 3,
            Self::Persistence { .. } => 4,
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Persistence {
                transient: true,
                ..
            }
        )
    }

    /// Field-level detail for validation failures, empty otherwise.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => {
                let msg = db.message().to_lowercase();
                msg.contains("database is locked") || msg.contains("busy")
            }
            _ => false,
        };
        Self::Persistence {
            message: err.to_string(),
            transient,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(format!("Failed to parse config: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_every_field() {
        let err = Error::validation(vec![
            FieldViolation::missing("summary"),
            FieldViolation::new("status", "must be one of: open, in_progress, resolved"),
        ]);
        let display = err.to_string();
        assert!(display.contains("summary is required"));
        assert!(display.contains("status must be one of"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_wip_limit_display_quotes_limit() {
        let err = Error::WipLimitExceeded {
            project_key: "PRJ".into(),
            limit: 1,
        };
        assert!(err.to_string().contains("the WIP limit is 1"));
        assert_eq!(err.code(), "WIP_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("issue", 42);
        assert_eq!(err.to_string(), "issue '42' not found");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::invalid_field("x", "bad").exit_code(), 1);
        assert_eq!(Error::Conflict("dup".into()).exit_code(), 1);
        assert_eq!(Error::Io("disk".into()).exit_code(), 2);
        assert_eq!(Error::not_found("issue", 1).exit_code(), 3);
        assert_eq!(
            Error::NoCompletedIssues {
                project_key: "PRJ".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::persistence("corrupt").exit_code(), 4);
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = Error::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
        assert!(!Error::persistence("UNIQUE constraint failed").is_transient());
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }
}
