//! JSON output for commands and errors

use anyhow::Result;
use issuetrack_core::{Error, FieldViolation};
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

/// Error JSON written to stderr
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorOutput {
    pub fn from_error(err: &anyhow::Error) -> Self {
        err.downcast_ref::<Error>().map_or_else(
            || Self {
                code: "USAGE_ERROR",
                message: format!("{err:#}"),
                violations: Vec::new(),
                retryable: false,
            },
            |core| Self {
                code: core.code(),
                message: core.to_string(),
                violations: core.violations().to_vec(),
                retryable: core.is_transient(),
            },
        )
    }

    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| format!("{}: {}", self.code, self.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_keeps_code_and_violations() {
        let err = anyhow::Error::new(Error::validation(vec![
            FieldViolation::missing("summary"),
            FieldViolation::missing("reporter"),
        ]));
        let out = ErrorOutput::from_error(&err);
        assert_eq!(out.code, "VALIDATION_FAILED");
        assert_eq!(out.violations.len(), 2);

        let json: serde_json::Value = serde_json::from_str(&out.render()).unwrap();
        assert_eq!(json["violations"][1]["field"], "reporter");
        assert!(json.get("retryable").is_none());
    }

    #[test]
    fn test_other_errors_are_usage_errors() {
        let out = ErrorOutput::from_error(&anyhow::anyhow!("nothing to update"));
        assert_eq!(out.code, "USAGE_ERROR");
        assert_eq!(out.message, "nothing to update");

        let json: serde_json::Value = serde_json::from_str(&out.render()).unwrap();
        assert!(json.get("violations").is_none());
    }
}
