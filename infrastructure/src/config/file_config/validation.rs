//! Structured configuration issues

use std::fmt;
use thiserror::Error;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the council refuses to start.
    Error,
    /// Non-fatal: a default is used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A timeout or interval is zero
    ZeroDuration { field: String },
    /// A value lies outside its allowed range
    OutOfRange { field: String },
    /// `hedge_threshold` is not below `agreement_threshold`
    ThresholdOrder,
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    EmptyParticipantId,
    DuplicateParticipantId(String),
    /// An `http` participant without an endpoint, or built without HTTP support
    UnusableBackend(String),
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("invalid configuration:\n{}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Range check helper used by the section validators.
pub(super) fn check_unit(field: &str, value: f64, issues: &mut Vec<ConfigIssue>) {
    if !(0.0..=1.0).contains(&value) {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::OutOfRange {
                field: field.to_string(),
            },
            format!("{} must be within [0, 1], got {}", field, value),
        ));
    }
}

pub(super) fn check_nonzero(field: &str, value: u64, issues: &mut Vec<ConfigIssue>) {
    if value == 0 {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::ZeroDuration {
                field: field.to_string(),
            },
            format!("{} cannot be 0", field),
        ));
    }
}

pub(super) fn invalid_enum(field: &str, value: &str, valid: &[&str]) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
            valid_values: valid.iter().map(|v| v.to_string()).collect(),
        },
        format!(
            "{}: unknown value '{}' (valid: {})",
            field,
            value,
            valid.join(", ")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_error_lists_every_issue() {
        let err = ConfigValidationError::Invalid(vec![
            ConfigIssue::error(ConfigIssueCode::ThresholdOrder, "first"),
            ConfigIssue::error(ConfigIssueCode::EmptyParticipantId, "second"),
        ]);
        let text = err.to_string();
        assert!(text.contains("error: first"));
        assert!(text.contains("error: second"));
    }
}
