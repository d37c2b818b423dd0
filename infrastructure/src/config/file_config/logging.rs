//! Logging configuration (`[logging]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Diagnostic log file, in addition to stderr
    pub file: Option<String>,
    /// JSONL audit trail of council decisions
    pub audit_log: Option<String>,
    /// Filter directive used when neither `-v` nor `RUST_LOG` is given
    pub level: Option<String>,
}
