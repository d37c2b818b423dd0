//! Persistence configuration (`[persistence]` section)

use serde::{Deserialize, Serialize};

/// Without `state_file` the council keeps trust and load history in memory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersistenceConfig {
    pub state_file: Option<String>,
}
