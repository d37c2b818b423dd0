//! Participant pool configuration (`[pool]` section)

use super::validation::{ConfigIssue, check_nonzero};
use concord_domain::SelectionSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePoolConfig {
    /// Participants not heard from within this window are not selected
    pub staleness_window_ms: u64,
    /// Fewer eligible participants than this rejects the task
    pub min_participants: usize,
    /// Prefer higher trust weights when truncating the selection
    pub trust_ranked: bool,
}

impl Default for FilePoolConfig {
    fn default() -> Self {
        let defaults = SelectionSettings::default();
        Self {
            staleness_window_ms: defaults.staleness_window_ms,
            min_participants: defaults.min_participants,
            trust_ranked: defaults.trust_ranked,
        }
    }
}

impl FilePoolConfig {
    pub fn to_selection_settings(&self) -> SelectionSettings {
        SelectionSettings {
            staleness_window_ms: self.staleness_window_ms,
            min_participants: self.min_participants,
            trust_ranked: self.trust_ranked,
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        check_nonzero("pool.staleness_window_ms", self.staleness_window_ms, issues);
    }
}
