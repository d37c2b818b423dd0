//! Consensus configuration (`[consensus]` section)
//!
//! ```toml
//! [consensus]
//! methods = ["unanimous", "trust_weighted", "majority"]
//! agreement_threshold = 0.7
//! hedge_threshold = 0.4
//! grouping = "jaccard"
//! similarity_threshold = 0.6
//! debate = true
//! ```

use super::validation::{ConfigIssue, ConfigIssueCode, check_unit, invalid_enum};
use concord_domain::consensus::DEFAULT_HISTORY_CAPACITY;
use concord_domain::{ConsensusMethod, ConsensusSettings, GroupingStrategy};
use serde::{Deserialize, Serialize};

const METHODS: [&str; 5] = [
    "majority",
    "weighted",
    "confidence_weighted",
    "trust_weighted",
    "unanimous",
];
const GROUPINGS: [&str; 2] = ["exact", "jaccard"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    /// Enabled methods; selection priority is fixed regardless of order
    pub methods: Vec<String>,
    pub agreement_threshold: f64,
    pub hedge_threshold: f64,
    /// How equivalent outputs are grouped: "exact" or "jaccard"
    pub grouping: String,
    /// Token similarity needed to share a group under "jaccard"
    pub similarity_threshold: f64,
    /// Re-dispatch non-accepted rounds while depth and budget remain
    pub debate: bool,
    /// Decisions kept for the history query
    pub history_capacity: usize,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        let defaults = ConsensusSettings::default();
        Self {
            methods: defaults.methods.iter().map(|m| m.to_string()).collect(),
            agreement_threshold: defaults.agreement_threshold,
            hedge_threshold: defaults.hedge_threshold,
            grouping: "exact".to_string(),
            similarity_threshold: 0.6,
            debate: true,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl FileConsensusConfig {
    /// Parse the method list, collecting issues for unknown names.
    pub fn parse_methods(&self) -> (Vec<ConsensusMethod>, Vec<ConfigIssue>) {
        let mut methods = Vec::new();
        let mut issues = Vec::new();
        for name in &self.methods {
            match name.parse::<ConsensusMethod>() {
                Ok(method) if !methods.contains(&method) => methods.push(method),
                Ok(_) => {}
                Err(_) => issues.push(invalid_enum("consensus.methods", name, &METHODS)),
            }
        }
        (methods, issues)
    }

    pub fn parse_grouping(&self) -> Option<GroupingStrategy> {
        match self.grouping.to_lowercase().as_str() {
            "exact" => Some(GroupingStrategy::Exact),
            "jaccard" => Some(GroupingStrategy::Jaccard {
                threshold: self.similarity_threshold,
            }),
            _ => None,
        }
    }

    pub fn to_consensus_settings(&self) -> ConsensusSettings {
        let (methods, _) = self.parse_methods();
        let settings = ConsensusSettings::default()
            .with_thresholds(self.agreement_threshold, self.hedge_threshold)
            .with_grouping(self.parse_grouping().unwrap_or_default());
        if methods.is_empty() {
            settings
        } else {
            settings.with_methods(methods)
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        let (methods, method_issues) = self.parse_methods();
        issues.extend(method_issues);
        if methods.is_empty() && self.methods.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "consensus.methods".to_string(),
                },
                "consensus.methods is empty; all methods stay enabled",
            ));
        }
        if self.parse_grouping().is_none() {
            issues.push(invalid_enum("consensus.grouping", &self.grouping, &GROUPINGS));
        }
        check_unit("consensus.agreement_threshold", self.agreement_threshold, issues);
        check_unit("consensus.hedge_threshold", self.hedge_threshold, issues);
        check_unit("consensus.similarity_threshold", self.similarity_threshold, issues);
        if self.hedge_threshold >= self.agreement_threshold {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ThresholdOrder,
                format!(
                    "consensus.hedge_threshold ({}) must be below consensus.agreement_threshold ({})",
                    self.hedge_threshold, self.agreement_threshold
                ),
            ));
        }
    }
}
