//! Governance configuration (`[governance]` section)
//!
//! ```toml
//! [governance]
//! stress_test = false
//! stage_timeout_ms = 5000
//!
//! [governance.weights]
//! consensus = 0.5
//!
//! [governance.authority_rules]
//! vetoed_terms = ["rm -rf /"]
//! denied_capabilities = ["payments"]
//! ```

use super::validation::{ConfigIssue, check_nonzero, check_unit};
use crate::stages::{
    ConfidenceStressTest, ConsensusRiskSimulator, DissentConflictResolver, PolicyAuthority,
};
use concord_application::{GovernanceStages, PipelineSettings};
use concord_domain::SynthesisWeights;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGovernanceConfig {
    pub authority: bool,
    pub simulation: bool,
    pub stress_test: bool,
    pub conflict_resolution: bool,
    pub stage_timeout_ms: u64,
    pub weights: SynthesisWeights,
    pub authority_rules: PolicyAuthority,
    pub simulation_rules: ConsensusRiskSimulator,
    pub stress_rules: ConfidenceStressTest,
    pub conflict_rules: DissentConflictResolver,
}

impl Default for FileGovernanceConfig {
    fn default() -> Self {
        let defaults = PipelineSettings::default();
        Self {
            authority: defaults.authority,
            simulation: defaults.simulation,
            stress_test: defaults.stress_test,
            conflict_resolution: defaults.conflict_resolution,
            stage_timeout_ms: defaults.stage_timeout.as_millis() as u64,
            weights: defaults.weights,
            authority_rules: PolicyAuthority::default(),
            simulation_rules: ConsensusRiskSimulator::default(),
            stress_rules: ConfidenceStressTest::default(),
            conflict_rules: DissentConflictResolver::default(),
        }
    }
}

impl FileGovernanceConfig {
    pub fn to_pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            authority: self.authority,
            simulation: self.simulation,
            stress_test: self.stress_test,
            conflict_resolution: self.conflict_resolution,
            stage_timeout: Duration::from_millis(self.stage_timeout_ms),
            weights: self.weights,
        }
    }

    /// The rule-based implementation of every stage.
    pub fn build_stages(&self) -> GovernanceStages {
        GovernanceStages::default()
            .with_authority(Arc::new(self.authority_rules.clone()))
            .with_simulator(Arc::new(self.simulation_rules))
            .with_stress_tester(Arc::new(self.stress_rules))
            .with_conflict_resolver(Arc::new(self.conflict_rules))
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        check_nonzero("governance.stage_timeout_ms", self.stage_timeout_ms, issues);
        let sim = &self.simulation_rules;
        check_unit("governance.simulation_rules.caution_at", sim.caution_at, issues);
        check_unit(
            "governance.simulation_rules.require_human_at",
            sim.require_human_at,
            issues,
        );
        check_unit("governance.simulation_rules.deny_at", sim.deny_at, issues);
        check_unit(
            "governance.stress_rules.min_confidence",
            self.stress_rules.min_confidence,
            issues,
        );
        check_unit(
            "governance.conflict_rules.max_dissent_ratio",
            self.conflict_rules.max_dissent_ratio,
            issues,
        );
    }
}
