//! Governance pipeline settings.

use concord_domain::{GovernanceStage, SynthesisWeights};
use std::time::Duration;

/// Which stages run, how long each may take, and how the final confidence
/// is blended. Stage order is fixed; disabling a stage skips it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub authority: bool,
    pub simulation: bool,
    pub stress_test: bool,
    pub conflict_resolution: bool,
    /// Bound on a single stage evaluation
    pub stage_timeout: Duration,
    pub weights: SynthesisWeights,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            authority: true,
            simulation: true,
            stress_test: true,
            conflict_resolution: true,
            stage_timeout: Duration::from_secs(10),
            weights: SynthesisWeights::default(),
        }
    }
}

impl PipelineSettings {
    pub fn is_enabled(&self, stage: GovernanceStage) -> bool {
        match stage {
            GovernanceStage::Authority => self.authority,
            GovernanceStage::Simulation => self.simulation,
            GovernanceStage::StressTest => self.stress_test,
            GovernanceStage::ConflictResolution => self.conflict_resolution,
            GovernanceStage::Consensus | GovernanceStage::Synthesis => true,
        }
    }

    pub fn with_stage(mut self, stage: GovernanceStage, enabled: bool) -> Self {
        match stage {
            GovernanceStage::Authority => self.authority = enabled,
            GovernanceStage::Simulation => self.simulation = enabled,
            GovernanceStage::StressTest => self.stress_test = enabled,
            GovernanceStage::ConflictResolution => self.conflict_resolution = enabled,
            GovernanceStage::Consensus | GovernanceStage::Synthesis => {}
        }
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Enabled configurable stages, in execution order.
    pub fn enabled_stages(&self) -> Vec<GovernanceStage> {
        GovernanceStage::CONFIGURABLE
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabling_keeps_order() {
        let settings = PipelineSettings::default().with_stage(GovernanceStage::Simulation, false);
        assert_eq!(
            settings.enabled_stages(),
            vec![
                GovernanceStage::Authority,
                GovernanceStage::StressTest,
                GovernanceStage::ConflictResolution
            ]
        );
    }
}
