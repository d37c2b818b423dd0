//! Pipeline trace and final synthesis.
//!
//! [`PipelineTrace`] is the pure state machine behind the governance
//! pipeline: the caller feeds it the consensus decision and then each stage
//! outcome in order, and stops as soon as a call returns a terminal verdict.

use super::stage::{GovernanceStage, StageOutcome};
use super::verdict::{
    GovernanceVerdict, RiskAssessment, RiskLevel, StageContribution, VerdictDecision,
};
use crate::consensus::{ConsensusDecision, DecisionBand};
use crate::core::ids::TaskId;
use serde::{Deserialize, Serialize};

/// Weights of each stage's confidence in the final blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisWeights {
    pub consensus: f64,
    pub authority: f64,
    pub simulation: f64,
    pub stress_test: f64,
    pub conflict_resolution: f64,
}

impl Default for SynthesisWeights {
    fn default() -> Self {
        Self {
            consensus: 0.4,
            authority: 0.15,
            simulation: 0.2,
            stress_test: 0.15,
            conflict_resolution: 0.1,
        }
    }
}

impl SynthesisWeights {
    pub fn weight(&self, stage: GovernanceStage) -> f64 {
        match stage {
            GovernanceStage::Consensus => self.consensus,
            GovernanceStage::Authority => self.authority,
            GovernanceStage::Simulation => self.simulation,
            GovernanceStage::StressTest => self.stress_test,
            GovernanceStage::ConflictResolution => self.conflict_resolution,
            GovernanceStage::Synthesis => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineTrace {
    task_id: TaskId,
    weights: SynthesisWeights,
    path: Vec<GovernanceStage>,
    contributions: Vec<StageContribution>,
    reasoning: Vec<String>,
}

impl PipelineTrace {
    pub fn new(task_id: TaskId, weights: SynthesisWeights) -> Self {
        Self {
            task_id,
            weights,
            path: Vec::new(),
            contributions: Vec::new(),
            reasoning: Vec::new(),
        }
    }

    pub fn path(&self) -> &[GovernanceStage] {
        &self.path
    }

    /// Gate on the consensus band. A blocked consensus ends the pipeline.
    pub fn record_consensus(
        &mut self,
        decision: &ConsensusDecision,
        now_ms: u64,
    ) -> Option<GovernanceVerdict> {
        let score = decision.agreement_score;
        self.push(GovernanceStage::Consensus, 1.0 - score, score);
        self.reasoning.push(format!(
            "consensus {} (score {:.3}): {}",
            decision.band, score, decision.rationale
        ));

        if decision.band == DecisionBand::Block {
            return Some(self.terminate(
                GovernanceStage::Consensus,
                VerdictDecision::Block,
                "consensus too weak to act on".to_string(),
                now_ms,
            ));
        }
        None
    }

    /// Record a stage finding; returns the verdict when it is terminal.
    pub fn record(&mut self, outcome: &StageOutcome, now_ms: u64) -> Option<GovernanceVerdict> {
        let stage = outcome.stage();
        self.push(stage, outcome.risk(), outcome.confidence());
        self.reasoning.push(outcome.summary());

        let (decision, reason) = outcome.terminal()?;
        Some(self.terminate(stage, decision, reason, now_ms))
    }

    /// A stage that failed to evaluate closes the pipeline as `block`.
    pub fn fail(
        &mut self,
        stage: GovernanceStage,
        cause: &str,
        now_ms: u64,
    ) -> GovernanceVerdict {
        self.push(stage, 1.0, 0.0);
        self.terminate(
            stage,
            VerdictDecision::Block,
            format!("stage {} failed: {}", stage, cause),
            now_ms,
        )
    }

    /// No stage short-circuited: approve with the synthesized assessment.
    pub fn finish(mut self, now_ms: u64) -> GovernanceVerdict {
        self.path.push(GovernanceStage::Synthesis);
        self.reasoning
            .push("all enabled stages passed; approved".to_string());
        self.verdict(VerdictDecision::Approve, None, now_ms)
    }

    fn push(&mut self, stage: GovernanceStage, risk: f64, confidence: f64) {
        self.path.push(stage);
        self.contributions.push(StageContribution {
            stage,
            risk: crate::util::clamp_unit(risk),
            confidence: crate::util::clamp_unit(confidence),
        });
    }

    fn terminate(
        &mut self,
        stage: GovernanceStage,
        decision: VerdictDecision,
        reason: String,
        now_ms: u64,
    ) -> GovernanceVerdict {
        self.reasoning.push(reason);
        self.verdict(decision, Some(stage), now_ms)
    }

    fn verdict(
        &self,
        decision: VerdictDecision,
        terminal_stage: Option<GovernanceStage>,
        now_ms: u64,
    ) -> GovernanceVerdict {
        let overall = if self.contributions.is_empty() {
            1.0
        } else {
            self.contributions.iter().map(|c| c.risk).sum::<f64>() / self.contributions.len() as f64
        };

        let weight_sum: f64 = self
            .contributions
            .iter()
            .map(|c| self.weights.weight(c.stage))
            .sum();
        let confidence = if weight_sum > 0.0 {
            self.contributions
                .iter()
                .map(|c| c.confidence * self.weights.weight(c.stage))
                .sum::<f64>()
                / weight_sum
        } else if self.contributions.is_empty() {
            0.0
        } else {
            self.contributions.iter().map(|c| c.confidence).sum::<f64>()
                / self.contributions.len() as f64
        };

        GovernanceVerdict {
            task_id: self.task_id.clone(),
            decision,
            stage_path: self.path.clone(),
            terminal_stage,
            risk: RiskAssessment {
                overall,
                level: RiskLevel::from_score(overall),
                per_stage: self.contributions.clone(),
            },
            confidence,
            reasoning: self.reasoning.clone(),
            timestamp: now_ms,
        }
    }
}
