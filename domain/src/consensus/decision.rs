//! Consensus decision records

use super::method::ConsensusMethod;
use crate::core::ids::{ParticipantId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence band a consensus score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionBand {
    Accept,
    Hedge,
    Block,
}

impl DecisionBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionBand::Accept => "accept",
            DecisionBand::Hedge => "hedge",
            DecisionBand::Block => "block",
        }
    }
}

impl fmt::Display for DecisionBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one aggregation method, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodOutcome {
    pub method: ConsensusMethod,
    /// Output of the winning group
    pub output: String,
    pub score: f64,
    /// False when the method could not produce its own result
    pub genuine: bool,
    /// True when unanimity failed and the weighted tally stood in
    #[serde(default)]
    pub fallback: bool,
}

/// The resolved consensus for a task. Created once, never mutated after
/// it is handed to governance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub task_id: TaskId,
    pub chosen_output: String,
    pub agreement_score: f64,
    pub band: DecisionBand,
    /// `None` when nothing was aggregated (no responses)
    pub method: Option<ConsensusMethod>,
    pub agreeing_participants: Vec<ParticipantId>,
    pub dissenting_participants: Vec<ParticipantId>,
    pub rationale: String,
    #[serde(default)]
    pub alternatives: Vec<MethodOutcome>,
    /// Debate rounds it took to reach this decision
    pub rounds: u32,
    pub timestamp: u64,
}

impl ConsensusDecision {
    /// Decision for a task where no usable response arrived.
    pub fn without_responses(task_id: TaskId, reason: impl Into<String>, now_ms: u64) -> Self {
        Self {
            task_id,
            chosen_output: String::new(),
            agreement_score: 0.0,
            band: DecisionBand::Block,
            method: None,
            agreeing_participants: Vec::new(),
            dissenting_participants: Vec::new(),
            rationale: reason.into(),
            alternatives: Vec::new(),
            rounds: 0,
            timestamp: now_ms,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.band == DecisionBand::Accept
    }

    /// Every participant that contributed a response.
    pub fn responders(&self) -> impl Iterator<Item = &ParticipantId> {
        self.agreeing_participants
            .iter()
            .chain(self.dissenting_participants.iter())
    }

    pub fn response_count(&self) -> usize {
        self.agreeing_participants.len() + self.dissenting_participants.len()
    }

    pub fn has_responses(&self) -> bool {
        self.response_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_responses_blocks_with_zero_score() {
        let decision = ConsensusDecision::without_responses(TaskId::new("t"), "all timed out", 7);
        assert_eq!(decision.band, DecisionBand::Block);
        assert_eq!(decision.agreement_score, 0.0);
        assert!(decision.method.is_none());
        assert!(!decision.has_responses());
    }

    #[test]
    fn test_band_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DecisionBand::Hedge).unwrap(), "\"hedge\"");
    }
}
