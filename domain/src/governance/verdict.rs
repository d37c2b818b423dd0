//! Governance verdicts

use super::stage::GovernanceStage;
use crate::core::ids::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictDecision {
    Approve,
    Deny,
    Defer,
    Block,
    Escalate,
}

impl VerdictDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictDecision::Approve => "approve",
            VerdictDecision::Deny => "deny",
            VerdictDecision::Defer => "defer",
            VerdictDecision::Block => "block",
            VerdictDecision::Escalate => "escalate",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, VerdictDecision::Approve)
    }
}

impl fmt::Display for VerdictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            RiskLevel::Low
        } else if score < 0.7 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageContribution {
    pub stage: GovernanceStage,
    pub risk: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Mean of the per-stage risk contributions
    pub overall: f64,
    pub level: RiskLevel,
    pub per_stage: Vec<StageContribution>,
}

/// Final outcome of the governance pipeline for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceVerdict {
    pub task_id: TaskId,
    pub decision: VerdictDecision,
    /// Stages that actually ran, in order
    pub stage_path: Vec<GovernanceStage>,
    /// Stage that short-circuited the pipeline, if any
    pub terminal_stage: Option<GovernanceStage>,
    pub risk: RiskAssessment,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub timestamp: u64,
}

impl GovernanceVerdict {
    pub fn is_terminal_early(&self) -> bool {
        self.terminal_stage.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.7), RiskLevel::High);
    }

    #[test]
    fn test_decision_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&VerdictDecision::Escalate).unwrap(),
            "\"escalate\""
        );
    }
}
