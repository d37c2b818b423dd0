//! Governance stages and their outcomes.
//!
//! Each stage reports a risk contribution and a confidence in `[0, 1]`
//! together with a stage-specific finding. [`StageOutcome::terminal`] maps
//! a finding onto the verdict it forces, if any.

use super::verdict::VerdictDecision;
use crate::util::clamp_unit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceStage {
    /// Gate on the consensus band, always first
    Consensus,
    Authority,
    Simulation,
    StressTest,
    ConflictResolution,
    Synthesis,
}

impl GovernanceStage {
    /// The configurable stages, in their fixed order.
    pub const CONFIGURABLE: [GovernanceStage; 4] = [
        GovernanceStage::Authority,
        GovernanceStage::Simulation,
        GovernanceStage::StressTest,
        GovernanceStage::ConflictResolution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GovernanceStage::Consensus => "consensus",
            GovernanceStage::Authority => "authority",
            GovernanceStage::Simulation => "simulation",
            GovernanceStage::StressTest => "stress_test",
            GovernanceStage::ConflictResolution => "conflict_resolution",
            GovernanceStage::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for GovernanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityDecision {
    Granted,
    Denied,
    Vetoed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityOutcome {
    pub decision: AuthorityDecision,
    pub reason: String,
    pub risk: f64,
    pub confidence: f64,
}

impl AuthorityOutcome {
    pub fn granted(reason: impl Into<String>) -> Self {
        Self {
            decision: AuthorityDecision::Granted,
            reason: reason.into(),
            risk: 0.0,
            confidence: 1.0,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            decision: AuthorityDecision::Denied,
            reason: reason.into(),
            risk: 1.0,
            confidence: 1.0,
        }
    }

    pub fn vetoed(reason: impl Into<String>) -> Self {
        Self {
            decision: AuthorityDecision::Vetoed,
            reason: reason.into(),
            risk: 1.0,
            confidence: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRecommendation {
    Proceed,
    Caution,
    RequireHuman,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub recommendation: RiskRecommendation,
    pub risk: f64,
    pub confidence: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressFailure {
    pub scenario: String,
    pub severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressOutcome {
    pub failures: Vec<StressFailure>,
    pub risk: f64,
    pub confidence: f64,
}

impl StressOutcome {
    /// Failures above this severity block outright.
    pub const BLOCKING_SEVERITY: f64 = 0.7;

    pub fn max_severity(&self) -> Option<f64> {
        self.failures.iter().map(|f| f.severity).reduce(f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub description: String,
    pub resolved: bool,
    pub requires_human: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictOutcome {
    pub conflicts: Vec<Conflict>,
    pub risk: f64,
    pub confidence: f64,
}

/// Finding of one configurable stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOutcome {
    Authority(AuthorityOutcome),
    Simulation(SimulationOutcome),
    StressTest(StressOutcome),
    ConflictResolution(ConflictOutcome),
}

impl StageOutcome {
    pub fn stage(&self) -> GovernanceStage {
        match self {
            StageOutcome::Authority(_) => GovernanceStage::Authority,
            StageOutcome::Simulation(_) => GovernanceStage::Simulation,
            StageOutcome::StressTest(_) => GovernanceStage::StressTest,
            StageOutcome::ConflictResolution(_) => GovernanceStage::ConflictResolution,
        }
    }

    pub fn risk(&self) -> f64 {
        clamp_unit(match self {
            StageOutcome::Authority(o) => o.risk,
            StageOutcome::Simulation(o) => o.risk,
            StageOutcome::StressTest(o) => o.risk,
            StageOutcome::ConflictResolution(o) => o.risk,
        })
    }

    pub fn confidence(&self) -> f64 {
        clamp_unit(match self {
            StageOutcome::Authority(o) => o.confidence,
            StageOutcome::Simulation(o) => o.confidence,
            StageOutcome::StressTest(o) => o.confidence,
            StageOutcome::ConflictResolution(o) => o.confidence,
        })
    }

    /// The verdict this finding forces, with its reason.
    pub fn terminal(&self) -> Option<(VerdictDecision, String)> {
        match self {
            StageOutcome::Authority(o) => match o.decision {
                AuthorityDecision::Vetoed => {
                    Some((VerdictDecision::Block, format!("authority veto: {}", o.reason)))
                }
                AuthorityDecision::Denied => {
                    Some((VerdictDecision::Deny, format!("authority denied: {}", o.reason)))
                }
                AuthorityDecision::Granted => None,
            },
            StageOutcome::Simulation(o) => match o.recommendation {
                RiskRecommendation::Deny => Some((
                    VerdictDecision::Block,
                    format!("simulation recommends deny (risk {:.2})", o.risk),
                )),
                RiskRecommendation::RequireHuman => Some((
                    VerdictDecision::Escalate,
                    format!("simulation requires human review (risk {:.2})", o.risk),
                )),
                RiskRecommendation::Proceed | RiskRecommendation::Caution => None,
            },
            StageOutcome::StressTest(o) => {
                let worst = o.max_severity()?;
                let scenarios: Vec<&str> = o.failures.iter().map(|f| f.scenario.as_str()).collect();
                if worst > StressOutcome::BLOCKING_SEVERITY {
                    Some((
                        VerdictDecision::Block,
                        format!("stress test failed severely ({:.2}): {}", worst, scenarios.join(", ")),
                    ))
                } else {
                    Some((
                        VerdictDecision::Defer,
                        format!("stress test failed: {}", scenarios.join(", ")),
                    ))
                }
            }
            StageOutcome::ConflictResolution(o) => o
                .conflicts
                .iter()
                .find(|c| !c.resolved && c.requires_human)
                .map(|c| {
                    (
                        VerdictDecision::Escalate,
                        format!("unresolved conflict needs human authority: {}", c.description),
                    )
                }),
        }
    }

    /// One-line summary for the verdict reasoning.
    pub fn summary(&self) -> String {
        match self {
            StageOutcome::Authority(o) => format!("authority {:?}: {}", o.decision, o.reason),
            StageOutcome::Simulation(o) => {
                format!("simulation {:?} (risk {:.2})", o.recommendation, o.risk)
            }
            StageOutcome::StressTest(o) => format!("stress test: {} failures", o.failures.len()),
            StageOutcome::ConflictResolution(o) => {
                let open = o.conflicts.iter().filter(|c| !c.resolved).count();
                format!("conflicts: {} found, {} unresolved", o.conflicts.len(), open)
            }
        }
        .to_lowercase()
    }
}
