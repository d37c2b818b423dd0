//! Outcome simulation from the shape of the consensus

use super::dissent_ratio;
use async_trait::async_trait;
use concord_application::{Simulator, StageContext, StageError};
use concord_domain::{RiskRecommendation, SimulationOutcome, TaskPriority};
use serde::{Deserialize, Serialize};

/// Estimates action risk from agreement, dissent and task priority.
///
/// `risk = (1 - agreement) * 0.6 + dissent_ratio * 0.3 + priority_weight * 0.1`,
/// then mapped onto a recommendation by the configured cut-offs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusRiskSimulator {
    /// Risk at or above which the simulator advises caution
    pub caution_at: f64,
    /// Risk at or above which a human must review
    pub require_human_at: f64,
    /// Risk at or above which the action is denied
    pub deny_at: f64,
}

impl Default for ConsensusRiskSimulator {
    fn default() -> Self {
        Self {
            caution_at: 0.3,
            require_human_at: 0.6,
            deny_at: 0.85,
        }
    }
}

impl ConsensusRiskSimulator {
    fn priority_weight(priority: TaskPriority) -> f64 {
        match priority {
            TaskPriority::Low => 0.0,
            TaskPriority::Normal => 0.25,
            TaskPriority::High => 0.6,
            TaskPriority::Critical => 1.0,
        }
    }

    fn recommend(&self, risk: f64) -> RiskRecommendation {
        if risk >= self.deny_at {
            RiskRecommendation::Deny
        } else if risk >= self.require_human_at {
            RiskRecommendation::RequireHuman
        } else if risk >= self.caution_at {
            RiskRecommendation::Caution
        } else {
            RiskRecommendation::Proceed
        }
    }
}

#[async_trait]
impl Simulator for ConsensusRiskSimulator {
    async fn simulate(&self, ctx: &StageContext<'_>) -> Result<SimulationOutcome, StageError> {
        let agreement = ctx.decision.agreement_score;
        let dissent = dissent_ratio(ctx.decision);
        let priority = Self::priority_weight(ctx.task.priority);
        let risk = ((1.0 - agreement) * 0.6 + dissent * 0.3 + priority * 0.1).clamp(0.0, 1.0);

        let mut notes = vec![format!(
            "agreement {:.2}, dissent {:.2}, priority {}",
            agreement, dissent, ctx.task.priority
        )];
        let earlier_risk = ctx.prior.iter().map(|o| o.risk()).fold(0.0, f64::max);
        if earlier_risk > risk {
            notes.push(format!("earlier stages reported risk up to {:.2}", earlier_risk));
        }

        Ok(SimulationOutcome {
            recommendation: self.recommend(risk),
            risk,
            confidence: agreement,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::{ConsensusDecision, DecisionBand, ParticipantId, Task, TaskId};

    fn decision(score: f64, agree: usize, dissent: usize) -> ConsensusDecision {
        let mut d = ConsensusDecision::without_responses(TaskId::new("t"), "", 0);
        d.agreement_score = score;
        d.band = DecisionBand::Accept;
        d.agreeing_participants = (0..agree).map(|i| ParticipantId::new(format!("a{i}"))).collect();
        d.dissenting_participants =
            (0..dissent).map(|i| ParticipantId::new(format!("d{i}"))).collect();
        d
    }

    async fn simulate(task: &Task, decision: &ConsensusDecision) -> SimulationOutcome {
        let ctx = StageContext {
            task,
            decision,
            responses: &[],
            prior: &[],
        };
        ConsensusRiskSimulator::default().simulate(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_strong_agreement_proceeds() {
        let outcome = simulate(&Task::new("t", "p"), &decision(1.0, 3, 0)).await;
        assert_eq!(outcome.recommendation, RiskRecommendation::Proceed);
        assert!((outcome.risk - 0.025).abs() < 1e-9);
        assert_eq!(outcome.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_split_critical_task_requires_human() {
        let task = Task::new("t", "p").with_priority(TaskPriority::Critical);
        // 0.7 * 0.6 + 0.5 * 0.3 + 0.1 = 0.67
        let outcome = simulate(&task, &decision(0.3, 1, 1)).await;
        assert_eq!(outcome.recommendation, RiskRecommendation::RequireHuman);
    }

    #[test]
    fn test_cut_offs() {
        let sim = ConsensusRiskSimulator::default();
        assert_eq!(sim.recommend(0.29), RiskRecommendation::Proceed);
        assert_eq!(sim.recommend(0.3), RiskRecommendation::Caution);
        assert_eq!(sim.recommend(0.6), RiskRecommendation::RequireHuman);
        assert_eq!(sim.recommend(0.9), RiskRecommendation::Deny);
    }
}
