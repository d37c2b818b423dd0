//! Stress test over individual response confidence

use async_trait::async_trait;
use concord_application::{StageContext, StageError, StressTester};
use concord_domain::{StressFailure, StressOutcome};
use serde::{Deserialize, Serialize};

/// Probes every agreeing response: an agreeing participant that was itself
/// unsure is a weak point of the decision.
///
/// Failure severity is how far the confidence falls below `min_confidence`,
/// scaled to `[0, 1]`. A decision carried by fewer than `min_supporters`
/// agreeing responses fails the `thin_support` scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceStressTest {
    pub min_confidence: f64,
    pub min_supporters: usize,
}

impl Default for ConfidenceStressTest {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            min_supporters: 1,
        }
    }
}

#[async_trait]
impl StressTester for ConfidenceStressTest {
    async fn stress_test(&self, ctx: &StageContext<'_>) -> Result<StressOutcome, StageError> {
        let supporters: Vec<_> = ctx
            .responses
            .iter()
            .filter(|r| r.is_usable())
            .filter(|r| ctx.decision.agreeing_participants.contains(&r.participant_id))
            .collect();

        let mut failures: Vec<StressFailure> = supporters
            .iter()
            .filter(|r| r.confidence < self.min_confidence)
            .map(|r| StressFailure {
                scenario: format!("low_confidence:{}", r.participant_id),
                severity: ((self.min_confidence - r.confidence) / self.min_confidence.max(f64::EPSILON))
                    .clamp(0.0, 1.0),
            })
            .collect();

        if supporters.len() < self.min_supporters {
            failures.push(StressFailure {
                scenario: "thin_support".to_string(),
                severity: 1.0 - supporters.len() as f64 / self.min_supporters as f64,
            });
        }

        let mean_confidence = if supporters.is_empty() {
            0.0
        } else {
            supporters.iter().map(|r| r.confidence).sum::<f64>() / supporters.len() as f64
        };
        let risk = failures.iter().map(|f| f.severity).fold(0.0, f64::max);

        Ok(StressOutcome {
            failures,
            risk,
            confidence: mean_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::{ConsensusDecision, ParticipantId, Response, Task, TaskId};

    fn decision(agreeing: &[&str]) -> ConsensusDecision {
        let mut d = ConsensusDecision::without_responses(TaskId::new("t"), "", 0);
        d.agreeing_participants = agreeing.iter().map(|id| ParticipantId::new(*id)).collect();
        d
    }

    async fn run(test: ConfidenceStressTest, decision: &ConsensusDecision, responses: &[Response]) -> StressOutcome {
        let task = Task::new("t", "p");
        let ctx = StageContext {
            task: &task,
            decision,
            responses,
            prior: &[],
        };
        test.stress_test(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_confident_supporters_pass() {
        let responses = vec![Response::new("a", "x", 0.9), Response::new("b", "x", 0.7)];
        let outcome = run(ConfidenceStressTest::default(), &decision(&["a", "b"]), &responses).await;
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.risk, 0.0);
        assert!((outcome.confidence - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unsure_supporter_fails_scenario() {
        let responses = vec![Response::new("a", "x", 0.9), Response::new("b", "x", 0.15)];
        let outcome = run(ConfidenceStressTest::default(), &decision(&["a", "b"]), &responses).await;
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].scenario, "low_confidence:b");
        assert!((outcome.failures[0].severity - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_thin_support() {
        let test = ConfidenceStressTest {
            min_supporters: 2,
            ..Default::default()
        };
        let responses = vec![Response::new("a", "x", 0.9), Response::new("b", "y", 0.9)];
        let outcome = run(test, &decision(&["a"]), &responses).await;
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].scenario, "thin_support");
        assert!((outcome.risk - 0.5).abs() < 1e-9);
    }
}
