//! Conflict detection between the chosen output and its dissenters

use super::dissent_ratio;
use async_trait::async_trait;
use concord_application::{ConflictResolver, StageContext, StageError};
use concord_domain::consensus::normalize_output;
use concord_domain::{Conflict, ConflictOutcome, DecisionBand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reports one conflict per distinct dissenting output.
///
/// A conflict is resolved by the consensus itself when the decision was
/// accepted, or when dissent stays at or below `max_dissent_ratio`.
/// Otherwise it needs a human authority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissentConflictResolver {
    pub max_dissent_ratio: f64,
}

impl Default for DissentConflictResolver {
    fn default() -> Self {
        Self {
            max_dissent_ratio: 0.34,
        }
    }
}

#[async_trait]
impl ConflictResolver for DissentConflictResolver {
    async fn resolve(&self, ctx: &StageContext<'_>) -> Result<ConflictOutcome, StageError> {
        let chosen = normalize_output(&ctx.decision.chosen_output);
        let alternatives: BTreeSet<String> = ctx
            .responses
            .iter()
            .filter(|r| ctx.decision.dissenting_participants.contains(&r.participant_id))
            .map(|r| normalize_output(&r.output))
            .filter(|o| *o != chosen)
            .collect();

        let ratio = dissent_ratio(ctx.decision);
        let resolved =
            ctx.decision.band == DecisionBand::Accept || ratio <= self.max_dissent_ratio;

        let conflicts: Vec<Conflict> = alternatives
            .into_iter()
            .map(|alternative| Conflict {
                description: format!("'{}' vs '{}'", chosen, alternative),
                resolved,
                requires_human: !resolved,
            })
            .collect();

        Ok(ConflictOutcome {
            risk: if conflicts.is_empty() { 0.0 } else { ratio },
            confidence: 1.0 - ratio,
            conflicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::{ConsensusDecision, ParticipantId, Response, Task, TaskId};

    fn setup(band: DecisionBand) -> (ConsensusDecision, Vec<Response>) {
        let mut d = ConsensusDecision::without_responses(TaskId::new("t"), "", 0);
        d.band = band;
        d.chosen_output = "ship".to_string();
        d.agreeing_participants = vec![ParticipantId::new("a"), ParticipantId::new("b")];
        d.dissenting_participants = vec![ParticipantId::new("c"), ParticipantId::new("d")];
        let responses = vec![
            Response::new("a", "ship", 0.9),
            Response::new("b", "Ship", 0.9),
            Response::new("c", "hold", 0.9),
            Response::new("d", "HOLD ", 0.9),
        ];
        (d, responses)
    }

    async fn resolve(decision: &ConsensusDecision, responses: &[Response]) -> ConflictOutcome {
        let task = Task::new("t", "p");
        let ctx = StageContext {
            task: &task,
            decision,
            responses,
            prior: &[],
        };
        DissentConflictResolver::default().resolve(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_heavy_dissent_on_hedged_decision_needs_human() {
        let (decision, responses) = setup(DecisionBand::Hedge);
        let outcome = resolve(&decision, &responses).await;
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(outcome.conflicts[0].requires_human);
        assert!(!outcome.conflicts[0].resolved);
        assert_eq!(outcome.risk, 0.5);
    }

    #[tokio::test]
    async fn test_accepted_decision_resolves_conflicts() {
        let (decision, responses) = setup(DecisionBand::Accept);
        let outcome = resolve(&decision, &responses).await;
        assert!(outcome.conflicts.iter().all(|c| c.resolved && !c.requires_human));
    }

    #[tokio::test]
    async fn test_no_dissent_no_conflicts() {
        let (mut decision, responses) = setup(DecisionBand::Hedge);
        decision.dissenting_participants.clear();
        let outcome = resolve(&decision, &responses).await;
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.risk, 0.0);
        assert_eq!(outcome.confidence, 1.0);
    }
}
