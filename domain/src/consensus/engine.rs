//! Consensus engine.
//!
//! Responses are sorted by participant id, grouped, and tallied once per
//! enabled method. The governing method is the first in
//! [`ConsensusMethod::PRIORITY`] whose result is genuine; scores are never
//! compared across methods.

use super::decision::{ConsensusDecision, DecisionBand, MethodOutcome};
use super::grouping::{ExactMatchGrouper, OutputGrouper, SimilarityGrouper};
use super::method::{ConsensusMethod, WeightStrategy};
use super::response::{Response, sort_responses};
use crate::core::error::DomainError;
use crate::core::ids::{ParticipantId, TaskId};
use crate::participant::TRUST_DEFAULT;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const WEIGHT_EPSILON: f64 = 1e-9;

/// How outputs are bucketed before tallying.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// Identical after normalization
    #[default]
    Exact,
    /// Token Jaccard similarity at or above `threshold`
    Jaccard { threshold: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusSettings {
    /// Methods to compute; empty means all of them
    pub methods: Vec<ConsensusMethod>,
    pub agreement_threshold: f64,
    pub hedge_threshold: f64,
    pub grouping: GroupingStrategy,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            methods: ConsensusMethod::PRIORITY.to_vec(),
            agreement_threshold: 0.7,
            hedge_threshold: 0.4,
            grouping: GroupingStrategy::Exact,
        }
    }
}

impl ConsensusSettings {
    pub fn with_methods(mut self, methods: Vec<ConsensusMethod>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_thresholds(mut self, agreement: f64, hedge: f64) -> Self {
        self.agreement_threshold = agreement;
        self.hedge_threshold = hedge;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingStrategy) -> Self {
        self.grouping = grouping;
        self
    }

    /// Enabled methods in priority order, without duplicates.
    pub fn enabled_methods(&self) -> Vec<ConsensusMethod> {
        ConsensusMethod::PRIORITY
            .into_iter()
            .filter(|m| self.methods.is_empty() || self.methods.contains(m))
            .collect()
    }

    pub fn band(&self, score: f64) -> DecisionBand {
        if score >= self.agreement_threshold {
            DecisionBand::Accept
        } else if score >= self.hedge_threshold {
            DecisionBand::Hedge
        } else {
            DecisionBand::Block
        }
    }
}

/// A response with its resolved trust weight and group.
struct Ballot<'a> {
    response: &'a Response,
    trust: f64,
    group: usize,
}

struct Tally {
    group: usize,
    score: f64,
    total_weight: f64,
}

/// One weighted tally; every method is an instance of it.
fn tally(ballots: &[Ballot<'_>], group_count: usize, strategy: WeightStrategy) -> Tally {
    let mut weights = vec![0.0; group_count];
    let mut counts = vec![0usize; group_count];
    let mut total_weight = 0.0;

    for ballot in ballots {
        let weight = strategy.weight(ballot.trust, ballot.response.confidence);
        weights[ballot.group] += weight;
        counts[ballot.group] += 1;
        total_weight += weight;
    }

    // Groups are numbered by first appearance, so scanning upward keeps the
    // earliest group on a full tie.
    let mut best = 0;
    for group in 1..group_count {
        let diff = weights[group] - weights[best];
        if diff > WEIGHT_EPSILON || (diff.abs() <= WEIGHT_EPSILON && counts[group] > counts[best]) {
            best = group;
        }
    }

    let score = if total_weight > 0.0 {
        weights[best] / total_weight
    } else {
        0.0
    };
    Tally {
        group: best,
        score,
        total_weight,
    }
}

pub struct ConsensusEngine {
    settings: ConsensusSettings,
    grouper: Box<dyn OutputGrouper>,
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(ConsensusSettings::default())
    }
}

impl ConsensusEngine {
    pub fn new(settings: ConsensusSettings) -> Self {
        let grouper: Box<dyn OutputGrouper> = match settings.grouping {
            GroupingStrategy::Exact => Box::new(ExactMatchGrouper),
            GroupingStrategy::Jaccard { threshold } => {
                Box::new(SimilarityGrouper::jaccard(threshold))
            }
        };
        Self { settings, grouper }
    }

    /// Replace the grouper, e.g. with an embedding-based similarity.
    pub fn with_grouper(mut self, grouper: impl OutputGrouper + 'static) -> Self {
        self.grouper = Box::new(grouper);
        self
    }

    pub fn settings(&self) -> &ConsensusSettings {
        &self.settings
    }

    /// Resolve a set of responses into one decision.
    ///
    /// `trust` is the trust snapshot taken when the task was dispatched;
    /// participants missing from it weigh [`TRUST_DEFAULT`]. Errored
    /// responses and repeated participant ids are ignored. `round` is the
    /// debate round the responses belong to, starting at 1.
    pub fn resolve(
        &self,
        task_id: &TaskId,
        responses: &[Response],
        trust: &HashMap<ParticipantId, f64>,
        round: u32,
        now_ms: u64,
    ) -> Result<ConsensusDecision, DomainError> {
        let mut usable: Vec<Response> = responses.iter().filter(|r| r.is_usable()).cloned().collect();
        sort_responses(&mut usable);
        let mut seen = HashSet::new();
        usable.retain(|r| seen.insert(r.participant_id.clone()));

        if usable.is_empty() {
            return Err(DomainError::NoResponses {
                task_id: task_id.to_string(),
            });
        }

        let outputs: Vec<&str> = usable.iter().map(|r| r.output.as_str()).collect();
        let groups = self.grouper.assign(&outputs);
        let group_count = groups.iter().copied().max().map_or(0, |g| g + 1);

        let ballots: Vec<Ballot<'_>> = usable
            .iter()
            .zip(&groups)
            .map(|(response, &group)| Ballot {
                response,
                trust: trust
                    .get(&response.participant_id)
                    .copied()
                    .unwrap_or(TRUST_DEFAULT),
                group,
            })
            .collect();

        // Representative output of a group is its first member's output
        let representative = |group: usize| -> String {
            ballots
                .iter()
                .find(|b| b.group == group)
                .map(|b| b.response.output.clone())
                .unwrap_or_default()
        };

        let mut evaluated: Vec<(MethodOutcome, usize)> = Vec::new();
        for method in self.settings.enabled_methods() {
            let (result, genuine, fallback) = match method {
                ConsensusMethod::Unanimous if group_count == 1 => (
                    Tally {
                        group: 0,
                        score: 1.0,
                        total_weight: ballots.len() as f64,
                    },
                    true,
                    false,
                ),
                ConsensusMethod::Unanimous => {
                    (tally(&ballots, group_count, WeightStrategy::Trust), false, true)
                }
                ConsensusMethod::Majority => {
                    (tally(&ballots, group_count, WeightStrategy::Uniform), true, false)
                }
                other => {
                    let t = tally(&ballots, group_count, other.weight_strategy());
                    let genuine = t.total_weight > 0.0;
                    (t, genuine, false)
                }
            };
            evaluated.push((
                MethodOutcome {
                    method,
                    output: representative(result.group),
                    score: result.score,
                    genuine,
                    fallback,
                },
                result.group,
            ));
        }

        let selected = evaluated
            .iter()
            .find(|(outcome, _)| outcome.genuine)
            .or_else(|| evaluated.first());
        let Some((outcome, winning_group)) = selected.cloned() else {
            return Err(DomainError::NoResponses {
                task_id: task_id.to_string(),
            });
        };

        let (agreeing, dissenting): (Vec<&Ballot<'_>>, Vec<&Ballot<'_>>) =
            ballots.iter().partition(|b| b.group == winning_group);

        let method = if outcome.fallback {
            ConsensusMethod::Weighted
        } else {
            outcome.method
        };
        let band = if outcome.method == ConsensusMethod::Unanimous && outcome.genuine {
            DecisionBand::Accept
        } else {
            self.settings.band(outcome.score)
        };

        let mut rationale = format!(
            "{}: {} of {} responses agree (score {:.3}, {} groups)",
            method,
            agreeing.len(),
            ballots.len(),
            outcome.score,
            group_count
        );
        if outcome.fallback {
            rationale.push_str("; unanimity not reached, fell back to weighted");
        }
        if !outcome.genuine {
            rationale.push_str("; no method produced a genuine result");
        }

        Ok(ConsensusDecision {
            task_id: task_id.clone(),
            chosen_output: outcome.output.clone(),
            agreement_score: outcome.score,
            band,
            method: Some(method),
            agreeing_participants: agreeing
                .iter()
                .map(|b| b.response.participant_id.clone())
                .collect(),
            dissenting_participants: dissenting
                .iter()
                .map(|b| b.response.participant_id.clone())
                .collect(),
            rationale,
            alternatives: evaluated.into_iter().map(|(o, _)| o).collect(),
            rounds: round.max(1),
            timestamp: now_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trust_of(pairs: &[(&str, f64)]) -> HashMap<ParticipantId, f64> {
        pairs
            .iter()
            .map(|(id, w)| (ParticipantId::new(*id), *w))
            .collect()
    }

    fn five_way_split() -> (Vec<Response>, HashMap<ParticipantId, f64>) {
        let responses = vec![
            Response::new("p1", "A", 0.9),
            Response::new("p2", "A", 0.9),
            Response::new("p3", "A", 0.9),
            Response::new("p4", "B", 0.6),
            Response::new("p5", "B", 0.6),
        ];
        let trust = trust_of(&[
            ("p1", 0.8),
            ("p2", 0.8),
            ("p3", 0.8),
            ("p4", 0.5),
            ("p5", 0.5),
        ]);
        (responses, trust)
    }

    fn ids(list: &[ParticipantId]) -> Vec<&str> {
        list.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_identical_outputs_are_unanimous() {
        let engine = ConsensusEngine::default();
        let responses = vec![
            Response::new("a", "Deploy", 0.4),
            Response::new("b", " deploy ", 0.9),
            Response::new("c", "DEPLOY", 0.2),
        ];
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 1, 0)
            .unwrap();

        assert_eq!(decision.method, Some(ConsensusMethod::Unanimous));
        assert_eq!(decision.agreement_score, 1.0);
        assert_eq!(decision.band, DecisionBand::Accept);
        assert!(decision.dissenting_participants.is_empty());
    }

    #[test]
    fn test_weighted_three_to_two_accepts() {
        let engine = ConsensusEngine::new(
            ConsensusSettings::default()
                .with_methods(vec![ConsensusMethod::Weighted, ConsensusMethod::Majority]),
        );
        let (responses, trust) = five_way_split();
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &trust, 1, 0)
            .unwrap();

        assert_eq!(decision.method, Some(ConsensusMethod::Weighted));
        assert_eq!(decision.chosen_output, "A");
        assert!((decision.agreement_score - 2.4 / 3.4).abs() < 1e-9);
        assert_eq!(decision.band, DecisionBand::Accept);
        assert_eq!(ids(&decision.dissenting_participants), vec!["p4", "p5"]);
    }

    #[test]
    fn test_priority_prefers_trust_weighted_over_raw_scores() {
        let engine = ConsensusEngine::default();
        let (responses, trust) = five_way_split();
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &trust, 1, 0)
            .unwrap();

        // Unanimous is computed but only as a fallback, so trust_weighted governs
        assert_eq!(decision.method, Some(ConsensusMethod::TrustWeighted));
        assert_eq!(decision.alternatives.len(), 5);
        let unanimous = &decision.alternatives[0];
        assert_eq!(unanimous.method, ConsensusMethod::Unanimous);
        assert!(unanimous.fallback);
        assert!(!unanimous.genuine);

        let majority = decision
            .alternatives
            .iter()
            .find(|o| o.method == ConsensusMethod::Majority)
            .unwrap();
        assert!((majority.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_weighted_uses_self_reported_confidence() {
        let engine = ConsensusEngine::new(
            ConsensusSettings::default().with_methods(vec![ConsensusMethod::ConfidenceWeighted]),
        );
        let responses = vec![
            Response::new("a", "yes", 0.2),
            Response::new("b", "yes", 0.2),
            Response::new("c", "no", 0.9),
        ];
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 1, 0)
            .unwrap();
        assert_eq!(decision.chosen_output, "no");
        assert!((decision.agreement_score - 0.9 / 1.3).abs() < 1e-9);
        assert_eq!(decision.band, DecisionBand::Hedge);
    }

    #[test]
    fn test_zero_confidence_is_not_genuine() {
        let engine = ConsensusEngine::new(ConsensusSettings::default().with_methods(vec![
            ConsensusMethod::ConfidenceWeighted,
            ConsensusMethod::Majority,
        ]));
        let responses = vec![Response::new("a", "x", 0.0), Response::new("b", "y", 0.0)];
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 1, 0)
            .unwrap();
        assert_eq!(decision.method, Some(ConsensusMethod::Majority));
    }

    #[test]
    fn test_only_unanimous_enabled_falls_back_to_weighted() {
        let engine = ConsensusEngine::new(
            ConsensusSettings::default().with_methods(vec![ConsensusMethod::Unanimous]),
        );
        let (responses, trust) = five_way_split();
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &trust, 1, 0)
            .unwrap();
        assert_eq!(decision.method, Some(ConsensusMethod::Weighted));
        assert!(decision.rationale.contains("fell back"));
        assert_eq!(decision.chosen_output, "A");
    }

    #[test]
    fn test_tie_breaks_by_count_then_first_appearance() {
        let engine = ConsensusEngine::new(
            ConsensusSettings::default().with_methods(vec![ConsensusMethod::Weighted]),
        );
        // "x" weight 1.0 from two members, "y" weight 1.0 from one member
        let trust = trust_of(&[("a", 0.5), ("b", 0.5), ("c", 1.0)]);
        let responses = vec![
            Response::new("c", "y", 0.5),
            Response::new("a", "x", 0.5),
            Response::new("b", "x", 0.5),
        ];
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &trust, 1, 0)
            .unwrap();
        assert_eq!(decision.chosen_output, "x");

        let even = vec![Response::new("b", "late", 0.5), Response::new("a", "early", 0.5)];
        let decision = engine
            .resolve(&TaskId::new("t"), &even, &HashMap::new(), 1, 0)
            .unwrap();
        assert_eq!(decision.chosen_output, "early");
        assert_eq!(decision.band, DecisionBand::Hedge);
    }

    #[test]
    fn test_partition_covers_each_responder_exactly_once() {
        let engine = ConsensusEngine::default();
        let responses = vec![
            Response::new("e", "three", 0.5),
            Response::new("a", "one", 0.5),
            Response::new("d", "two", 0.5),
            Response::new("b", "one", 0.5),
            Response::new("c", "two", 0.5),
            Response::new("c", "duplicate", 0.5),
            Response::new("f", "", 0.0).with_error("backend failure"),
        ];
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 1, 0)
            .unwrap();

        let mut all: Vec<&str> = decision.responders().map(|p| p.as_str()).collect();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(decision.response_count(), 5);
    }

    #[test]
    fn test_low_agreement_blocks() {
        let engine = ConsensusEngine::new(
            ConsensusSettings::default().with_methods(vec![ConsensusMethod::Majority]),
        );
        let responses: Vec<Response> = ["a", "b", "c"]
            .iter()
            .map(|id| Response::new(*id, format!("answer from {}", id), 0.5))
            .collect();
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 1, 0)
            .unwrap();
        assert!((decision.agreement_score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(decision.band, DecisionBand::Block);
    }

    #[test]
    fn test_jaccard_grouping_merges_near_duplicates() {
        let engine = ConsensusEngine::new(
            ConsensusSettings::default().with_grouping(GroupingStrategy::Jaccard { threshold: 0.6 }),
        );
        let responses = vec![
            Response::new("a", "restart the api service", 0.8),
            Response::new("b", "restart the api service now", 0.8),
        ];
        let decision = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 1, 0)
            .unwrap();
        assert_eq!(decision.method, Some(ConsensusMethod::Unanimous));
        assert_eq!(decision.chosen_output, "restart the api service");
    }

    #[test]
    fn test_decision_carries_the_debate_round() {
        let engine = ConsensusEngine::default();
        let responses = vec![Response::new("a", "x", 0.9), Response::new("b", "x", 0.9)];
        let third = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 3, 0)
            .unwrap();
        assert_eq!(third.rounds, 3);

        let unnumbered = engine
            .resolve(&TaskId::new("t"), &responses, &HashMap::new(), 0, 0)
            .unwrap();
        assert_eq!(unnumbered.rounds, 1);
    }

    #[test]
    fn test_no_usable_responses_is_an_error() {
        let engine = ConsensusEngine::default();
        let responses = vec![Response::new("a", "", 0.0).with_error("timeout")];
        let err = engine
            .resolve(&TaskId::new("t-9"), &responses, &HashMap::new(), 1, 0)
            .unwrap_err();
        assert!(err.is_no_responses());
    }
}
