//! Trust feedback loop.
//!
//! After a consensus is resolved every responder is nudged toward or away
//! from trust: agreeing with the winning group earns a small reward,
//! dissenting costs twice as much, and the overall agreement level adds a
//! shared bonus or penalty. Weights are always clamped by the pool.

use crate::consensus::ConsensusDecision;
use crate::core::ids::ParticipantId;
use crate::participant::{Participant, ParticipantPool, ParticipantStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Trust adjustment policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustPolicy {
    /// Added when a participant sided with the winning group
    pub agree_delta: f64,
    /// Subtracted when a participant dissented
    pub dissent_delta: f64,
    /// Agreement score above which every responder gets `agreement_adjustment`
    pub high_agreement: f64,
    /// Agreement score below which every responder loses `agreement_adjustment`
    pub low_agreement: f64,
    pub agreement_adjustment: f64,
    /// Trailing trust values kept per participant
    pub history_len: usize,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            agree_delta: 0.01,
            dissent_delta: 0.02,
            high_agreement: 0.8,
            low_agreement: 0.5,
            agreement_adjustment: 0.005,
            history_len: 20,
        }
    }
}

impl TrustPolicy {
    /// Delta for one responder given its side and the overall score.
    pub fn delta(&self, agreed: bool, agreement_score: f64) -> f64 {
        let mut delta = if agreed {
            self.agree_delta
        } else {
            -self.dissent_delta
        };
        if agreement_score > self.high_agreement {
            delta += self.agreement_adjustment;
        } else if agreement_score < self.low_agreement {
            delta -= self.agreement_adjustment;
        }
        delta
    }
}

/// Per-participant feedback record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustRecord {
    pub history: VecDeque<f64>,
    pub agreements: u64,
    pub dissents: u64,
}

/// One applied trust change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAdjustment {
    pub participant_id: ParticipantId,
    pub agreed: bool,
    pub delta: f64,
    pub previous: f64,
    pub updated: f64,
}

/// Observability view of a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStats {
    pub id: ParticipantId,
    pub status: ParticipantStatus,
    pub trust_weight: f64,
    pub last_seen: u64,
    pub capabilities: Vec<String>,
    pub agreements: u64,
    pub dissents: u64,
    pub trust_history: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TrustLedger {
    policy: TrustPolicy,
    records: HashMap<ParticipantId, TrustRecord>,
}

impl TrustLedger {
    pub fn new(policy: TrustPolicy) -> Self {
        Self {
            policy,
            records: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Apply feedback for a resolved decision.
    ///
    /// Responders that have since left the pool are skipped. Calling this
    /// more than once for the same decision double-counts; the caller owns
    /// the exactly-once guarantee.
    pub fn apply(
        &mut self,
        pool: &mut ParticipantPool,
        decision: &ConsensusDecision,
    ) -> Vec<TrustAdjustment> {
        let sides = decision
            .agreeing_participants
            .iter()
            .map(|id| (id, true))
            .chain(decision.dissenting_participants.iter().map(|id| (id, false)));

        let mut adjustments = Vec::new();
        for (id, agreed) in sides {
            let Some(previous) = pool.get(id).map(Participant::trust_weight) else {
                continue;
            };
            let delta = self.policy.delta(agreed, decision.agreement_score);
            let Ok(updated) = pool.update_trust(id, delta) else {
                continue;
            };

            let record = self.records.entry(id.clone()).or_default();
            if agreed {
                record.agreements += 1;
            } else {
                record.dissents += 1;
            }
            record.history.push_back(updated);
            while record.history.len() > self.policy.history_len.max(1) {
                record.history.pop_front();
            }

            adjustments.push(TrustAdjustment {
                participant_id: id.clone(),
                agreed,
                delta,
                previous,
                updated,
            });
        }
        adjustments
    }

    pub fn record(&self, id: &ParticipantId) -> Option<&TrustRecord> {
        self.records.get(id)
    }

    pub fn forget(&mut self, id: &ParticipantId) {
        self.records.remove(id);
    }

    pub fn snapshot(&self) -> HashMap<ParticipantId, TrustRecord> {
        self.records.clone()
    }

    /// Replace records with persisted ones, trimming over-long histories.
    pub fn restore(&mut self, records: HashMap<ParticipantId, TrustRecord>) {
        let limit = self.policy.history_len.max(1);
        self.records = records
            .into_iter()
            .map(|(id, mut record)| {
                while record.history.len() > limit {
                    record.history.pop_front();
                }
                (id, record)
            })
            .collect();
    }

    /// Stats for every registered participant, in id order.
    pub fn stats(&self, pool: &ParticipantPool) -> Vec<ParticipantStats> {
        pool.iter()
            .map(|p| {
                let record = self.records.get(&p.id);
                ParticipantStats {
                    id: p.id.clone(),
                    status: p.status,
                    trust_weight: p.trust_weight(),
                    last_seen: p.last_seen,
                    capabilities: p.capabilities.clone(),
                    agreements: record.map_or(0, |r| r.agreements),
                    dissents: record.map_or(0, |r| r.dissents),
                    trust_history: record
                        .map(|r| r.history.iter().copied().collect())
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ConsensusEngine, Response};
    use crate::core::ids::TaskId;
    use crate::participant::{SelectionSettings, TRUST_MAX, TRUST_MIN};

    fn pool(entries: &[(&str, f64)]) -> ParticipantPool {
        let mut pool = ParticipantPool::new(SelectionSettings::default());
        for (id, trust) in entries {
            pool.register(Participant::new(*id).with_trust(*trust)).unwrap();
        }
        pool
    }

    fn decide(pool: &ParticipantPool, responses: &[Response]) -> ConsensusDecision {
        ConsensusEngine::default()
            .resolve(&TaskId::new("t"), responses, &pool.trust_snapshot(), 1, 0)
            .unwrap()
    }

    fn trust(pool: &ParticipantPool, id: &str) -> f64 {
        pool.get(&ParticipantId::new(id)).unwrap().trust_weight()
    }

    #[test]
    fn test_policy_deltas() {
        let policy = TrustPolicy::default();
        assert!((policy.delta(true, 0.6) - 0.01).abs() < 1e-12);
        assert!((policy.delta(false, 0.6) + 0.02).abs() < 1e-12);
        assert!((policy.delta(true, 0.9) - 0.015).abs() < 1e-12);
        assert!((policy.delta(false, 0.3) + 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_apply_rewards_agreement_and_penalizes_dissent() {
        let mut pool = pool(&[("a", 0.5), ("b", 0.5), ("c", 0.5)]);
        let responses = vec![
            Response::new("a", "x", 0.8),
            Response::new("b", "x", 0.8),
            Response::new("c", "y", 0.8),
        ];
        let decision = decide(&pool, &responses);
        let mut ledger = TrustLedger::default();
        let adjustments = ledger.apply(&mut pool, &decision);

        // score 2/3: neither high nor low
        assert_eq!(adjustments.len(), 3);
        assert!((trust(&pool, "a") - 0.51).abs() < 1e-12);
        assert!((trust(&pool, "c") - 0.48).abs() < 1e-12);

        let record = ledger.record(&ParticipantId::new("c")).unwrap();
        assert_eq!(record.dissents, 1);
        assert_eq!(record.agreements, 0);
    }

    #[test]
    fn test_weights_stay_in_bounds_over_many_rounds() {
        let mut pool = pool(&[("a", 0.99), ("b", 0.11)]);
        let mut ledger = TrustLedger::default();
        let responses = vec![
            Response::new("a", "x", 0.9),
            Response::new("a2", "x", 0.9),
            Response::new("b", "y", 0.9),
        ];
        pool.register(Participant::new("a2").with_trust(0.9)).unwrap();

        for _ in 0..200 {
            let decision = decide(&pool, &responses);
            ledger.apply(&mut pool, &decision);
            for p in pool.iter() {
                assert!((TRUST_MIN..=TRUST_MAX).contains(&p.trust_weight()));
            }
        }
        assert_eq!(trust(&pool, "a"), TRUST_MAX);
        assert_eq!(trust(&pool, "b"), TRUST_MIN);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut pool = pool(&[("a", 0.5)]);
        let mut ledger = TrustLedger::new(TrustPolicy {
            history_len: 3,
            ..Default::default()
        });
        let responses = vec![Response::new("a", "x", 0.9)];
        for _ in 0..5 {
            let decision = decide(&pool, &responses);
            ledger.apply(&mut pool, &decision);
        }
        let stats = ledger.stats(&pool);
        assert_eq!(stats[0].trust_history.len(), 3);
        assert_eq!(stats[0].agreements, 5);
    }

    #[test]
    fn test_departed_participants_are_skipped() {
        let mut pool = pool(&[("a", 0.5), ("b", 0.5)]);
        let responses = vec![Response::new("a", "x", 0.9), Response::new("b", "x", 0.9)];
        let decision = decide(&pool, &responses);
        pool.deregister(&ParticipantId::new("b")).unwrap();

        let adjustments = TrustLedger::default().apply(&mut pool, &decision);
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].participant_id.as_str(), "a");
    }
}
