//! Shared council state.
//!
//! One explicitly owned store for everything tasks share: the participant
//! pool, the trust ledger, the throttle controller and the decision
//! history. Each piece sits behind its own lock. When both the pool and the
//! ledger are needed they are always locked in that order.

use crate::config::GovernorConfig;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use concord_domain::util::current_timestamp;
use concord_domain::{
    ConsensusDecision, ConsensusHistory, DomainError, LoadMetrics, LoadSample,
    LoadThrottleController, ModeTransition, Participant, ParticipantId, ParticipantPool,
    ParticipantStats, ParticipantStatus, PersistedState, ThrottleMode, TrustLedger,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

pub struct CouncilState {
    pub(crate) pool: Mutex<ParticipantPool>,
    pub(crate) ledger: Mutex<TrustLedger>,
    pub(crate) throttle: RwLock<LoadThrottleController>,
    pub(crate) history: Mutex<ConsensusHistory>,
    audit: Arc<dyn AuditLogger>,
}

impl CouncilState {
    pub fn new(config: &GovernorConfig) -> Self {
        Self {
            pool: Mutex::new(ParticipantPool::new(config.pool)),
            ledger: Mutex::new(TrustLedger::new(config.trust)),
            throttle: RwLock::new(LoadThrottleController::new(config.throttle.clone())),
            history: Mutex::new(ConsensusHistory::new(config.history_capacity)),
            audit: Arc::new(NoAuditLogger),
        }
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub(crate) fn audit(&self) -> &dyn AuditLogger {
        self.audit.as_ref()
    }

    // ==================== Participants ====================

    pub async fn register_participant(&self, participant: Participant) -> Result<(), DomainError> {
        let id = participant.id.clone();
        self.pool.lock().await.register(participant)?;
        info!(participant = %id, "Participant registered");
        Ok(())
    }

    /// Remove a participant; it also disappears from in-flight selections.
    pub async fn deregister_participant(&self, id: &ParticipantId) -> Result<Participant, DomainError> {
        let mut pool = self.pool.lock().await;
        let removed = pool.deregister(id)?;
        self.ledger.lock().await.forget(id);
        info!(participant = %id, "Participant deregistered");
        Ok(removed)
    }

    pub async fn heartbeat(&self, id: &ParticipantId) -> Result<(), DomainError> {
        self.pool.lock().await.heartbeat(id, current_timestamp())
    }

    pub async fn set_participant_status(
        &self,
        id: &ParticipantId,
        status: ParticipantStatus,
    ) -> Result<(), DomainError> {
        self.pool.lock().await.set_status(id, status)?;
        info!(participant = %id, status = %status, "Participant status changed");
        Ok(())
    }

    pub async fn participant_stats(&self) -> Vec<ParticipantStats> {
        let pool = self.pool.lock().await;
        let ledger = self.ledger.lock().await;
        ledger.stats(&pool)
    }

    // ==================== Throttle ====================

    pub async fn current_mode(&self) -> ThrottleMode {
        self.throttle.read().await.current_mode()
    }

    pub async fn load_metrics(&self) -> LoadMetrics {
        self.throttle.read().await.metrics()
    }

    /// Manual override; always accepted and always recorded.
    pub async fn set_mode(&self, mode: ThrottleMode, reason: &str) -> ModeTransition {
        let transition = self
            .throttle
            .write()
            .await
            .set_mode(mode, reason, current_timestamp());
        self.log_transition(&transition);
        transition
    }

    pub async fn record_sample(&self, sample: LoadSample) -> Option<ModeTransition> {
        let transition = self.throttle.write().await.record_sample(sample);
        if let Some(t) = &transition {
            self.log_transition(t);
        }
        transition
    }

    /// One periodic trend evaluation.
    pub async fn evaluate_throttle(&self, now_ms: u64) -> Option<ModeTransition> {
        let transition = self.throttle.write().await.evaluate(now_ms);
        if let Some(t) = &transition {
            self.log_transition(t);
        }
        transition
    }

    fn log_transition(&self, transition: &ModeTransition) {
        if transition.is_automatic() {
            warn!(
                from = %transition.from,
                to = %transition.to,
                trigger = %transition.trigger,
                "Throttle mode changed: {}",
                transition.reason
            );
        } else {
            info!(
                from = %transition.from,
                to = %transition.to,
                "Throttle mode set manually: {}",
                transition.reason
            );
        }
        self.audit.log(AuditEvent::new(
            "mode_transition",
            serde_json::to_value(transition).unwrap_or_default(),
        ));
    }

    // ==================== History ====================

    pub async fn record_decision(&self, decision: ConsensusDecision) {
        self.history.lock().await.push(decision);
    }

    /// Up to `limit` most recent decisions, newest first.
    pub async fn consensus_history(&self, limit: usize) -> Vec<ConsensusDecision> {
        self.history.lock().await.recent(limit)
    }

    // ==================== Persistence ====================

    pub async fn snapshot(&self) -> PersistedState {
        let pool = self.pool.lock().await;
        let ledger = self.ledger.lock().await;
        let throttle = self.throttle.read().await;
        PersistedState {
            trust_weights: pool.trust_snapshot(),
            trust_records: ledger.snapshot(),
            load_samples: throttle.history().iter().copied().collect(),
            saved_at: current_timestamp(),
        }
    }

    /// Apply persisted trust and load history. Weights of participants that
    /// are no longer registered are dropped.
    pub async fn restore(&self, state: PersistedState) {
        let mut pool = self.pool.lock().await;
        let mut ledger = self.ledger.lock().await;
        let mut restored = 0;
        for (id, weight) in &state.trust_weights {
            if pool.restore_trust(id, *weight).is_ok() {
                restored += 1;
            }
        }
        let records = state
            .trust_records
            .into_iter()
            .filter(|(id, _)| pool.get(id).is_some())
            .collect();
        ledger.restore(records);
        drop(ledger);
        drop(pool);

        let samples = state.load_samples.len();
        self.throttle
            .write()
            .await
            .restore_history(state.load_samples);
        self.audit.log(AuditEvent::new(
            "state_restored",
            json!({ "trust_weights": restored, "load_samples": samples }),
        ));
        info!(trust_weights = restored, load_samples = samples, "Restored persisted state");
    }
}
