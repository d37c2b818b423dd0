//! Submit Task use case
//!
//! Orchestrates the full flow for one task:
//!
//! 1. Read the throttle mode once and resolve the task's policy
//! 2. Select participants from the pool
//! 3. Fan out, resolve consensus, and debate further rounds while the band
//!    is not `accept` and depth and call budget remain
//! 4. Apply trust feedback once, to the final round
//! 5. Run the governance pipeline

use super::council_state::CouncilState;
use super::dispatch::{DispatchError, DispatchLimits, DispatchReport, FanOutDispatcher};
use super::governance_pipeline::GovernancePipeline;
use crate::ports::audit_logger::AuditEvent;
use crate::ports::participant_backend::ParticipantBackend;
use crate::ports::progress::{CallOutcome, NoProgress, ProgressNotifier};
use crate::ports::state_store::StateStore;
use concord_domain::throttle::select_mode_for_task;
use concord_domain::util::current_timestamp;
use concord_domain::{
    ConsensusDecision, ConsensusEngine, DomainError, GovernanceVerdict, LoadSample, ModePolicy,
    Participant, ParticipantId, PeerOutput, Response, Task, TaskId, ThrottleMode,
    TrustAdjustment,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that reject a task before any decision is made
#[derive(Error, Debug)]
pub enum SubmitTaskError {
    #[error("Invalid task: {0}")]
    InvalidTask(DomainError),

    #[error(transparent)]
    InsufficientParticipants(DomainError),
}

/// Input for the SubmitTask use case
#[derive(Debug, Clone)]
pub struct SubmitTaskInput {
    pub task: Task,
    /// Force a mode for this task only, bypassing the per-task override
    pub mode_override: Option<ThrottleMode>,
}

impl SubmitTaskInput {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            mode_override: None,
        }
    }

    pub fn with_mode(mut self, mode: ThrottleMode) -> Self {
        self.mode_override = Some(mode);
        self
    }
}

/// A participant that contributed nothing in some round.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantFailure {
    pub participant_id: ParticipantId,
    pub round: u32,
    pub cause: String,
}

/// Everything the council concluded about a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_id: TaskId,
    /// Mode the task ran under
    pub mode: ThrottleMode,
    pub policy: ModePolicy,
    pub decision: ConsensusDecision,
    pub verdict: GovernanceVerdict,
    /// Responses of the final round
    pub responses: Vec<Response>,
    pub failures: Vec<ParticipantFailure>,
    pub calls_used: usize,
    pub trust_adjustments: Vec<TrustAdjustment>,
}

/// Final round of a task, if any round produced responses.
struct Resolution {
    decision: ConsensusDecision,
    responses: Vec<Response>,
}

pub struct SubmitTaskUseCase {
    state: Arc<CouncilState>,
    dispatcher: FanOutDispatcher,
    engine: ConsensusEngine,
    pipeline: GovernancePipeline,
    store: Option<Arc<dyn StateStore>>,
    debate: bool,
}

impl SubmitTaskUseCase {
    pub fn new(
        state: Arc<CouncilState>,
        backend: Arc<dyn ParticipantBackend>,
        engine: ConsensusEngine,
        pipeline: GovernancePipeline,
    ) -> Self {
        Self {
            state,
            dispatcher: FanOutDispatcher::new(backend),
            engine,
            pipeline,
            store: None,
            debate: true,
        }
    }

    /// Save trust and load history after every task.
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_debate(mut self, debate: bool) -> Self {
        self.debate = debate;
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: SubmitTaskInput) -> Result<TaskReport, SubmitTaskError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: SubmitTaskInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<TaskReport, SubmitTaskError> {
        let task = input.task;
        task.validate().map_err(SubmitTaskError::InvalidTask)?;

        // The mode is read exactly once per task
        let (mode, policy) = {
            let throttle = self.state.throttle.read().await;
            let mode = input.mode_override.unwrap_or_else(|| {
                select_mode_for_task(
                    throttle.current_mode(),
                    task.hints.confidence,
                    task.hints.safety_level,
                    task.hints.complexity,
                )
            });
            (mode, throttle.policy_for(mode))
        };
        info!(task_id = %task.id, mode = %mode, priority = %task.priority, "Task submitted");

        let now = current_timestamp();
        let (resolution, failures, calls_used) = if task.is_expired(now) {
            warn!(task_id = %task.id, "Task deadline already elapsed");
            (None, Vec::new(), 0)
        } else {
            let (selected, trust) = {
                let mut pool = self.state.pool.lock().await;
                match pool.select_participants(&task, &policy, now) {
                    Ok(selected) => (selected, pool.trust_snapshot()),
                    Err(e) => {
                        warn!(task_id = %task.id, cause = %e, "Participant selection failed");
                        self.state.audit().log(AuditEvent::new(
                            "task_rejected",
                            json!({ "task_id": task.id, "cause": e.to_string() }),
                        ));
                        return Err(SubmitTaskError::InsufficientParticipants(e));
                    }
                }
            };
            self.run_rounds(&task, &policy, selected, &trust, progress)
                .await
        };

        let (decision, responses, trust_adjustments) = match resolution {
            Some(Resolution {
                decision,
                responses,
            }) => {
                let adjustments = self.apply_feedback(&task.id, &decision, &responses).await;
                (decision, responses, adjustments)
            }
            None => {
                self.state.pool.lock().await.release(&task.id);
                let reason = if task.is_expired(current_timestamp()) {
                    "task deadline elapsed before consensus"
                } else {
                    "no participant produced a response"
                };
                warn!(task_id = %task.id, "{}", reason);
                (
                    ConsensusDecision::without_responses(task.id.clone(), reason, current_timestamp()),
                    Vec::new(),
                    Vec::new(),
                )
            }
        };

        info!(
            task_id = %task.id,
            band = %decision.band,
            score = decision.agreement_score,
            dissenters = decision.dissenting_participants.len(),
            "Consensus resolved"
        );
        self.state.audit().log(AuditEvent::new(
            "consensus_resolved",
            serde_json::to_value(&decision).unwrap_or_default(),
        ));
        progress.on_consensus(&decision);
        self.state.record_decision(decision.clone()).await;

        let verdict = self
            .pipeline
            .evaluate(&task, &decision, &responses, progress)
            .await;

        self.persist().await;

        Ok(TaskReport {
            task_id: task.id.clone(),
            mode,
            policy,
            decision,
            verdict,
            responses,
            failures,
            calls_used,
            trust_adjustments,
        })
    }

    /// Dispatch rounds until a round is accepted or the budget runs out.
    async fn run_rounds(
        &self,
        task: &Task,
        policy: &ModePolicy,
        selected: Vec<Participant>,
        trust: &HashMap<ParticipantId, f64>,
        progress: &dyn ProgressNotifier,
    ) -> (Option<Resolution>, Vec<ParticipantFailure>, usize) {
        let max_rounds = if self.debate { policy.max_depth.max(1) } else { 1 };
        let mut round_task = task.clone();
        let mut resolution: Option<Resolution> = None;
        let mut failures = Vec::new();
        let mut calls_used = 0usize;

        for round in 1..=max_rounds {
            let budget = policy.max_calls.saturating_sub(calls_used);
            if budget == 0 {
                debug!(task_id = %task.id, round, "Call budget exhausted");
                break;
            }
            let now = current_timestamp();
            if round_task.is_expired(now) {
                break;
            }

            let active = self.still_selected(&task.id, &selected, budget).await;
            if active.is_empty() {
                break;
            }

            let limits = DispatchLimits {
                per_call_timeout: policy.timeout(),
                batch_deadline: round_task.remaining_ms(now).map(Duration::from_millis),
            };
            let result = self
                .dispatcher
                .dispatch(&round_task, &active, limits, progress)
                .await;

            let report = match result {
                Ok(report) => report,
                Err(DispatchError::NoResponses { calls, .. }) => {
                    calls_used += calls;
                    self.record_load(active.len(), calls, policy.timeout_ms as f64, 0.0, 0.0)
                        .await;
                    failures.extend(active.iter().map(|p| ParticipantFailure {
                        participant_id: p.id.clone(),
                        round,
                        cause: "no response".to_string(),
                    }));
                    break;
                }
                Err(DispatchError::NoParticipants(_)) => break,
            };

            calls_used += report.calls_issued;
            self.record_round(&active, &report).await;
            failures.extend(report.failures.iter().map(|(id, outcome)| ParticipantFailure {
                participant_id: id.clone(),
                round,
                cause: describe(outcome),
            }));

            let decision = match self
                .engine
                .resolve(&task.id, &report.responses, trust, round, current_timestamp())
            {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(task_id = %task.id, round, cause = %e, "Consensus could not be resolved");
                    break;
                }
            };
            debug!(
                task_id = %task.id,
                round,
                band = %decision.band,
                score = decision.agreement_score,
                "Round resolved"
            );

            let accepted = decision.is_accepted();
            let peers: Vec<PeerOutput> = report
                .responses
                .iter()
                .map(|r| PeerOutput {
                    participant_id: r.participant_id.clone(),
                    output: r.output.clone(),
                    confidence: r.confidence,
                })
                .collect();
            resolution = Some(Resolution {
                decision,
                responses: report.responses,
            });

            if accepted {
                break;
            }
            round_task = round_task.next_round(peers);
        }

        (resolution, failures, calls_used)
    }

    /// Selected participants that are still registered, capped at `budget`.
    async fn still_selected(
        &self,
        task_id: &TaskId,
        selected: &[Participant],
        budget: usize,
    ) -> Vec<Participant> {
        let pool = self.state.pool.lock().await;
        let Some(in_flight) = pool.in_flight(task_id) else {
            return Vec::new();
        };
        selected
            .iter()
            .filter(|p| in_flight.contains(&p.id))
            .take(budget)
            .cloned()
            .collect()
    }

    async fn record_round(&self, active: &[Participant], report: &DispatchReport) {
        {
            let mut pool = self.state.pool.lock().await;
            let now = current_timestamp();
            for response in &report.responses {
                // A response counts as a heartbeat; the participant may have left meanwhile
                let _ = pool.heartbeat(&response.participant_id, now);
            }
        }
        for (id, outcome) in &report.failures {
            self.state.audit().log(AuditEvent::new(
                "participant_failed",
                json!({ "participant_id": id, "cause": describe(outcome) }),
            ));
        }
        self.record_load(
            active.len(),
            report.calls_issued,
            report.mean_latency_ms(),
            report.memory_mb,
            report.compute_cost(),
        )
        .await;
    }

    async fn record_load(
        &self,
        participants: usize,
        calls: usize,
        latency_ms: f64,
        memory_mb: f64,
        compute_cost: f64,
    ) {
        let sample = LoadSample {
            active_participants: participants as f64,
            call_count: calls as f64,
            latency_ms,
            memory_mb,
            compute_cost,
            timestamp: current_timestamp(),
        };
        self.state.record_sample(sample).await;
    }

    async fn apply_feedback(
        &self,
        task_id: &TaskId,
        decision: &ConsensusDecision,
        responses: &[Response],
    ) -> Vec<TrustAdjustment> {
        let mut pool = self.state.pool.lock().await;
        let mut ledger = self.state.ledger.lock().await;
        let adjustments = ledger.apply(&mut pool, decision);
        pool.release(task_id);
        drop(ledger);
        drop(pool);

        debug!(
            task_id = %task_id,
            responders = responses.len(),
            adjusted = adjustments.len(),
            "Trust feedback applied"
        );
        self.state.audit().log(AuditEvent::new(
            "trust_updated",
            json!({ "task_id": task_id, "adjustments": adjustments }),
        ));
        adjustments
    }

    async fn persist(&self) {
        let Some(store) = &self.store else { return };
        let snapshot = self.state.snapshot().await;
        if let Err(e) = store.save(&snapshot).await {
            warn!("Failed to persist council state: {}", e);
        }
    }
}

fn describe(outcome: &CallOutcome) -> String {
    match outcome {
        CallOutcome::Responded { .. } => "responded".to_string(),
        CallOutcome::Failed(cause) => cause.clone(),
        CallOutcome::TimedOut => "timed out".to_string(),
    }
}
