//! Fan-out dispatch use case
//!
//! Issues one task to many participants concurrently and collects whatever
//! arrives in time.

use crate::ports::participant_backend::{BackendError, ParticipantBackend};
use crate::ports::progress::{CallOutcome, ProgressNotifier};
use concord_domain::consensus::sort_responses;
use concord_domain::{Participant, ParticipantId, Response, Task, TaskId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::{Id as TaskHandleId, JoinSet};
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("No participants selected for task {0}")]
    NoParticipants(TaskId),

    #[error("No responses collected for task {task_id} ({calls} calls issued)")]
    NoResponses { task_id: TaskId, calls: usize },
}

/// Limits for one dispatch round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchLimits {
    /// Applied to each call independently
    pub per_call_timeout: Duration,
    /// Aborts every outstanding call when it elapses
    pub batch_deadline: Option<Duration>,
}

/// Everything one round produced.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Usable responses, sorted by participant id
    pub responses: Vec<Response>,
    /// Participants that contributed nothing, with the reason
    pub failures: Vec<(ParticipantId, CallOutcome)>,
    pub calls_issued: usize,
    /// True when the batch deadline cut the round short
    pub deadline_hit: bool,
    /// Sum of memory the backends reported
    pub memory_mb: f64,
    pub elapsed_ms: u64,
}

impl DispatchReport {
    pub fn mean_latency_ms(&self) -> f64 {
        if self.responses.is_empty() {
            return self.elapsed_ms as f64;
        }
        self.responses.iter().map(|r| r.latency_ms as f64).sum::<f64>()
            / self.responses.len() as f64
    }

    pub fn compute_cost(&self) -> f64 {
        self.responses.iter().filter_map(|r| r.compute_cost).sum()
    }
}

type CallPayload =
    Result<Result<crate::ports::participant_backend::ParticipantReply, BackendError>, tokio::time::error::Elapsed>;

type CallResult = (ParticipantId, u64, CallPayload);

/// Concurrent fan-out to participants
pub struct FanOutDispatcher {
    backend: Arc<dyn ParticipantBackend>,
}

impl FanOutDispatcher {
    pub fn new(backend: Arc<dyn ParticipantBackend>) -> Self {
        Self { backend }
    }

    /// Call every participant concurrently.
    ///
    /// A failed or timed-out call contributes no response but never fails
    /// the batch; only an empty result does.
    pub async fn dispatch(
        &self,
        task: &Task,
        participants: &[Participant],
        limits: DispatchLimits,
        progress: &dyn ProgressNotifier,
    ) -> Result<DispatchReport, DispatchError> {
        if participants.is_empty() {
            return Err(DispatchError::NoParticipants(task.id.clone()));
        }

        info!(
            task_id = %task.id,
            round = task.round,
            participants = participants.len(),
            "Dispatching task"
        );
        progress.on_dispatch_start(&task.id, task.round, participants.len());

        let started = Instant::now();
        let mut join_set: JoinSet<CallResult> = JoinSet::new();
        let mut pending: BTreeSet<ParticipantId> = BTreeSet::new();
        let mut spawned: HashMap<TaskHandleId, ParticipantId> = HashMap::new();

        for participant in participants {
            let backend = Arc::clone(&self.backend);
            let participant = participant.clone();
            let task = task.clone();
            let per_call = limits.per_call_timeout;
            pending.insert(participant.id.clone());

            let participant_id = participant.id.clone();
            let handle = join_set.spawn(async move {
                let call_started = Instant::now();
                let result = tokio::time::timeout(per_call, backend.call(&participant, &task)).await;
                (
                    participant.id,
                    call_started.elapsed().as_millis() as u64,
                    result,
                )
            });
            spawned.insert(handle.id(), participant_id);
        }

        let mut report = DispatchReport {
            calls_issued: participants.len(),
            ..Default::default()
        };
        let deadline = limits
            .batch_deadline
            .map(|d| tokio::time::Instant::now() + d);

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, join_set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        report.deadline_hit = true;
                        break;
                    }
                },
                None => join_set.join_next().await,
            };
            let Some(joined) = next else { break };

            let (participant_id, outcome) = match joined {
                Ok((participant_id, measured_ms, result)) => {
                    let outcome = settle(task, &participant_id, measured_ms, result, limits, &mut report);
                    (participant_id, outcome)
                }
                Err(e) => {
                    let Some(participant_id) = spawned.get(&e.id()).cloned() else {
                        warn!(task_id = %task.id, "Unattributed participant call failure: {}", e);
                        continue;
                    };
                    warn!(task_id = %task.id, participant = %participant_id, cause = %e, "Participant call panicked");
                    (participant_id, CallOutcome::Failed("panicked".to_string()))
                }
            };
            pending.remove(&participant_id);

            progress.on_participant_complete(&participant_id, &outcome);
            if !outcome.is_success() {
                report.failures.push((participant_id, outcome));
            }
        }

        if report.deadline_hit {
            join_set.abort_all();
            warn!(
                task_id = %task.id,
                outstanding = pending.len(),
                "Batch deadline elapsed; aborting outstanding calls"
            );
            for participant_id in pending {
                progress.on_participant_complete(&participant_id, &CallOutcome::TimedOut);
                report.failures.push((participant_id, CallOutcome::TimedOut));
            }
        } else {
            // Every call settled; whatever is still pending ended without a result
            for participant_id in pending {
                let outcome = CallOutcome::Failed("no result".to_string());
                progress.on_participant_complete(&participant_id, &outcome);
                report.failures.push((participant_id, outcome));
            }
        }

        sort_responses(&mut report.responses);
        report
            .failures
            .sort_by(|(a, _), (b, _)| a.cmp(b));
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        progress.on_dispatch_complete(&task.id, task.round, report.responses.len());

        if report.responses.is_empty() {
            warn!(task_id = %task.id, calls = report.calls_issued, "No participant responded");
            return Err(DispatchError::NoResponses {
                task_id: task.id.clone(),
                calls: report.calls_issued,
            });
        }

        Ok(report)
    }
}

/// Turn one finished call into a progress outcome, recording its response.
fn settle(
    task: &Task,
    participant_id: &ParticipantId,
    measured_ms: u64,
    result: CallPayload,
    limits: DispatchLimits,
    report: &mut DispatchReport,
) -> CallOutcome {
    match result {
        Ok(Ok(reply)) => {
            let latency_ms = reply.latency_ms.unwrap_or(measured_ms);
            debug!(task_id = %task.id, participant = %participant_id, latency_ms, "Participant responded");
            report.memory_mb += reply.memory_mb.unwrap_or(0.0);
            let mut response = Response::new(participant_id.clone(), reply.output, reply.confidence)
                .with_latency(latency_ms)
                .with_round(task.round);
            if let Some(cost) = reply.compute_cost {
                response = response.with_compute_cost(cost);
            }
            report.responses.push(response);
            CallOutcome::Responded { latency_ms }
        }
        Ok(Err(e)) => {
            warn!(task_id = %task.id, participant = %participant_id, cause = %e, "Participant call failed");
            CallOutcome::Failed(e.to_string())
        }
        Err(_) => {
            warn!(
                task_id = %task.id,
                participant = %participant_id,
                timeout_ms = limits.per_call_timeout.as_millis() as u64,
                "Participant call timed out"
            );
            CallOutcome::TimedOut
        }
    }
}
