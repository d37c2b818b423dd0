//! Progress notification port
//!
//! Defines the interface for reporting progress while a task moves through
//! dispatch, consensus and governance.

use concord_domain::{ConsensusDecision, GovernanceStage, GovernanceVerdict, ParticipantId, TaskId};

/// How a single participant call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Responded { latency_ms: u64 },
    Failed(String),
    TimedOut,
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Responded { .. })
    }
}

/// Callback for progress updates during task execution
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console spinner, logs, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a dispatch round starts
    fn on_dispatch_start(&self, task_id: &TaskId, round: u32, participants: usize);

    /// Called when one participant call settles
    fn on_participant_complete(&self, participant: &ParticipantId, outcome: &CallOutcome);

    /// Called when a dispatch round has collected everything it will get
    fn on_dispatch_complete(&self, task_id: &TaskId, round: u32, responded: usize);

    fn on_consensus(&self, _decision: &ConsensusDecision) {}

    fn on_stage_complete(&self, _stage: GovernanceStage, _passed: bool) {}

    fn on_verdict(&self, _verdict: &GovernanceVerdict) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_dispatch_start(&self, _task_id: &TaskId, _round: u32, _participants: usize) {}
    fn on_participant_complete(&self, _participant: &ParticipantId, _outcome: &CallOutcome) {}
    fn on_dispatch_complete(&self, _task_id: &TaskId, _round: u32, _responded: usize) {}
}
