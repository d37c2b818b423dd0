//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Insufficient participants: {available} eligible, {required} required")]
    InsufficientParticipants { available: usize, required: usize },

    #[error("No responses collected for task {task_id}")]
    NoResponses { task_id: String },

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Participant already registered: {0}")]
    DuplicateParticipant(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Stage {stage} failed: {cause}")]
    StageEvaluation { stage: String, cause: String },
}

impl DomainError {
    /// Check if this error means no participant produced a usable response
    pub fn is_no_responses(&self) -> bool {
        matches!(self, DomainError::NoResponses { .. })
    }
}
