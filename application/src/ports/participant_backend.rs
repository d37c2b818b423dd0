//! Participant backend port
//!
//! Defines how the application reaches a participant. The core is
//! transport-agnostic: adapters may call a model endpoint over HTTP, replay
//! canned answers, or anything else.

use async_trait::async_trait;
use concord_domain::{Participant, Task};
use thiserror::Error;

/// Errors a backend call can end with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    #[error("No backend for participant {0}")]
    Unavailable(String),

    #[error("Timeout")]
    Timeout,
}

/// What a participant answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantReply {
    pub output: String,
    pub confidence: f64,
    /// Latency reported by the backend; measured locally when absent
    pub latency_ms: Option<u64>,
    pub compute_cost: Option<f64>,
    /// Memory the call consumed, when the backend can tell
    pub memory_mb: Option<f64>,
}

impl ParticipantReply {
    pub fn new(output: impl Into<String>, confidence: f64) -> Self {
        Self {
            output: output.into(),
            confidence,
            latency_ms: None,
            compute_cost: None,
            memory_mb: None,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_compute_cost(mut self, cost: f64) -> Self {
        self.compute_cost = Some(cost);
        self
    }

    pub fn with_memory(mut self, memory_mb: f64) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }
}

/// Gateway to participants
///
/// Implementations live in the infrastructure layer. A call must not
/// block other calls; the dispatcher applies timeouts around it.
#[async_trait]
pub trait ParticipantBackend: Send + Sync {
    async fn call(&self, participant: &Participant, task: &Task)
    -> Result<ParticipantReply, BackendError>;
}
