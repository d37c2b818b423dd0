//! JSON-over-HTTP participant backend
//!
//! Each participant has an endpoint. A call POSTs the task and expects
//! `{ "output": ..., "confidence": ... }` back, optionally with
//! `compute_cost` and `memory_mb`.

use async_trait::async_trait;
use concord_application::{BackendError, ParticipantBackend, ParticipantReply};
use concord_domain::{Participant, ParticipantId, PeerOutput, Task, TaskHints, TaskPriority};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    task_id: &'a str,
    participant_id: &'a str,
    payload: &'a str,
    round: u32,
    priority: TaskPriority,
    capabilities: &'a [String],
    hints: TaskHints,
    peer_outputs: &'a [PeerOutput],
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    output: String,
    confidence: f64,
    #[serde(default)]
    compute_cost: Option<f64>,
    #[serde(default)]
    memory_mb: Option<f64>,
}

pub struct HttpParticipantBackend {
    client: reqwest::Client,
    endpoints: HashMap<ParticipantId, String>,
}

impl HttpParticipantBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoints: HashMap::new(),
        }
    }

    pub fn with_endpoint(mut self, id: impl Into<ParticipantId>, url: impl Into<String>) -> Self {
        self.endpoints.insert(id.into(), url.into());
        self
    }

    pub fn insert(&mut self, id: impl Into<ParticipantId>, url: impl Into<String>) {
        self.endpoints.insert(id.into(), url.into());
    }
}

#[async_trait]
impl ParticipantBackend for HttpParticipantBackend {
    async fn call(
        &self,
        participant: &Participant,
        task: &Task,
    ) -> Result<ParticipantReply, BackendError> {
        let url = self
            .endpoints
            .get(&participant.id)
            .ok_or_else(|| BackendError::Unavailable(participant.id.to_string()))?;

        let request = CallRequest {
            task_id: task.id.as_str(),
            participant_id: participant.id.as_str(),
            payload: &task.payload,
            round: task.round,
            priority: task.priority,
            capabilities: &task.required_capabilities,
            hints: task.hints,
            peer_outputs: &task.peer_outputs,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .header("User-Agent", "concord/0.1 (participant call)")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::RequestFailed(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: CallResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidReply(e.to_string()))?;
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(participant = %participant.id, latency_ms, "Participant replied");

        let mut reply = ParticipantReply::new(body.output, body.confidence).with_latency(latency_ms);
        if let Some(cost) = body.compute_cost {
            reply = reply.with_compute_cost(cost);
        }
        if let Some(memory) = body.memory_mb {
            reply = reply.with_memory(memory);
        }
        Ok(reply)
    }
}
