//! Canned-reply backend

use async_trait::async_trait;
use concord_application::{BackendError, ParticipantBackend, ParticipantReply};
use concord_domain::consensus::normalize_output;
use concord_domain::{Participant, ParticipantId, Task};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// What a fixed participant answers.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedReply {
    pub output: String,
    pub confidence: f64,
    /// Simulated call latency
    pub latency_ms: u64,
    pub compute_cost: Option<f64>,
    /// Answer with the most common peer output in later debate rounds
    pub follow_peers: bool,
    /// Fail every call with this message
    pub failure: Option<String>,
}

impl FixedReply {
    pub fn new(output: impl Into<String>, confidence: f64) -> Self {
        Self {
            output: output.into(),
            confidence,
            latency_ms: 0,
            compute_cost: None,
            follow_peers: false,
            failure: None,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_compute_cost(mut self, cost: f64) -> Self {
        self.compute_cost = Some(cost);
        self
    }

    pub fn following_peers(mut self) -> Self {
        self.follow_peers = true;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

/// Replays configured answers per participant.
#[derive(Debug, Clone, Default)]
pub struct FixedParticipantBackend {
    replies: HashMap<ParticipantId, FixedReply>,
}

impl FixedParticipantBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, id: impl Into<ParticipantId>, reply: FixedReply) -> Self {
        self.replies.insert(id.into(), reply);
        self
    }

    pub fn insert(&mut self, id: impl Into<ParticipantId>, reply: FixedReply) {
        self.replies.insert(id.into(), reply);
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Most common normalized peer output; ties go to the first seen.
    fn peer_majority(task: &Task) -> Option<String> {
        let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for (index, peer) in task.peer_outputs.iter().enumerate() {
            let entry = counts
                .entry(normalize_output(&peer.output))
                .or_insert((0, index));
            entry.0 += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.0.cmp(&b.1.0).then(b.1.1.cmp(&a.1.1)))
            .map(|(output, _)| output)
    }
}

#[async_trait]
impl ParticipantBackend for FixedParticipantBackend {
    async fn call(
        &self,
        participant: &Participant,
        task: &Task,
    ) -> Result<ParticipantReply, BackendError> {
        let reply = self
            .replies
            .get(&participant.id)
            .ok_or_else(|| BackendError::Unavailable(participant.id.to_string()))?;

        if reply.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(reply.latency_ms)).await;
        }
        if let Some(message) = &reply.failure {
            return Err(BackendError::RequestFailed(message.clone()));
        }

        let output = match Self::peer_majority(task) {
            Some(majority) if reply.follow_peers => majority,
            _ => reply.output.clone(),
        };
        let mut answer = ParticipantReply::new(output, reply.confidence).with_latency(reply.latency_ms);
        if let Some(cost) = reply.compute_cost {
            answer = answer.with_compute_cost(cost);
        }
        Ok(answer)
    }
}
