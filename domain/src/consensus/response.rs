//! Participant responses

use crate::core::ids::ParticipantId;
use crate::util::clamp_unit;
use serde::{Deserialize, Serialize};

/// One participant's answer to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub participant_id: ParticipantId,
    pub output: String,
    /// Self-reported confidence, clamped into `[0, 1]`
    pub confidence: f64,
    pub latency_ms: u64,
    /// Set when the backend returned a result it flagged as failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional cost reported by the backend (tokens, credits, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_cost: Option<f64>,
    /// Debate round that produced this response
    #[serde(default = "first_round")]
    pub round: u32,
}

fn first_round() -> u32 {
    1
}

impl Response {
    pub fn new(
        participant_id: impl Into<ParticipantId>,
        output: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            output: output.into(),
            confidence: clamp_unit(confidence),
            latency_ms: 0,
            error: None,
            compute_cost: None,
            round: 1,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_compute_cost(mut self, cost: f64) -> Self {
        self.compute_cost = Some(cost);
        self
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = round;
        self
    }

    /// A response counts toward consensus only when it carries no error.
    pub fn is_usable(&self) -> bool {
        self.error.is_none()
    }
}

/// Sort responses by participant id so aggregation is reproducible.
pub fn sort_responses(responses: &mut [Response]) {
    responses.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Response::new("a", "x", 1.4).confidence, 1.0);
        assert_eq!(Response::new("a", "x", -0.4).confidence, 0.0);
    }

    #[test]
    fn test_sort_by_participant() {
        let mut responses = vec![
            Response::new("c", "x", 0.5),
            Response::new("a", "y", 0.5),
            Response::new("b", "z", 0.5),
        ];
        sort_responses(&mut responses);
        let ids: Vec<&str> = responses.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_errored_response_is_not_usable() {
        assert!(Response::new("a", "x", 0.5).is_usable());
        assert!(!Response::new("a", "", 0.0).with_error("boom").is_usable());
    }
}
