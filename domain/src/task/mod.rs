//! Task domain
//!
//! A [`Task`] is the unit of work submitted to the council. It is immutable
//! once dispatched: a follow-up debate round produces a new `Task` value via
//! [`Task::next_round`] rather than mutating the dispatched one.

use crate::core::error::DomainError;
use crate::core::ids::{ParticipantId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Normal => write!(f, "normal"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "normal" => Ok(TaskPriority::Normal),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            _ => Err(format!("Invalid task priority: {}", s)),
        }
    }
}

/// Caller-supplied estimates used by the per-task throttle override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskHints {
    /// Prior confidence that a cheap answer is good enough (0-1)
    pub confidence: f64,
    /// How safety-sensitive the action is (0-1)
    pub safety_level: f64,
    /// Estimated problem complexity (0-1)
    pub complexity: f64,
}

impl Default for TaskHints {
    fn default() -> Self {
        Self {
            confidence: 1.0,
            safety_level: 0.0,
            complexity: 0.0,
        }
    }
}

/// Output of another participant in a previous debate round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerOutput {
    pub participant_id: ParticipantId,
    pub output: String,
    pub confidence: f64,
}

/// A task submitted for consensus and governance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub payload: String,
    #[serde(default)]
    pub priority: TaskPriority,
    /// Absolute deadline in milliseconds since the Unix epoch
    #[serde(default)]
    pub deadline: Option<u64>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub hints: TaskHints,
    /// Debate round this task value belongs to (1-indexed)
    #[serde(default = "first_round")]
    pub round: u32,
    /// Outputs of the previous round, empty on the first round
    #[serde(default)]
    pub peer_outputs: Vec<PeerOutput>,
}

fn first_round() -> u32 {
    1
}

impl Task {
    pub fn new(id: impl Into<TaskId>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            priority: TaskPriority::default(),
            deadline: None,
            required_capabilities: Vec::new(),
            hints: TaskHints::default(),
            round: 1,
            peer_outputs: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline_ms: u64) -> Self {
        self.deadline = Some(deadline_ms);
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    pub fn with_hints(mut self, hints: TaskHints) -> Self {
        self.hints = hints;
        self
    }

    /// Build the task value for the next debate round.
    pub fn next_round(&self, peer_outputs: Vec<PeerOutput>) -> Self {
        let mut next = self.clone();
        next.round = self.round + 1;
        next.peer_outputs = peer_outputs;
        next
    }

    /// Check the task is well-formed before it enters the pipeline.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::InvalidTask("task id is empty".to_string()));
        }
        if self.payload.trim().is_empty() {
            return Err(DomainError::InvalidTask(format!(
                "task {} has an empty payload",
                self.id
            )));
        }
        Ok(())
    }

    /// Remaining time before the deadline, `Some(0)` once it has passed.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.deadline.map(|d| d.saturating_sub(now_ms))
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.deadline, Some(d) if now_ms >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let task = Task::new("t-1", "deploy v2")
            .with_priority(TaskPriority::High)
            .with_capability("code")
            .with_deadline(5_000);

        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.required_capabilities, vec!["code".to_string()]);
        assert_eq!(task.round, 1);
        assert_eq!(task.remaining_ms(4_000), Some(1_000));
        assert!(task.is_expired(5_000));
        assert!(!task.is_expired(4_999));
    }

    #[test]
    fn test_validate_rejects_empty_payload() {
        let task = Task::new("t-1", "   ");
        assert!(matches!(task.validate(), Err(DomainError::InvalidTask(_))));
        assert!(Task::new("t-1", "ok").validate().is_ok());
    }

    #[test]
    fn test_next_round_keeps_original() {
        let task = Task::new("t-1", "question");
        let next = task.next_round(vec![PeerOutput {
            participant_id: ParticipantId::new("a"),
            output: "yes".to_string(),
            confidence: 0.9,
        }]);

        assert_eq!(next.round, 2);
        assert_eq!(next.peer_outputs.len(), 1);
        assert_eq!(task.round, 1);
        assert!(task.peer_outputs.is_empty());
    }

    #[test]
    fn test_deserialize_minimal() {
        let task: Task = serde_json::from_str(r#"{"id":"t-2","payload":"hello"}"#).unwrap();
        assert_eq!(task.round, 1);
        assert_eq!(task.hints, TaskHints::default());
        assert_eq!(task.priority, TaskPriority::Normal);
    }

    #[test]
    fn test_priority_parse_and_order() {
        assert_eq!("critical".parse::<TaskPriority>().ok(), Some(TaskPriority::Critical));
        assert!(TaskPriority::Low < TaskPriority::Critical);
    }
}
