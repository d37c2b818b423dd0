//! Identifier value objects.
//!
//! - [`ParticipantId`] - identity of a voting participant
//! - [`TaskId`] - identity of a submitted task

use serde::{Deserialize, Serialize};

/// Unique identifier for a participant.
///
/// Ordered so that response sets can be sorted deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for ParticipantId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a time-based task identifier (`task-<hex millis><hex nanos>`).
    pub fn generate() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(format!(
            "task-{:x}{:05x}",
            now.as_millis(),
            now.subsec_nanos() & 0xfffff
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for TaskId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_ordering() {
        let mut ids = vec![
            ParticipantId::new("gamma"),
            ParticipantId::new("alpha"),
            ParticipantId::new("beta"),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "alpha");
        assert_eq!(ids[2].as_str(), "gamma");
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&ParticipantId::new("p-1")).unwrap();
        assert_eq!(json, "\"p-1\"");
        let task: TaskId = serde_json::from_str("\"t-9\"").unwrap();
        assert_eq!(task.as_str(), "t-9");
    }

    #[test]
    fn test_generated_task_id_prefix() {
        assert!(TaskId::generate().as_str().starts_with("task-"));
    }
}
