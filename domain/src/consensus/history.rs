//! Bounded history of resolved decisions

use super::decision::ConsensusDecision;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
pub struct ConsensusHistory {
    entries: VecDeque<ConsensusDecision>,
    capacity: usize,
}

impl Default for ConsensusHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConsensusHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, decision: ConsensusDecision) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(decision);
    }

    /// Up to `limit` most recent decisions, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ConsensusDecision> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::TaskId;

    fn decision(id: &str) -> ConsensusDecision {
        ConsensusDecision::without_responses(TaskId::new(id), "", 0)
    }

    #[test]
    fn test_recent_is_newest_first_and_bounded() {
        let mut history = ConsensusHistory::new(3);
        for id in ["t1", "t2", "t3", "t4"] {
            history.push(decision(id));
        }
        assert_eq!(history.len(), 3);

        let recent = history.recent(2);
        let ids: Vec<&str> = recent.iter().map(|d| d.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t3"]);
        assert_eq!(history.recent(10).len(), 3);
    }
}
