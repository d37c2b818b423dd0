//! Participant pool: registry, liveness and selection.

use super::entities::{Participant, ParticipantStatus};
use crate::core::error::DomainError;
use crate::core::ids::{ParticipantId, TaskId};
use crate::task::Task;
use crate::throttle::ModePolicy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How participants are chosen for a task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Participants not seen within this window are skipped
    pub staleness_window_ms: u64,
    /// Fewer eligible participants than this fails the task
    pub min_participants: usize,
    /// Rank by trust weight (descending) before truncating
    pub trust_ranked: bool,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            staleness_window_ms: 60_000,
            min_participants: 1,
            trust_ranked: true,
        }
    }
}

/// Registry of voting participants.
///
/// Participants are kept ordered by id so every iteration is deterministic.
/// The pool also remembers which participants were selected for each
/// in-flight task; deregistering a participant removes it from those
/// selections.
#[derive(Debug, Clone, Default)]
pub struct ParticipantPool {
    participants: BTreeMap<ParticipantId, Participant>,
    in_flight: HashMap<TaskId, Vec<ParticipantId>>,
    settings: SelectionSettings,
}

impl ParticipantPool {
    pub fn new(settings: SelectionSettings) -> Self {
        Self {
            participants: BTreeMap::new(),
            in_flight: HashMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SelectionSettings {
        &self.settings
    }

    pub fn register(&mut self, participant: Participant) -> Result<(), DomainError> {
        if self.participants.contains_key(&participant.id) {
            return Err(DomainError::DuplicateParticipant(participant.id.to_string()));
        }
        self.participants.insert(participant.id.clone(), participant);
        Ok(())
    }

    /// Remove a participant and purge it from every in-flight selection.
    pub fn deregister(&mut self, id: &ParticipantId) -> Result<Participant, DomainError> {
        let removed = self
            .participants
            .remove(id)
            .ok_or_else(|| DomainError::UnknownParticipant(id.to_string()))?;

        for selection in self.in_flight.values_mut() {
            selection.retain(|p| p != id);
        }
        Ok(removed)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Choose participants for `task` under `policy`.
    ///
    /// Filters to selectable, fresh participants holding every required
    /// capability, ranks them, truncates to `policy.max_participants` and
    /// records the selection as in-flight for the task.
    pub fn select_participants(
        &mut self,
        task: &Task,
        policy: &ModePolicy,
        now_ms: u64,
    ) -> Result<Vec<Participant>, DomainError> {
        let window = self.settings.staleness_window_ms;
        let mut eligible: Vec<Participant> = self
            .participants
            .values()
            .filter(|p| p.status.is_selectable())
            .filter(|p| p.is_fresh(now_ms, window))
            .filter(|p| p.has_capabilities(&task.required_capabilities))
            .cloned()
            .collect();

        if eligible.len() < self.settings.min_participants {
            return Err(DomainError::InsufficientParticipants {
                available: eligible.len(),
                required: self.settings.min_participants,
            });
        }

        if self.settings.trust_ranked {
            // Stable sort keeps id order among equal weights
            eligible.sort_by(|a, b| b.trust_weight().total_cmp(&a.trust_weight()));
        }
        eligible.truncate(policy.max_participants.max(1));

        self.in_flight.insert(
            task.id.clone(),
            eligible.iter().map(|p| p.id.clone()).collect(),
        );
        Ok(eligible)
    }

    /// Participants still selected for an in-flight task.
    pub fn in_flight(&self, task_id: &TaskId) -> Option<&[ParticipantId]> {
        self.in_flight.get(task_id).map(|v| v.as_slice())
    }

    /// Forget the in-flight selection once a task has resolved.
    pub fn release(&mut self, task_id: &TaskId) -> Option<Vec<ParticipantId>> {
        self.in_flight.remove(task_id)
    }

    pub fn heartbeat(&mut self, id: &ParticipantId, now_ms: u64) -> Result<(), DomainError> {
        let participant = self.get_mut(id)?;
        participant.last_seen = participant.last_seen.max(now_ms);
        Ok(())
    }

    pub fn set_status(
        &mut self,
        id: &ParticipantId,
        status: ParticipantStatus,
    ) -> Result<(), DomainError> {
        self.get_mut(id)?.status = status;
        Ok(())
    }

    /// Apply a trust delta, clamped into `[0.1, 1.0]`. Returns the new weight.
    pub fn update_trust(&mut self, id: &ParticipantId, delta: f64) -> Result<f64, DomainError> {
        Ok(self.get_mut(id)?.adjust_trust(delta))
    }

    /// Overwrite a trust weight (e.g. restored from persistence), clamped.
    pub fn restore_trust(&mut self, id: &ParticipantId, weight: f64) -> Result<(), DomainError> {
        self.get_mut(id)?.set_trust(weight);
        Ok(())
    }

    /// Current trust weight of every participant.
    pub fn trust_snapshot(&self) -> HashMap<ParticipantId, f64> {
        self.participants
            .iter()
            .map(|(id, p)| (id.clone(), p.trust_weight()))
            .collect()
    }

    fn get_mut(&mut self, id: &ParticipantId) -> Result<&mut Participant, DomainError> {
        self.participants
            .get_mut(id)
            .ok_or_else(|| DomainError::UnknownParticipant(id.to_string()))
    }
}
