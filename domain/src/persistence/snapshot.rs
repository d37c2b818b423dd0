use crate::core::ids::ParticipantId;
use crate::throttle::LoadSample;
use crate::trust::TrustRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State that survives restarts: trust and load history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub trust_weights: HashMap<ParticipantId, f64>,
    pub trust_records: HashMap<ParticipantId, TrustRecord>,
    pub load_samples: Vec<LoadSample>,
    pub saved_at: u64,
}

impl PersistedState {
    pub fn is_empty(&self) -> bool {
        self.trust_weights.is_empty() && self.trust_records.is_empty() && self.load_samples.is_empty()
    }
}
