//! State store port
//!
//! Optional persistence for trust and load history across restarts. The
//! council runs memory-only with [`InMemoryStateStore`].

use async_trait::async_trait;
use concord_domain::PersistedState;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved state, `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<PersistedState>, StateStoreError>;

    async fn save(&self, state: &PersistedState) -> Result<(), StateStoreError>;
}

/// Keeps the last saved state in memory.
#[derive(Default)]
pub struct InMemoryStateStore {
    state: Mutex<Option<PersistedState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StateStoreError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryStateStore::new();
        assert!(store.load().await.unwrap().is_none());

        let state = PersistedState {
            saved_at: 42,
            ..Default::default()
        };
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().saved_at, 42);
    }
}
