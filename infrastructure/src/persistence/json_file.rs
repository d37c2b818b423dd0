//! JSON file state store.
//!
//! Persists trust and load history as one pretty-printed JSON document.
//! Saves write a sibling temp file first and rename it into place so a
//! crash never leaves a half-written state file.

use async_trait::async_trait;
use concord_application::{StateStore, StateStoreError};
use concord_domain::PersistedState;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StateStoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: PersistedState = serde_json::from_str(&content)?;
        debug!(
            path = %self.path.display(),
            participants = state.trust_weights.len(),
            samples = state.load_samples.len(),
            "Loaded council state"
        );
        Ok(Some(state))
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::{LoadSample, ParticipantId};

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = PersistedState {
            saved_at: 1_700_000_000_000,
            ..Default::default()
        };
        state.trust_weights.insert(ParticipantId::new("alpha"), 0.72);
        state.load_samples.push(LoadSample {
            latency_ms: 120.0,
            timestamp: 5,
            ..Default::default()
        });
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStateStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StateStoreError::Serialization(_)));
    }
}
