//! Persisted state snapshot

pub mod snapshot;

pub use snapshot::PersistedState;
