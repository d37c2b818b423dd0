//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_logger;
pub mod governance_stages;
pub mod participant_backend;
pub mod progress;
pub mod state_store;
