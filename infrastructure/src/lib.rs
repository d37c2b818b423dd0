//! Infrastructure layer for concord
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod backends;
pub mod config;
pub mod logging;
pub mod persistence;
pub mod stages;

// Re-export commonly used types
#[cfg(feature = "http-backend")]
pub use backends::HttpParticipantBackend;
pub use backends::{FixedParticipantBackend, FixedReply, RoutingBackend};
pub use config::{
    ConfigIssue, ConfigLoader, ConfigValidationError, FileConfig, FileOutputConfig,
    FileOutputFormat, FileParticipantConfig, Severity, build_backend,
};
pub use logging::JsonlAuditLogger;
pub use persistence::JsonFileStateStore;
pub use stages::{
    ConfidenceStressTest, ConsensusRiskSimulator, DissentConflictResolver, PolicyAuthority,
};
