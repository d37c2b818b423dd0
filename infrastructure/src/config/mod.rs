//! Configuration file loading for concord
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CONCORD_*` environment variables (nested keys joined by `__`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./concord.toml` or `./.concord.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/concord/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, ConfigIssueCode, ConfigValidationError, FileBackendKind, FileConfig,
    FileConsensusConfig, FileGovernanceConfig, FileLoggingConfig, FileOutputConfig,
    FileOutputFormat, FileParticipantConfig, FilePersistenceConfig, FilePoliciesConfig,
    FilePoolConfig, FileThrottleConfig, Severity, build_backend,
};
pub use loader::ConfigLoader;
