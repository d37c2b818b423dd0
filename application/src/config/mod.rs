//! Application-level configuration.
//!
//! - [`GovernorConfig`]: container of every component's policy
//! - [`PipelineSettings`]: governance stage toggles, timeout and blend weights

pub mod governor_config;
pub mod pipeline_settings;

pub use governor_config::GovernorConfig;
pub use pipeline_settings::PipelineSettings;
