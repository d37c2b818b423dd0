//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod council_state;
pub mod dispatch;
pub mod governance_pipeline;
pub mod submit_task;
pub mod throttle_evaluator;
