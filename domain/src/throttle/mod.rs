//! Load throttle domain
//!
//! Selects how much effort a task may spend. See [`controller`] for the
//! state machine, [`mode`] for the tiers and [`sample`] for load tracking.

pub mod controller;
pub mod mode;
pub mod sample;

pub use controller::{
    DimensionUtilization, LoadMetrics, LoadThrottleController, ModeTransition, ThrottleSettings,
    TransitionTrigger, select_mode_for_task,
};
pub use mode::{ModePolicies, ModePolicy, ThrottleMode};
pub use sample::{LoadCeilings, LoadDimension, LoadHistory, LoadSample};
