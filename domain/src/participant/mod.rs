//! Participant domain
//!
//! - [`entities::Participant`]: a voting participant with trust and liveness
//! - [`pool::ParticipantPool`]: registry and selection

pub mod entities;
pub mod pool;

pub use entities::{
    Participant, ParticipantStatus, TRUST_DEFAULT, TRUST_MAX, TRUST_MIN, clamp_trust,
};
pub use pool::{ParticipantPool, SelectionSettings};
