//! Trust domain

pub mod feedback;

pub use feedback::{ParticipantStats, TrustAdjustment, TrustLedger, TrustPolicy, TrustRecord};
