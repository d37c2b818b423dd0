//! Core domain concepts shared across all subdomains.
//!
//! - [`ids::ParticipantId`], [`ids::TaskId`]: identifiers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod ids;
