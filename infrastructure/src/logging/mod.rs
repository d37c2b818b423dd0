//! Audit trail adapters

mod jsonl_audit;

pub use jsonl_audit::JsonlAuditLogger;
