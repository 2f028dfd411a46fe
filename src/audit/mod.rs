//! Session auditing.
//!
//! Counts what the detector processed so an operator can check a run
//! at a glance.

pub mod log;

pub use log::{create_shared_log, AuditLog, AuditStats, SharedAuditLog};
