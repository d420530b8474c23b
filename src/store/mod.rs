// Durable state: the applied-jobs index and the audit logs.

pub mod applied;
pub mod files;

#[cfg(test)]
pub mod memory;

use crate::error::AgentError;
use crate::models::event::{ExternalApplicationRecord, RecruiterContactRecord, SkipRecord};
use crate::models::job::JobCandidate;

/// Destination for audit events. Rows are written once and never read back.
pub trait EventSink: Send + Sync {
    fn record_applied(&self, job: &JobCandidate) -> Result<(), AgentError>;

    fn record_skipped(&self, record: &SkipRecord) -> Result<(), AgentError>;

    fn record_external(&self, record: &ExternalApplicationRecord) -> Result<(), AgentError>;

    fn record_contact(&self, record: &RecruiterContactRecord) -> Result<(), AgentError>;
}

/// Run `write` and log instead of propagating: a lost audit row never costs a job.
pub fn best_effort(what: &str, write: Result<(), AgentError>) {
    if let Err(e) = write {
        tracing::warn!("Failed to write {what} record: {e}");
    }
}
