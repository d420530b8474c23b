use std::sync::Mutex;

use crate::error::AgentError;
use crate::models::event::{ExternalApplicationRecord, RecruiterContactRecord, SkipRecord};
use crate::models::job::JobCandidate;
use crate::store::EventSink;

/// Collects events in memory.
#[derive(Default)]
pub struct MemorySink {
    pub applied: Mutex<Vec<JobCandidate>>,
    pub skipped: Mutex<Vec<SkipRecord>>,
    pub external: Mutex<Vec<ExternalApplicationRecord>>,
    pub contacts: Mutex<Vec<RecruiterContactRecord>>,
}

impl MemorySink {
    pub fn skipped_links(&self) -> Vec<String> {
        self.skipped.lock().unwrap().iter().map(|r| r.job_link.clone()).collect()
    }

    pub fn external_count(&self) -> usize {
        self.external.lock().unwrap().len()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.lock().unwrap().len()
    }
}

impl EventSink for MemorySink {
    fn record_applied(&self, job: &JobCandidate) -> Result<(), AgentError> {
        self.applied.lock().unwrap().push(job.clone());
        Ok(())
    }

    fn record_skipped(&self, record: &SkipRecord) -> Result<(), AgentError> {
        self.skipped.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn record_external(&self, record: &ExternalApplicationRecord) -> Result<(), AgentError> {
        self.external.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn record_contact(&self, record: &RecruiterContactRecord) -> Result<(), AgentError> {
        self.contacts.lock().unwrap().push(record.clone());
        Ok(())
    }
}
