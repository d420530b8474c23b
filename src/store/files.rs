use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::error::AgentError;
use crate::models::event::{
    ExternalApplicationRecord, RecruiterContactRecord, SkipRecord, applied_line, format_timestamp,
};
use crate::models::job::JobCandidate;
use crate::store::EventSink;

pub const APPLIED_LOG: &str = "applied_jobs.log";
pub const SKIPPED_LOG: &str = "skipped_log.csv";
pub const EXTERNAL_LOG: &str = "external_applications.csv";
pub const CONTACT_LOG: &str = "recruiter_contacts.log";

const SKIPPED_HEADER: [&str; 3] = ["timestamp", "job_title", "job_link"];
const EXTERNAL_HEADER: [&str; 5] = ["timestamp", "job_title", "company", "naukri_link", "external_url"];

/// Appends audit rows to files under a state directory.
pub struct FileSink {
    dir: PathBuf,
    // Serialises appends so rows never interleave.
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn open_append(path: &Path) -> Result<File, AgentError> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }

    fn append_line(&self, name: &str, line: &str) -> Result<(), AgentError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = Self::open_append(&self.dir.join(name))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Append one CSV row, writing `header` first if the file is new or empty.
    fn append_row(&self, name: &str, header: &[&str], row: &[&str]) -> Result<(), AgentError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.dir.join(name);
        let header_needed = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = Self::open_append(&path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if header_needed {
            writer.write_record(header)?;
        }
        writer.write_record(row)?;
        writer.flush()?;
        Ok(())
    }
}

impl EventSink for FileSink {
    fn record_applied(&self, job: &JobCandidate) -> Result<(), AgentError> {
        self.append_line(APPLIED_LOG, &applied_line(&Local::now(), job))
    }

    fn record_skipped(&self, record: &SkipRecord) -> Result<(), AgentError> {
        let ts = format_timestamp(&record.timestamp);
        self.append_row(
            SKIPPED_LOG,
            &SKIPPED_HEADER,
            &[&ts, &record.job_title, &record.job_link],
        )
    }

    fn record_external(&self, record: &ExternalApplicationRecord) -> Result<(), AgentError> {
        let ts = format_timestamp(&record.timestamp);
        self.append_row(
            EXTERNAL_LOG,
            &EXTERNAL_HEADER,
            &[
                &ts,
                &record.job_title,
                &record.company,
                &record.naukri_link,
                &record.external_url,
            ],
        )
    }

    fn record_contact(&self, record: &RecruiterContactRecord) -> Result<(), AgentError> {
        self.append_line(CONTACT_LOG, &record.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobSource;
    use crate::models::recruiter::RecruiterInfo;

    fn job() -> JobCandidate {
        JobCandidate::new("Data Analyst, Ops", "https://www.naukri.com/j/9", "Acme", JobSource::Scrape)
    }

    #[test]
    fn skipped_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        sink.record_skipped(&SkipRecord::for_job(&job())).unwrap();
        sink.record_skipped(&SkipRecord::for_job(&job())).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(SKIPPED_LOG)).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,job_title,job_link");
        // Titles with commas are quoted.
        assert!(lines[1].ends_with(",\"Data Analyst, Ops\",https://www.naukri.com/j/9"));
    }

    #[test]
    fn external_row_has_five_columns() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let record = ExternalApplicationRecord::for_job(&job(), "https://careers.example.com/apply/123");
        sink.record_external(&record).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join(EXTERNAL_LOG)).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 5);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][4], "https://careers.example.com/apply/123");
    }

    #[test]
    fn text_logs_append_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        sink.record_applied(&job()).unwrap();
        let recruiter = RecruiterInfo {
            name: Some("Priya".into()),
            contact: Some("priya@acme.com".into()),
        };
        sink.record_contact(&RecruiterContactRecord::for_job(&job(), &recruiter))
            .unwrap();

        let applied = std::fs::read_to_string(dir.path().join(APPLIED_LOG)).unwrap();
        assert!(applied.trim_end().ends_with("| Data Analyst, Ops | https://www.naukri.com/j/9"));
        let contacts = std::fs::read_to_string(dir.path().join(CONTACT_LOG)).unwrap();
        assert!(contacts.contains("HR Name: Priya | Contact Info: priya@acme.com"));
    }
}
