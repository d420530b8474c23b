use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::AgentError;

pub const APPLIED_JOBS_FILE: &str = "applied_jobs.json";

/// Links already applied to, persisted as a JSON array.
///
/// Loaded once per sweep and rewritten in full after every insert, so a
/// crash loses at most the job in flight.
#[derive(Debug)]
pub struct AppliedStore {
    path: PathBuf,
    links: Vec<String>,
    index: HashSet<String>,
}

impl AppliedStore {
    /// Load the index from `path`. A missing file is an empty store;
    /// repeated links in the file collapse to their first occurrence.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AgentError> {
        let path = path.into();
        let stored: Vec<String> = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut store = Self {
            path,
            links: Vec::with_capacity(stored.len()),
            index: HashSet::with_capacity(stored.len()),
        };
        for link in stored {
            if store.index.insert(link.clone()) {
                store.links.push(link);
            }
        }
        Ok(store)
    }

    pub fn contains(&self, link: &str) -> bool {
        self.index.contains(link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add `link` and persist immediately. Returns false if it was already present.
    pub fn insert(&mut self, link: &str) -> Result<bool, AgentError> {
        if self.index.contains(link) {
            return Ok(false);
        }
        self.links.push(link.to_string());
        self.index.insert(link.to_string());

        if let Err(e) = self.persist() {
            self.links.pop();
            self.index.remove(link);
            return Err(e);
        }
        Ok(true)
    }

    /// Write the whole index to a sibling temp file, then rename over the original.
    fn persist(&self) -> Result<(), AgentError> {
        let json = serde_json::to_string_pretty(&self.links)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
