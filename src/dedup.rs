//! Dedup tracker: durable record of fully-committed source identifiers.
//!
//! Backed by an append-only newline-delimited log. An identifier appears in
//! the log if and only if a full pipeline run for it reached terminal
//! success; entries are never removed. If the log is unreadable the tracker
//! fails closed: it treats every identifier as unprocessed and warns, rather
//! than silently skipping real work.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::DedupStoreError;

pub struct DedupTracker {
    log_path: PathBuf,
    processed: HashSet<String>,
}

impl DedupTracker {
    /// Load the processed set from the log. Read failures are not fatal.
    pub fn load(log_path: &Path) -> Self {
        let processed = if log_path.exists() {
            match fs::read_to_string(log_path) {
                Ok(content) => content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_owned)
                    .collect(),
                Err(e) => {
                    warn!(
                        path = %log_path.display(),
                        error = %e,
                        "dedup log unreadable; treating all identifiers as unprocessed"
                    );
                    HashSet::new()
                }
            }
        } else {
            HashSet::new()
        };
        info!(
            path = %log_path.display(),
            committed = processed.len(),
            "loaded dedup log"
        );
        DedupTracker {
            log_path: log_path.to_path_buf(),
            processed,
        }
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Append `id` to the log. Idempotent: marking an already-marked
    /// identifier is a no-op.
    pub fn mark_processed(&mut self, id: &str) -> Result<(), DedupStoreError> {
        if self.processed.contains(id) {
            debug!(id, "identifier already committed; mark is a no-op");
            return Ok(());
        }
        let io_err = |e| DedupStoreError {
            path: self.log_path.display().to_string(),
            source: e,
        };
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(io_err)?;
        writeln!(file, "{id}").map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        self.processed.insert(id.to_owned());
        info!(id, path = %self.log_path.display(), "committed identifier");
        Ok(())
    }
}
