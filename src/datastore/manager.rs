//! Attachment datastore path management
//!
//! Tracks an ordered queue of candidate directories and the remaining
//! capacity of the current one. Paths judged oversized, inaccessible or
//! unwritable are removed for the rest of the process lifetime.

use crate::error::MonitorError;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of probing the current datastore path for writability.
#[derive(Debug)]
pub enum WriteProbe {
    /// A test file was created and removed
    Writable,
    /// The test file could not be created
    Unwritable(std::io::Error),
    /// The probe could not be carried out
    Failed(MonitorError),
}

/// Owns the datastore path queue and capacity bookkeeping.
///
/// The head of the queue is the current path. Capacity is only recomputed
/// by [`DatastoreManager::refresh`]; [`DatastoreManager::spend`] merely
/// decrements the running balance, which may go negative.
#[derive(Debug, Clone)]
pub struct DatastoreManager {
    paths: VecDeque<PathBuf>,
    max_capacity: Option<u64>,
    remaining: i64,
}

impl DatastoreManager {
    /// Create a manager over `paths` (priority order) with an optional
    /// per-directory byte budget.
    ///
    /// The first [`refresh`](Self::refresh) inspects the head path.
    pub fn new(paths: impl IntoIterator<Item = PathBuf>, max_capacity: Option<u64>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            max_capacity,
            remaining: 0,
        }
    }

    /// Current datastore path, if any remain.
    pub fn current_path(&self) -> Option<&Path> {
        self.paths.front().map(PathBuf::as_path)
    }

    /// Whether every path has been removed.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remaining paths, current first.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Remaining capacity of the current path, in bytes.
    pub fn remaining_capacity(&self) -> i64 {
        self.remaining
    }

    pub fn max_capacity(&self) -> Option<u64> {
        self.max_capacity
    }

    /// Recompute capacity, removing exhausted paths.
    ///
    /// No-op without a budget, with an empty queue, or while capacity
    /// remains. Otherwise the head path is re-measured until one with room
    /// is found or the queue runs out.
    pub fn refresh(&mut self) {
        let Some(budget) = self.max_capacity else {
            return;
        };
        if self.paths.is_empty() || self.remaining > 0 {
            return;
        }

        while let Some(head) = self.paths.front() {
            match directory_size(head) {
                Err(e) => {
                    warn!(path = %head.display(), error = %e, "Removed datastore path (inaccessible)");
                    self.paths.pop_front();
                }
                Ok(used) => {
                    let remaining = i64::try_from(budget)
                        .unwrap_or(i64::MAX)
                        .saturating_sub(i64::try_from(used).unwrap_or(i64::MAX));
                    if remaining <= 0 {
                        warn!(
                            path = %head.display(),
                            used,
                            budget,
                            "Removed datastore path (over size limit)"
                        );
                        self.paths.pop_front();
                    } else {
                        debug!(path = %head.display(), remaining, "Datastore path has capacity");
                        self.remaining = remaining;
                        return;
                    }
                }
            }
        }

        warn!("No datastore paths remaining. Can no longer auto-download attachments.");
    }

    /// Record `bytes` written to the current path.
    pub fn spend(&mut self, bytes: u64) {
        self.remaining = self
            .remaining
            .saturating_sub(i64::try_from(bytes).unwrap_or(i64::MAX));
    }

    /// Remove the current path and return the next one.
    ///
    /// `expected` removals are logged at info level, others as warnings.
    /// Capacity is reset so the next refresh measures the new head.
    pub fn rotate(&mut self, expected: bool) -> Option<&Path> {
        if let Some(removed) = self.paths.pop_front() {
            if expected {
                info!(path = %removed.display(), "Removed datastore path");
            } else {
                warn!(path = %removed.display(), "Removed datastore path");
            }
        }
        self.remaining = 0;
        self.current_path()
    }

    /// Build a fresh destination path for `filename` in the current path.
    ///
    /// The file stem gets an underscore and random alphanumeric characters
    /// appended, one at a time, until the path does not exist. The current
    /// directory is created if needed.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::NoDatastorePaths` when the queue is empty and
    /// `MonitorError::Io` if the directory cannot be created.
    pub fn build_destination_path(&self, filename: &str) -> Result<PathBuf, MonitorError> {
        let dir = self.current_path().ok_or(MonitorError::NoDatastorePaths)?;
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }

        // Remote names must not escape the datastore directory.
        let filename = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("");
        let (stem, extension) = split_extension(filename);

        let mut candidate_name = String::with_capacity(filename.len() + 8);
        candidate_name.push_str(stem);
        if !stem.is_empty() {
            candidate_name.push('_');
        }

        let mut rng = rand::rng();
        loop {
            candidate_name.push(char::from(rng.sample(Alphanumeric)));
            let candidate = if extension.is_empty() {
                dir.join(&candidate_name)
            } else {
                dir.join(format!("{}.{}", candidate_name, extension))
            };
            if !candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    /// Check that the current path accepts new files.
    pub fn probe_writable(&self) -> WriteProbe {
        let Some(dir) = self.current_path() else {
            return WriteProbe::Failed(MonitorError::NoDatastorePaths);
        };

        if let Err(e) = std::fs::create_dir_all(dir) {
            return WriteProbe::Unwritable(e);
        }

        let probe = dir.join(format!(".writetest-{}", uuid::Uuid::new_v4()));
        if let Err(e) = std::fs::File::create(&probe) {
            return WriteProbe::Unwritable(e);
        }
        match std::fs::remove_file(&probe) {
            Ok(()) => WriteProbe::Writable,
            Err(e) => WriteProbe::Failed(MonitorError::Datastore(format!(
                "Failed to remove write probe {}: {}",
                probe.display(),
                e
            ))),
        }
    }
}

/// Total size in bytes of the regular files under `dir`.
///
/// A directory that does not exist yet is empty.
///
/// # Errors
///
/// Returns `MonitorError::Datastore` if `dir` is not a directory or any
/// entry beneath it cannot be read.
pub fn directory_size(dir: &Path) -> Result<u64, MonitorError> {
    if !dir.exists() {
        return Ok(0);
    }
    if !dir.is_dir() {
        return Err(MonitorError::Datastore(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut total = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| MonitorError::Datastore(e.to_string()))?;
        if entry.file_type().is_file() {
            let metadata = entry
                .metadata()
                .map_err(|e| MonitorError::Datastore(e.to_string()))?;
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}

/// Split `name` at its last dot: `"a.tar.gz"` gives `("a.tar", "gz")`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => (name, ""),
    }
}
