//! Durable run-state: task name → last-run timestamp.
//!
//! One JSON record file, loaded once at scheduler construction, mutated
//! in memory as tasks run, and atomically rewritten at the end of each
//! tick that executed at least one task.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunStateFile {
    #[serde(default = "default_state_version")]
    version: u8,
    #[serde(default)]
    tasks: BTreeMap<String, u64>,
}

fn default_state_version() -> u8 {
    1
}

/// In-memory run state bound to its backing file.
#[derive(Debug)]
pub struct RunStateStore {
    path: PathBuf,
    tasks: BTreeMap<String, u64>,
}

impl RunStateStore {
    /// Load persisted run state from `path`.
    ///
    /// An absent file is the first run, not a failure: the store starts
    /// empty and every task is due immediately.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StatePersistence`] when the file is present
    /// but unreadable or unparsable — silently discarding it would make
    /// every task re-run in lockstep.
    pub fn load(path: PathBuf) -> Result<Self> {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    tasks: BTreeMap::new(),
                });
            }
            Err(e) => {
                return Err(HostError::StatePersistence(format!(
                    "cannot read run state {}: {e}",
                    path.display()
                )));
            }
        };

        let file: RunStateFile = serde_json::from_slice(&bytes).map_err(|e| {
            HostError::StatePersistence(format!(
                "cannot parse run state {}: {e}",
                path.display()
            ))
        })?;

        Ok(Self {
            path,
            tasks: file.tasks,
        })
    }

    /// Epoch seconds of the last recorded run; `None` means never run.
    #[must_use]
    pub fn last_run(&self, task: &str) -> Option<u64> {
        self.tasks.get(task).copied()
    }

    /// Record a run in memory. Does not touch the disk; call [`flush`]
    /// at the end of the tick.
    ///
    /// [`flush`]: Self::flush
    pub fn record_run(&mut self, task: &str, when: u64) {
        self.tasks.insert(task.to_owned(), when);
    }

    /// Atomically persist the current state: write a temp file in the
    /// same directory, then rename over the target, so a crash mid-write
    /// never corrupts the previous durable state.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StatePersistence`] when the directory cannot
    /// be created or the write/rename fails.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HostError::StatePersistence(format!("cannot create state dir: {e}"))
            })?;
        }

        let file = RunStateFile {
            version: default_state_version(),
            tasks: self.tasks.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| HostError::StatePersistence(format!("cannot serialize run state: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| {
            HostError::StatePersistence(format!("cannot write run state temp file: {e}"))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            HostError::StatePersistence(format!("cannot finalize run state file: {e}"))
        })?;
        Ok(())
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
