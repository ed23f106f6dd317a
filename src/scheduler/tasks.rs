//! Recurring-task descriptors and due computation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A recurring task derived from the extension registry.
///
/// Immutable once derived; the descriptor set is built exactly once at
/// scheduler construction from everything registered under the
/// recurring-task point.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    /// Extension name, unique within the recurring-task point.
    pub name: String,
    /// Parsed interval between runs.
    pub interval: Duration,
}

impl TaskDescriptor {
    /// Whether the task is due at `now` given its last recorded run.
    ///
    /// A task with no recorded run is always due. A clock that moved
    /// backwards makes elapsed time saturate to zero; the task simply
    /// waits until wall-clock time catches up.
    #[must_use]
    pub fn is_due(&self, last_run: Option<u64>, now: u64) -> bool {
        match last_run {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval.as_secs(),
        }
    }
}

/// Introspection snapshot of one task, for CLI reporting.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    /// Task name.
    pub name: String,
    /// Interval in seconds.
    pub interval_secs: u64,
    /// Epoch seconds of the last recorded run, if any.
    pub last_run: Option<u64>,
}

/// Current UTC seconds since epoch.
#[must_use]
pub fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
