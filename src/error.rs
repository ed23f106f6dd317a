//! Error types for the hearth host.

/// Top-level error type for the automation host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// An interval literal did not match `<count><unit>`.
    #[error("malformed interval literal `{literal}` (expected <count><S|M|H|D|W>)")]
    MalformedInterval {
        /// The literal as supplied.
        literal: String,
    },

    /// An extension point was declared twice.
    #[error("extension point `{point}` is already declared")]
    DuplicatePoint {
        /// The point name.
        point: String,
    },

    /// An operation referenced an undeclared extension point.
    #[error("unknown extension point `{point}`")]
    UnknownPoint {
        /// The point name that was looked up.
        point: String,
    },

    /// Two extensions registered under the same name within one point.
    #[error("extension `{name}` is already registered under point `{point}`")]
    DuplicateExtension {
        /// The point name.
        point: String,
        /// The conflicting extension name.
        name: String,
    },

    /// A resolve named an extension that was never registered.
    #[error("unknown extension `{name}` under point `{point}`")]
    UnknownExtension {
        /// The point name.
        point: String,
        /// The extension name that was looked up.
        name: String,
    },

    /// A resolved extension does not provide the capability the caller expected.
    #[error("extension `{name}` under point `{point}` does not provide the expected capability")]
    WrongCapability {
        /// The point name.
        point: String,
        /// The extension name.
        name: String,
    },

    /// A recurring task's own logic failed. Recovered by the scheduler:
    /// logged, timestamp still advanced.
    #[error("task `{name}` failed: {reason}")]
    TaskFailed {
        /// The task name.
        name: String,
        /// Why the task failed.
        reason: String,
    },

    /// Run-state file present but unreadable, or a flush failed.
    #[error("run-state persistence error: {0}")]
    StatePersistence(String),

    /// Settings file unreadable or malformed.
    #[error("settings error: {0}")]
    Settings(String),

    /// Extension construction or execution error.
    #[error("extension error: {0}")]
    Extension(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HostError>;
