//! Hearth: a personal automation host.
//!
//! The host couples an extension registry (capability points, named
//! extension factories, context-injecting resolution) with an interval
//! scheduler that persists last-run timestamps across restarts. Built-in
//! plugins register applets and recurring tasks against the host's
//! declared points; external consumers can do the same through
//! [`Host::registry_mut`].

#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod cache;
pub mod error;
pub mod hearth_dirs;
pub mod host;
pub mod interval;
pub mod plugins;
pub mod registry;
pub mod scheduler;
pub mod settings;

pub use error::{HostError, Result};
pub use host::Host;
pub use registry::{ExtensionContext, ExtensionInstance, ExtensionRegistry};
pub use scheduler::Scheduler;
pub use settings::Settings;
