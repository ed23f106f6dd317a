//! Built-in plugins shipped with the host.

pub mod archiver;

use crate::error::Result;
use crate::registry::ExtensionRegistry;

/// Register every built-in plugin under its extension points.
///
/// # Errors
///
/// Propagates registration errors (duplicate names, undeclared points).
pub fn register_builtins(registry: &mut ExtensionRegistry) -> Result<()> {
    archiver::register(registry)
}
