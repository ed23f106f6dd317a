//! YAML settings store.
//!
//! Settings come from one or more YAML files merged in order; later files
//! deep-merge over earlier ones. Lookups use dotted keys
//! (`"archive-defaults.delta"`) and soft defaults — a missing key is never
//! an error. A missing file is a soft condition too; a present-but-invalid
//! file is fatal.

use std::path::Path;

use serde_yaml_ng::Value;

use crate::error::{HostError, Result};

/// Merged, read-only view of the host settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// An empty settings store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a YAML file into the store.
    ///
    /// Returns `Ok(false)` when the file does not exist — first run is not
    /// a failure; the caller decides whether to warn.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Settings`] when the file exists but cannot be
    /// read or parsed.
    pub fn load_file(&mut self, path: &Path) -> Result<bool> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(HostError::Settings(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        let value: Value = serde_yaml_ng::from_str(&text).map_err(|e| {
            HostError::Settings(format!("cannot parse {}: {e}", path.display()))
        })?;
        self.merge(value);
        Ok(true)
    }

    /// Deep-merge a YAML value over the current settings.
    ///
    /// Mappings merge recursively; any other overlay value replaces the
    /// existing one. A `Null` overlay (e.g. an empty file) is a no-op.
    pub fn merge(&mut self, overlay: Value) {
        merge_value(&mut self.root, overlay);
    }

    /// Look up a value by dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = &self.root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// String value for a dotted key, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// String value for a dotted key, with a default.
    #[must_use]
    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_owned()
    }

    /// Unsigned integer value for a dotted key, with a default.
    #[must_use]
    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(Value::as_u64).unwrap_or(default)
    }

    /// Boolean value for a dotted key, with a default.
    #[must_use]
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Sequence value for a dotted key; missing or non-sequence keys yield
    /// an empty slice.
    #[must_use]
    pub fn sequence(&self, key: &str) -> &[Value] {
        match self.get(key) {
            Some(Value::Sequence(items)) => items,
            _ => &[],
        }
    }
}

fn merge_value(base: &mut Value, overlay: Value) {
    use serde_yaml_ng::mapping::Entry;

    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.entry(key) {
                    Entry::Occupied(mut existing) => merge_value(existing.get_mut(), value),
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
