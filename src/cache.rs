//! Disk-backed content cache.
//!
//! Expendable key/value storage under the host cache directory. Keys are
//! hashed with blake3 so callers can use arbitrary strings (URLs, paths).
//! A missing or expired entry is a soft condition, never an error.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::error::Result;

/// A flat-file content cache rooted at one directory.
#[derive(Debug)]
pub struct DiskCache {
    basedir: PathBuf,
}

impl DiskCache {
    /// Open (and create) a cache rooted at `basedir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(basedir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&basedir)?;
        Ok(Self { basedir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.basedir
            .join(blake3::hash(key.as_bytes()).to_hex().as_str())
    }

    /// Store a value under `key`, replacing any previous value.
    ///
    /// The write is atomic (temp file + rename) so a concurrent reader
    /// never observes a partial entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.entry_path(key);
        let tmp_path = path.with_extension(format!("tmp-{}", std::process::id()));
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Fetch the value for `key`, if present and younger than `max_age`.
    ///
    /// `None` max age means any stored value is acceptable. Unreadable
    /// entries are treated as absent.
    #[must_use]
    pub fn get(&self, key: &str, max_age: Option<Duration>) -> Option<Vec<u8>> {
        let path = self.entry_path(key);

        if let Some(max_age) = max_age {
            let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            let age = SystemTime::now().duration_since(modified).ok()?;
            if age > max_age {
                return None;
            }
        }

        std::fs::read(&path).ok()
    }

    /// Remove the entry for `key`. Returns `true` when an entry existed.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing entry cannot be deleted.
    pub fn remove(&self, key: &str) -> Result<bool> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every entry whose age is at least `older_than`.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be listed.
    pub fn purge(&self, older_than: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.basedir)? {
            let entry = entry?;
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age >= older_than && std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}
