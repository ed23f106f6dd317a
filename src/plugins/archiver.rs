//! File-archiving plugin.
//!
//! Moves entries older than a timespan out of a source tree into an
//! archive directory, preserving relative paths. Hidden files and `.sync`
//! directories are left alone. Registered twice: as a callable applet for
//! direct CLI invocation, and as a recurring task that archives every
//! entry configured under the `archive` settings key.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_yaml_ng::Value as YamlValue;

use crate::error::{HostError, Result};
use crate::host::Host;
use crate::interval::parse_interval;
use crate::registry::{
    Callable, ExtensionContext, ExtensionInstance, ExtensionRegistry, POINT_CALLABLE,
    POINT_RECURRING_TASK, RecurringTask,
};

/// Interval literal for the recurring archive pass.
const TASK_INTERVAL: &str = "1H";

/// One archive request: a source tree and an age threshold.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    /// Tree to archive from.
    pub source: PathBuf,
    /// Archive destination; defaults to `"<source> (Archive)"`.
    pub destination: Option<PathBuf>,
    /// Entries whose age is at least this are moved.
    pub delta: Duration,
    /// Plan only; move nothing.
    pub dry_run: bool,
}

/// A planned or executed archive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOp {
    /// Current location.
    pub from: PathBuf,
    /// Location inside the archive tree.
    pub to: PathBuf,
}

/// Archive `request.source` as of wall-clock `now`.
///
/// Returns the operations performed (or, for a dry run, planned), in
/// deterministic path order. A file already sitting at a destination is
/// kept as a `~`-suffixed backup, matching `mv -b`.
///
/// # Errors
///
/// Fails when the source tree cannot be walked or a move fails.
pub fn archive(request: &ArchiveRequest, now: SystemTime) -> Result<Vec<ArchiveOp>> {
    let source = normalize_path(&request.source);
    let destination = request
        .destination
        .as_deref()
        .map(normalize_path)
        .unwrap_or_else(|| default_destination(&source));
    let cutoff = now.checked_sub(request.delta).unwrap_or(UNIX_EPOCH);

    let mut ops = Vec::new();
    plan_dir(&source, &source, &destination, cutoff, &mut ops)?;

    if !request.dry_run {
        for op in &ops {
            if let Some(parent) = op.to.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if op.to.exists() {
                std::fs::rename(&op.to, backup_path(&op.to))?;
            }
            std::fs::rename(&op.from, &op.to)?;
        }
    }

    Ok(ops)
}

/// Expand a leading `~` to the user's home directory.
fn normalize_path(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push("~");
    path.with_file_name(name)
}

fn default_destination(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_owned());
    source.with_file_name(format!("{name} (Archive)"))
}

fn plan_dir(
    root: &Path,
    dir: &Path,
    dest_root: &Path,
    cutoff: SystemTime,
    ops: &mut Vec<ArchiveOp>,
) -> Result<()> {
    let mut entries: Vec<_> =
        std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            // Sync metadata stays put; everything else is walked.
            if name == ".sync" {
                continue;
            }
            plan_dir(root, &path, dest_root, cutoff, ops)?;
        } else {
            if name.starts_with('.') {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if modified <= cutoff {
                let rel = path.strip_prefix(root).map_err(|e| {
                    HostError::Extension(format!("path escapes source tree: {e}"))
                })?;
                ops.push(ArchiveOp {
                    from: path.clone(),
                    to: dest_root.join(rel),
                });
            }
        }
    }

    Ok(())
}

/// CLI applet: archive one source tree.
pub struct ArchiveApplet {
    ctx: ExtensionContext,
    request: ArchiveRequest,
}

impl Callable for ArchiveApplet {
    fn describe(&self) -> String {
        format!(
            "archive entries in {} older than {}s",
            self.request.source.display(),
            self.request.delta.as_secs()
        )
    }

    fn call(&mut self, _host: &Host) -> Result<serde_json::Value> {
        let _span = self.ctx.span().entered();
        let ops = archive(&self.request, SystemTime::now())?;

        if self.request.dry_run {
            for op in &ops {
                println!("mv -b '{}' '{}'", op.from.display(), op.to.display());
            }
        }

        Ok(serde_json::json!({
            "moved": ops.len(),
            "dry_run": self.request.dry_run,
        }))
    }
}

fn request_from_args(args: &serde_json::Value) -> Result<ArchiveRequest> {
    let source = args
        .get("source")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| HostError::Extension("archive: `source` is required".to_owned()))?;
    let destination = args
        .get("destination")
        .and_then(serde_json::Value::as_str)
        .map(PathBuf::from);
    let delta = args
        .get("delta")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| HostError::Extension("archive: `delta` is required".to_owned()))?;

    Ok(ArchiveRequest {
        source: PathBuf::from(source),
        destination,
        delta: parse_interval(delta)?,
        dry_run: args
            .get("dry_run")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
    })
}

/// Recurring task: archive every entry under the `archive` settings key.
pub struct ArchiveTask {
    ctx: ExtensionContext,
}

impl RecurringTask for ArchiveTask {
    fn interval(&self) -> &str {
        TASK_INTERVAL
    }

    fn execute(&mut self, _host: &Host) -> Result<()> {
        let _span = self.ctx.span().entered();

        let entries: Vec<ArchiveRequest> = self
            .ctx
            .settings()
            .sequence("archive")
            .iter()
            .map(request_from_settings)
            .collect::<Result<_>>()?;

        for request in &entries {
            let ops = archive(request, SystemTime::now())?;
            tracing::info!(
                source = %request.source.display(),
                moved = ops.len(),
                "archive pass complete"
            );
        }

        Ok(())
    }
}

fn request_from_settings(entry: &YamlValue) -> Result<ArchiveRequest> {
    let failed = |reason: &str| HostError::TaskFailed {
        name: "archive".to_owned(),
        reason: reason.to_owned(),
    };

    let source = entry
        .get("source")
        .and_then(YamlValue::as_str)
        .ok_or_else(|| failed("archive entry is missing `source`"))?;
    let delta = entry
        .get("delta")
        .and_then(YamlValue::as_str)
        .ok_or_else(|| failed("archive entry is missing `delta`"))?;
    let destination = entry
        .get("destination")
        .and_then(YamlValue::as_str)
        .map(PathBuf::from);

    Ok(ArchiveRequest {
        source: PathBuf::from(source),
        destination,
        delta: parse_interval(delta)?,
        dry_run: entry
            .get("dry-run")
            .and_then(YamlValue::as_bool)
            .unwrap_or(false),
    })
}

/// Register the archiver under the callable and recurring-task points.
///
/// # Errors
///
/// Propagates registration errors.
pub fn register(registry: &mut ExtensionRegistry) -> Result<()> {
    registry.register_extension(
        POINT_CALLABLE,
        "archive",
        Box::new(|ctx, args| {
            Ok(ExtensionInstance::Callable(Box::new(ArchiveApplet {
                request: request_from_args(args)?,
                ctx,
            })))
        }),
    )?;

    registry.register_extension(
        POINT_RECURRING_TASK,
        "archive",
        Box::new(|ctx, _args| Ok(ExtensionInstance::Task(Box::new(ArchiveTask { ctx })))),
    )?;

    Ok(())
}
