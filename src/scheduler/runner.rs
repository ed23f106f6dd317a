//! Scheduler tick loop.
//!
//! Each tick walks the derived task descriptors in registration order,
//! executes the due ones through the extension registry, and commits the
//! updated run state with a single atomic flush.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{HostError, Result};
use crate::host::Host;
use crate::interval::parse_interval;
use crate::registry::POINT_RECURRING_TASK;
use crate::scheduler::state::RunStateStore;
use crate::scheduler::tasks::{TaskDescriptor, TaskStatus, now_epoch_secs};

/// The interval task runner.
///
/// Owns the in-memory run state exclusively; nothing else writes the
/// backing file while a scheduler instance is alive.
pub struct Scheduler {
    descriptors: Vec<TaskDescriptor>,
    state: RunStateStore,
}

impl Scheduler {
    /// Derive task descriptors from every extension registered under the
    /// recurring-task point and load persisted run state.
    ///
    /// Each extension is resolved once to read its interval literal;
    /// extensions are stateless templates, so this is cheap.
    ///
    /// # Errors
    ///
    /// Fails fatally on a malformed interval literal (an invalid schedule
    /// must not default to "never run" or "always run"), on a registered
    /// extension that is not a recurring task, or on a corrupt state file.
    pub fn from_host(host: &Host, state_path: PathBuf) -> Result<Self> {
        let mut descriptors = Vec::new();

        for name in host.registry().list_extensions(POINT_RECURRING_TASK)? {
            let instance = host.resolve(POINT_RECURRING_TASK, &name, &serde_json::Value::Null)?;
            let task = instance
                .into_task()
                .ok_or_else(|| HostError::WrongCapability {
                    point: POINT_RECURRING_TASK.to_owned(),
                    name: name.clone(),
                })?;
            let interval = parse_interval(task.interval())?;
            descriptors.push(TaskDescriptor { name, interval });
        }

        let state = RunStateStore::load(state_path)?;
        info!(
            tasks = descriptors.len(),
            state = %state.path().display(),
            "scheduler ready"
        );
        Ok(Self { descriptors, state })
    }

    /// Snapshot of every tracked task with interval and last run.
    #[must_use]
    pub fn describe_tasks(&self) -> Vec<TaskStatus> {
        self.descriptors
            .iter()
            .map(|descriptor| TaskStatus {
                name: descriptor.name.clone(),
                interval_secs: descriptor.interval.as_secs(),
                last_run: self.state.last_run(&descriptor.name),
            })
            .collect()
    }

    /// One scheduling pass at wall-clock `now` (epoch seconds).
    ///
    /// Due tasks run sequentially in registration order. A failing task is
    /// logged and its timestamp still advances to `now` — it retries at
    /// the next full interval, never every tick. Returns the number of
    /// tasks executed.
    ///
    /// # Errors
    ///
    /// Never fails for an individual task; fails only when the end-of-tick
    /// run-state flush fails, which is fatal for this invocation.
    pub fn tick(&mut self, host: &Host, now: u64) -> Result<usize> {
        let Self { descriptors, state } = self;
        let mut executed = 0;

        for descriptor in descriptors.iter() {
            if !descriptor.is_due(state.last_run(&descriptor.name), now) {
                continue;
            }

            debug!(task = %descriptor.name, "task due");
            match execute_task(host, &descriptor.name) {
                Ok(()) => info!(task = %descriptor.name, "task completed"),
                Err(e) => warn!(
                    task = %descriptor.name,
                    error = %e,
                    "task failed; next attempt after its full interval"
                ),
            }
            state.record_run(&descriptor.name, now);
            executed += 1;
        }

        if executed > 0 {
            self.state.flush()?;
        }
        Ok(executed)
    }

    /// Drive ticks on a timer until a flush failure.
    ///
    /// The first tick fires immediately; a run-state persistence failure
    /// ends the loop, since continuing without durable state risks
    /// repeated re-execution.
    ///
    /// # Errors
    ///
    /// Returns the fatal persistence error that ended the loop.
    pub async fn run(&mut self, host: &Host, tick_interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(tick_interval);
        loop {
            ticker.tick().await;
            let executed = self.tick(host, now_epoch_secs())?;
            debug!(executed, "tick complete");
        }
    }
}

fn execute_task(host: &Host, name: &str) -> Result<()> {
    let instance = host.resolve(POINT_RECURRING_TASK, name, &serde_json::Value::Null)?;
    let mut task = instance
        .into_task()
        .ok_or_else(|| HostError::WrongCapability {
            point: POINT_RECURRING_TASK.to_owned(),
            name: name.to_owned(),
        })?;
    task.execute(host)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::registry::{ExtensionInstance, RecurringTask};
    use crate::settings::Settings;

    struct CountingTask {
        interval: &'static str,
        calls: Arc<AtomicUsize>,
        fail_first: bool,
    }

    impl RecurringTask for CountingTask {
        fn interval(&self) -> &str {
            self.interval
        }
        fn execute(&mut self, _host: &Host) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(HostError::Extension("injected failure".to_owned()));
            }
            Ok(())
        }
    }

    fn make_host() -> (tempfile::TempDir, Host) {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(Settings::new(), dir.path().join("cache")).unwrap();
        (dir, host)
    }

    fn register_task(
        host: &mut Host,
        name: &str,
        interval: &'static str,
        fail_first: bool,
    ) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let task_calls = Arc::clone(&calls);
        host.registry_mut()
            .register_extension(
                POINT_RECURRING_TASK,
                name,
                Box::new(move |_ctx, _args| {
                    Ok(ExtensionInstance::Task(Box::new(CountingTask {
                        interval,
                        calls: Arc::clone(&task_calls),
                        fail_first,
                    })))
                }),
            )
            .unwrap();
        calls
    }

    fn state_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        (dir, path)
    }

    #[test]
    fn never_run_task_executes_on_first_tick() {
        let (_cache_dir, mut host) = make_host();
        let calls = register_task(&mut host, "pulse", "1H", false);
        let (_dir, path) = state_path();

        let mut scheduler = Scheduler::from_host(&host, path).unwrap();
        let executed = scheduler.tick(&host, 50_000).unwrap();

        assert_eq!(executed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.describe_tasks()[0].last_run, Some(50_000));
    }

    #[test]
    fn task_waits_a_full_interval_between_runs() {
        let (_cache_dir, mut host) = make_host();
        let calls = register_task(&mut host, "pulse", "1H", false);
        let (_dir, path) = state_path();
        let mut scheduler = Scheduler::from_host(&host, path).unwrap();

        let now0 = 100_000;
        assert_eq!(scheduler.tick(&host, now0).unwrap(), 1);
        assert_eq!(scheduler.tick(&host, now0 + 1_800).unwrap(), 0);
        assert_eq!(scheduler.tick(&host, now0 + 3_660).unwrap(), 1);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.describe_tasks()[0].last_run, Some(now0 + 3_660));
    }

    #[test]
    fn failed_task_still_advances_and_retries_next_interval() {
        let (_cache_dir, mut host) = make_host();
        let calls = register_task(&mut host, "flaky", "1H", true);
        let (_dir, path) = state_path();
        let mut scheduler = Scheduler::from_host(&host, path).unwrap();

        let now0 = 100_000;
        // First execution fails; the timestamp still advances.
        assert_eq!(scheduler.tick(&host, now0).unwrap(), 1);
        assert_eq!(scheduler.describe_tasks()[0].last_run, Some(now0));
        // No immediate retry within the interval.
        assert_eq!(scheduler.tick(&host, now0 + 60).unwrap(), 0);
        // Second execution one interval later succeeds.
        assert_eq!(scheduler.tick(&host, now0 + 3_600).unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tasks_run_in_registration_order_and_timestamps_match_now() {
        let (_cache_dir, mut host) = make_host();
        let first = register_task(&mut host, "zeta", "1H", false);
        let second = register_task(&mut host, "alpha", "2H", false);
        let (_dir, path) = state_path();
        let mut scheduler = Scheduler::from_host(&host, path).unwrap();

        let now = 42_000;
        assert_eq!(scheduler.tick(&host, now).unwrap(), 2);

        let statuses = scheduler.describe_tasks();
        assert_eq!(statuses[0].name, "zeta");
        assert_eq!(statuses[1].name, "alpha");
        assert_eq!(statuses[0].last_run, Some(now));
        assert_eq!(statuses[1].last_run, Some(now));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_state_survives_scheduler_restart() {
        let (_cache_dir, mut host) = make_host();
        let calls = register_task(&mut host, "pulse", "1H", false);
        let (_dir, path) = state_path();

        let now0 = 100_000;
        {
            let mut scheduler = Scheduler::from_host(&host, path.clone()).unwrap();
            assert_eq!(scheduler.tick(&host, now0).unwrap(), 1);
        }

        let mut scheduler = Scheduler::from_host(&host, path).unwrap();
        assert_eq!(scheduler.describe_tasks()[0].last_run, Some(now0));
        // Still within the interval after restart.
        assert_eq!(scheduler.tick(&host, now0 + 600).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_tick_does_not_touch_the_state_file() {
        let (_cache_dir, mut host) = make_host();
        register_task(&mut host, "pulse", "1H", false);
        let (_dir, path) = state_path();
        let mut scheduler = Scheduler::from_host(&host, path.clone()).unwrap();

        let now0 = 100_000;
        scheduler.tick(&host, now0).unwrap();
        let first_write = std::fs::metadata(&path).unwrap().modified().unwrap();

        scheduler.tick(&host, now0 + 10).unwrap();
        let second_write = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(first_write, second_write);
    }

    #[test]
    fn malformed_interval_literal_is_fatal_at_construction() {
        let (_cache_dir, mut host) = make_host();
        register_task(&mut host, "bad", "soon", false);
        let (_dir, path) = state_path();

        assert!(matches!(
            Scheduler::from_host(&host, path),
            Err(HostError::MalformedInterval { .. })
        ));
    }

    #[test]
    fn factory_error_is_fatal_at_construction() {
        let (_cache_dir, mut host) = make_host();
        host.registry_mut()
            .register_extension(
                POINT_RECURRING_TASK,
                "imposter",
                Box::new(|_ctx, _args| {
                    Err(HostError::Extension("cannot build".to_owned()))
                }),
            )
            .unwrap();
        let (_dir, path) = state_path();

        assert!(Scheduler::from_host(&host, path).is_err());
    }

    #[tokio::test]
    async fn run_loop_ticks_immediately() {
        let (_cache_dir, mut host) = make_host();
        let calls = register_task(&mut host, "pulse", "1H", false);
        let (_dir, path) = state_path();
        let mut scheduler = Scheduler::from_host(&host, path).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.run(&host, Duration::from_secs(3_600)),
        )
        .await;

        // The loop only returns on error; the timeout fires after the
        // first immediate tick has executed.
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
