//! Interval task scheduler.
//!
//! Derives recurring tasks from the extension registry, decides which are
//! due on each tick, and persists last-run timestamps so schedules
//! survive process restarts.

pub mod runner;
pub mod state;
pub mod tasks;

pub use runner::Scheduler;
pub use state::RunStateStore;
pub use tasks::{TaskDescriptor, TaskStatus, now_epoch_secs};
