//! # Task System Core Types
//!
//! A [`Task`] is a unit of work that owns everything it needs and runs to
//! completion on a worker thread. Its output travels back to the tick thread as
//! a [`TaskCompletion`], tagged with the [`TaskId`] handed out when the task was
//! published.
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to a worker
//! - `Task::Output` must be `Send + Sync`: it waits in a queue shared with every worker
//! - Tasks should only read shared data; results are the only thing that flows back

use std::fmt;

use crate::engine_state::error::TaskError;

/// A unit of work that can be executed on a background worker.
///
/// # Implementation Guidelines
/// - Own the input data (or hold it behind an `Arc`) rather than borrowing it
/// - Keep tasks coarse-grained to amortise scheduling overhead
/// - Panics are caught by the worker and reported as [`TaskError::Panicked`]
pub trait Task: Send + 'static {
    /// What the task produces.
    type Output: Send + Sync + 'static;

    /// Runs the task. Called exactly once, on a worker thread.
    fn process(&self) -> Self::Output;
}

/// Identifier assigned to a task when it is published.
///
/// Ids increase monotonically per `TaskManager`, so they also record publish order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A finished task as seen by the tick thread.
#[derive(Debug)]
pub struct TaskCompletion<O> {
    /// Id returned from `publish_task`.
    pub id: TaskId,
    /// The task's output, or why there is none.
    pub outcome: Result<O, TaskError>,
}
