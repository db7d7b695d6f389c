//! # Task Management System
//!
//! A bounded pool of worker threads for work that must not stall the tick
//! loop. Mesh requests are the main customer.
//!
//! ## Architecture Overview
//! - `TaskManager`: owns the workers, hands out tasks and collects completions
//! - `Task`: a unit of work executed on a worker
//! - `TaskChannel`: the sending half of one worker's task queue
//! - pending completions: a lock-guarded FIFO every worker pushes into and the
//!   tick thread drains
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()` and receive a `TaskId`
//! 2. The manager distributes tasks to worker channels round-robin, up to
//!    `max_tasks_in_flight` per worker; the rest wait on the tick thread
//! 3. A worker runs the task to completion and pushes the result onto the
//!    pending queue under its lock
//! 4. Once per tick, `process_completed_tasks()` swaps the pending queue out and
//!    returns the completions in the order they finished
//! 5. `process_queued_tasks()` then hands waiting tasks to workers that freed up
//!
//! ## Performance Considerations
//! - The pending-queue lock is held only for a push or a swap, never while
//!   callers process results
//! - Worker panics are caught and reported as failures; the worker survives
//! - There is no cancellation: a task that reached a worker runs to completion

pub mod task;

use std::{
    any::Any,
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{channel, Sender},
    thread::{self, JoinHandle},
};

use log::{debug, info};
use task::{Task, TaskCompletion, TaskId};

use crate::{core::MtResource, engine_state::error::TaskError};

/// A completion tagged with the worker channel that produced it.
struct PendingCompletion<O> {
    channel: usize,
    completion: TaskCompletion<O>,
}

/// The sending half of one worker's task queue.
///
/// The worker thread exits once this channel is dropped and its queue is empty.
struct TaskChannel<T: Task> {
    task_sender: Sender<(TaskId, T)>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Holding tasks back when every worker is at its in-flight limit
/// - Collecting completed results for the tick thread
///
/// `TaskManager` itself lives on the tick thread; only the pending completion
/// queue is shared with workers.
pub struct TaskManager<T: Task> {
    channels: Vec<TaskChannel<T>>,
    queued_tasks: VecDeque<(TaskId, T)>,
    pending: MtResource<VecDeque<PendingCompletion<T::Output>>>,
    current_channel: usize,
    max_tasks_in_flight: usize,
    next_task_id: u64,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<T: Task> TaskManager<T> {
    /// Creates a new `TaskManager` with `num_workers` threads (at least one).
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to start
    /// * `max_tasks_in_flight` - Tasks a single worker may hold before new tasks
    ///   are queued on the tick thread instead (at least one)
    ///
    /// # Errors
    /// [`TaskError::Spawn`] if a worker thread cannot be started.
    pub fn new(num_workers: usize, max_tasks_in_flight: usize) -> Result<Self, TaskError> {
        let num_workers = num_workers.max(1);
        let pending = MtResource::new(VecDeque::new());
        let mut channels = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<(TaskId, T)>();
            let results = pending.clone();

            let task_closure = move || {
                while let Ok((id, task)) = task_rx.recv() {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.process()))
                        .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
                    results.get_mut().push_back(PendingCompletion {
                        channel: index,
                        completion: TaskCompletion { id, outcome },
                    });
                }
            };

            let worker = thread::Builder::new()
                .name(format!("terrain-worker-{index}"))
                .spawn(task_closure)?;

            channels.push(TaskChannel {
                task_sender: task_tx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        info!("Started {num_workers} task workers");

        Ok(TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            pending,
            current_channel: 0,
            max_tasks_in_flight: max_tasks_in_flight.max(1),
            next_task_id: 0,
        })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// Returns the task on failure so it can be requeued.
    fn try_send_task(&mut self, task: (TaskId, T), channel_idx: usize) -> Result<(), (TaskId, T)> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds a worker channel below its in-flight limit, round-robin from the
    /// last channel used.
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&index| self.channels[index].num_tasks_in_flight < self.max_tasks_in_flight)
    }

    /// Publishes a new task for execution.
    ///
    /// The task goes straight to a worker if one has capacity, otherwise it waits
    /// on the tick thread until `process_queued_tasks()` finds room. Never blocks.
    pub fn publish_task(&mut self, task: T) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;

        let Some(channel_idx) = self.find_available_channel() else {
            debug!("All workers busy, queueing {id}");
            self.queued_tasks.push_back((id, task));
            return id;
        };

        match self.try_send_task((id, task), channel_idx) {
            Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
            Err(task) => self.queued_tasks.push_back(task),
        }
        id
    }

    /// Hands queued tasks to workers that have capacity, oldest first.
    ///
    /// Call once per tick after `process_completed_tasks()`.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Worker is gone; keep the task for a later tick.
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Takes every completion pushed since the last call, in completion order.
    ///
    /// The pending queue is swapped out under its lock, so workers are never
    /// blocked while the caller handles the results.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskCompletion<T::Output>> {
        let finished = self.pending.take();
        finished
            .into_iter()
            .map(|pending| {
                let channel = &mut self.channels[pending.channel];
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                pending.completion
            })
            .collect()
    }

    /// Tasks handed to workers whose completions have not been collected yet.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Tasks waiting on the tick thread for a worker.
    pub fn queued_task_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// True when nothing is queued, running or awaiting collection.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    struct Square(u64);

    impl Task for Square {
        type Output = u64;

        fn process(&self) -> u64 {
            if self.0 == 13 {
                panic!("unlucky input");
            }
            self.0 * self.0
        }
    }

    fn drain(manager: &mut TaskManager<Square>) -> Vec<TaskCompletion<u64>> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut completions = Vec::new();
        while !manager.is_idle() {
            assert!(Instant::now() < deadline, "tasks did not finish");
            completions.extend(manager.process_completed_tasks());
            manager.process_queued_tasks();
            thread::sleep(Duration::from_millis(1));
        }
        completions
    }

    #[test]
    fn every_published_task_completes_once() {
        let mut manager = TaskManager::new(3, 1).unwrap();
        let ids: Vec<TaskId> = (0..20).map(|n| manager.publish_task(Square(n))).collect();
        assert!(manager.queued_task_count() > 0);

        let mut completions = drain(&mut manager);
        completions.sort_by_key(|completion| completion.id);
        assert_eq!(completions.len(), ids.len());
        for (n, completion) in completions.iter().enumerate() {
            assert_eq!(completion.id, ids[n]);
            let expected = if n == 13 { None } else { Some((n * n) as u64) };
            assert_eq!(completion.outcome.as_ref().ok().copied(), expected);
        }
    }

    #[test]
    fn panicking_task_reports_failure_and_worker_survives() {
        let mut manager = TaskManager::new(1, 4).unwrap();
        let failing = manager.publish_task(Square(13));
        let after = manager.publish_task(Square(3));

        let completions = drain(&mut manager);
        let failure = completions.iter().find(|c| c.id == failing).unwrap();
        match &failure.outcome {
            Err(TaskError::Panicked(message)) => assert!(message.contains("unlucky")),
            other => panic!("expected panic failure, got {other:?}"),
        }
        let success = completions.iter().find(|c| c.id == after).unwrap();
        assert_eq!(success.outcome.as_ref().ok(), Some(&9));
    }

    #[test]
    fn in_flight_limit_holds_tasks_on_tick_thread() {
        let mut manager = TaskManager::new(2, 2).unwrap();
        for n in 0..7 {
            manager.publish_task(Square(n));
        }
        assert_eq!(manager.queued_task_count(), 3);
        assert_eq!(manager.tasks_in_flight(), 4);
        drain(&mut manager);
        assert!(manager.is_idle());
    }

    #[test]
    fn zero_workers_still_gets_one() {
        let manager: TaskManager<Square> = TaskManager::new(0, 1).unwrap();
        assert_eq!(manager.worker_count(), 1);
    }
}
