//! # Meshing
//!
//! Everything between a chunk's density and the triangles it hands to the
//! renderer:
//!
//! - `marching_cubes`: the pure density-to-triangles transform
//! - `tables`: the static corner, edge and configuration tables it reads
//! - `mesh_data`: the triangle soup it produces
//! - `MeshGenerator`: the request dispatcher that runs triangulation on the
//!   worker pool and delivers results back on the tick thread
//!
//! ## Request Flow
//! 1. `request_mesh()` wraps the density in a task, publishes it and stores the
//!    completion callback on the tick thread, keyed by task id
//! 2. A worker triangulates and pushes the result onto the pending queue
//! 3. `update()` (once per tick) drains the queue and calls each callback in
//!    completion order, on the calling thread
//!
//! Callbacks never cross threads, so they may capture non-`Send` state such as
//! weak chunk handles.

pub mod marching_cubes;
pub mod mesh_data;
pub mod mesh_generation_task;
pub mod tables;

use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};

pub use marching_cubes::triangulate;
pub use mesh_data::MeshData;
pub use mesh_generation_task::{MeshGenerationTask, RequestToken};

use crate::engine_state::{
    error::{MeshError, TaskError},
    task_management::{task::TaskId, TaskManager},
    voxels::density::DensityField,
};

/// Completion callback for a mesh request. Runs on the tick thread.
pub type MeshCallback = Box<dyn FnOnce(Result<MeshData, MeshError>)>;

struct PendingRequest {
    token: RequestToken,
    on_complete: MeshCallback,
}

/// Running totals of what happened to finished requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Requests whose callback received a mesh.
    pub delivered: u64,
    /// Requests whose callback received an error.
    pub failed: u64,
    /// Results dropped because their token was cancelled.
    pub discarded: u64,
}

/// Runs mesh requests on background workers and delivers results once per tick.
pub struct MeshGenerator {
    task_manager: TaskManager<MeshGenerationTask>,
    requests: HashMap<TaskId, PendingRequest>,
    next_sequence: u64,
    stats: DispatchStats,
}

impl MeshGenerator {
    /// Creates a dispatcher backed by `num_workers` threads.
    pub fn new(num_workers: usize, max_tasks_in_flight: usize) -> Result<Self, TaskError> {
        Ok(Self {
            task_manager: TaskManager::new(num_workers, max_tasks_in_flight)?,
            requests: HashMap::new(),
            next_sequence: 0,
            stats: DispatchStats::default(),
        })
    }

    /// Queues `density` for triangulation and returns immediately.
    ///
    /// `on_complete` is invoked from a later [`MeshGenerator::update`] with the
    /// mesh or the reason there is none, unless the returned token is cancelled
    /// first. Requests are not ordered relative to each other.
    pub fn request_mesh(
        &mut self,
        density: Arc<DensityField>,
        on_complete: impl FnOnce(Result<MeshData, MeshError>) + 'static,
    ) -> RequestToken {
        let token = RequestToken::new(self.next_sequence);
        self.next_sequence += 1;

        let id = self
            .task_manager
            .publish_task(MeshGenerationTask::new(density, token.clone()));
        debug!("Mesh request {} published as {id}", token.sequence());
        self.requests.insert(
            id,
            PendingRequest {
                token: token.clone(),
                on_complete: Box::new(on_complete),
            },
        );
        token
    }

    /// Delivers every result finished since the last call, then refills idle workers.
    ///
    /// Callbacks run synchronously here, one at a time, in completion order.
    /// Returns how many callbacks were invoked.
    pub fn update(&mut self) -> usize {
        let mut invoked = 0;
        for completion in self.task_manager.process_completed_tasks() {
            let Some(request) = self.requests.remove(&completion.id) else {
                warn!("Completion for unknown {}", completion.id);
                continue;
            };

            if request.token.is_cancelled() {
                debug!("Discarding cancelled mesh request {}", request.token.sequence());
                self.stats.discarded += 1;
                continue;
            }

            let result = completion.outcome.map_err(MeshError::from).and_then(|mesh| mesh);
            match &result {
                Ok(_) => self.stats.delivered += 1,
                Err(err) => {
                    warn!("Mesh request {} failed: {err}", request.token.sequence());
                    self.stats.failed += 1;
                }
            }
            (request.on_complete)(result);
            invoked += 1;
        }

        self.task_manager.process_queued_tasks();
        invoked
    }

    /// Requests not yet delivered or discarded.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// True when no request is outstanding.
    pub fn is_idle(&self) -> bool {
        self.requests.is_empty() && self.task_manager.is_idle()
    }

    /// Totals for delivered, failed and discarded requests.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.task_manager.worker_count()
    }
}
