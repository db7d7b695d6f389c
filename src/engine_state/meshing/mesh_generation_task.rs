//! Background task that triangulates one chunk's density.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;
use web_time::Instant;

use super::{marching_cubes::triangulate, mesh_data::MeshData};
use crate::engine_state::{
    error::MeshError, task_management::task::Task, voxels::density::DensityField,
};

/// Cancellable handle for one mesh request.
///
/// Clones share the same flag. The requester cancels when the result would be
/// stale or the chunk is gone; the dispatcher then drops the result instead of
/// delivering it.
#[derive(Debug, Clone)]
pub struct RequestToken {
    sequence: u64,
    cancelled: Arc<AtomicBool>,
}

impl RequestToken {
    pub(crate) fn new(sequence: u64) -> Self {
        Self {
            sequence,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Position of this request in issue order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Marks the request as no longer wanted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`RequestToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Triangulates a density field on a worker thread.
pub struct MeshGenerationTask {
    density: Arc<DensityField>,
    token: RequestToken,
}

impl MeshGenerationTask {
    /// Creates a task for `density`.
    ///
    /// If `token` is cancelled before a worker starts the task, it returns an
    /// empty mesh without looking at the density. The dispatcher drops that
    /// result, so no callback ever sees it.
    pub fn new(density: Arc<DensityField>, token: RequestToken) -> Self {
        Self { density, token }
    }
}

impl Task for MeshGenerationTask {
    type Output = Result<MeshData, MeshError>;

    fn process(&self) -> Self::Output {
        if self.token.is_cancelled() {
            debug!("Skipping cancelled request {}", self.token.sequence());
            return Ok(MeshData::default());
        }

        let started = Instant::now();
        let mesh = triangulate(&self.density)?;
        debug!(
            "Request {} meshed {:?} samples into {} triangles in {:?}",
            self.token.sequence(),
            self.density.size(),
            mesh.triangle_count(),
            started.elapsed()
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_task_skips_triangulation() {
        let token = RequestToken::new(7);
        token.cancel();
        // Too thin to mesh: only a skipped task can come back `Ok`.
        let task = MeshGenerationTask::new(Arc::new(DensityField::filled([1, 4, 4], -1)), token);
        assert_eq!(task.process().unwrap(), MeshData::default());
    }

    #[test]
    fn live_task_triangulates() {
        let density = Arc::new(DensityField::from_fn([3, 3, 3], |_, y, _| y as i32 - 1));
        let task = MeshGenerationTask::new(density.clone(), RequestToken::new(0));
        assert_eq!(task.process().unwrap(), triangulate(&density).unwrap());

        let thin = MeshGenerationTask::new(
            Arc::new(DensityField::filled([4, 1, 4], 1)),
            RequestToken::new(1),
        );
        assert!(matches!(thin.process(), Err(MeshError::InvalidDensity(_))));
    }
}
