use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared state that worker threads and the tick thread both reach into.
///
/// A cloneable `Arc<RwLock<T>>`. In this crate it holds the queue of finished
/// tasks: every worker pushes onto it and the tick thread empties it with
/// [`MtResource::take`] once per tick.
///
/// ```
/// use std::thread;
/// use marching_terrain::core::MtResource;
///
/// let finished = MtResource::new(Vec::new());
/// let worker_side = finished.clone();
///
/// thread::spawn(move || worker_side.get_mut().push("mesh ready"))
///     .join()
///     .unwrap();
///
/// assert_eq!(finished.take(), vec!["mesh ready"]);
/// assert!(finished.get().is_empty());
/// ```
///
/// Guards block writers for as long as they live. Drop them before running
/// anything slow, user callbacks included.
pub struct MtResource<T: Send + Sync> {
    /// Lock around the shared value.
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Wraps `resource`.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Shared read access.
    ///
    /// # Panics
    /// If a thread panicked while holding the write lock.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Exclusive write access.
    ///
    /// # Panics
    /// If a thread panicked while holding the write lock.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }

    /// Swaps the value for `T::default()` and returns what was there.
    ///
    /// The write lock is held only for the swap, so producers can keep pushing
    /// while the caller works through what it took.
    pub fn take(&self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self.get_mut())
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
