use std::{
    rc::{Rc, Weak},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Tick-thread state that several owners refer to.
///
/// An `Rc<RwLock<T>>`, so it never crosses threads. Chunks are stored this way:
/// the terrain manager holds the strong handle and pending mesh callbacks hold a
/// [`WeakStResource`], which stops resolving once the chunk is dropped.
///
/// ```
/// use marching_terrain::core::StResource;
///
/// let chunk = StResource::new(String::from("chunk 0"));
/// let callback_side = chunk.downgrade();
///
/// if let Some(live) = callback_side.upgrade() {
///     live.get_mut().push_str(" (meshed)");
/// }
/// assert_eq!(*chunk.get(), "chunk 0 (meshed)");
///
/// drop(chunk);
/// assert!(callback_side.upgrade().is_none());
/// ```
///
/// Taking a second guard on the same thread while a write guard is alive may
/// panic or deadlock.
pub struct StResource<T> {
    /// Lock around the shared value.
    pub resource: Rc<RwLock<T>>,
}

impl<T> StResource<T> {
    /// Wraps `resource`.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RwLock::new(resource)),
        }
    }

    /// Creates a new `StResource` whose value is built with access to a weak handle
    /// to itself.
    ///
    /// The weak handle cannot be upgraded until this function returns.
    pub fn new_cyclic(build: impl FnOnce(WeakStResource<T>) -> T) -> Self {
        Self {
            resource: Rc::new_cyclic(|weak| {
                RwLock::new(build(WeakStResource {
                    resource: weak.clone(),
                }))
            }),
        }
    }

    /// Shared read access.
    ///
    /// # Panics
    /// If a panic happened while the write lock was held.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Exclusive write access.
    ///
    /// # Panics
    /// If a panic happened while the write lock was held.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }

    /// Creates a weak handle that does not keep the value alive.
    pub fn downgrade(&self) -> WeakStResource<T> {
        WeakStResource {
            resource: Rc::downgrade(&self.resource),
        }
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

/// A non-owning handle to an [`StResource`].
pub struct WeakStResource<T> {
    resource: Weak<RwLock<T>>,
}

impl<T> WeakStResource<T> {
    /// Returns a strong handle if the value has not been dropped yet.
    pub fn upgrade(&self) -> Option<StResource<T>> {
        self.resource
            .upgrade()
            .map(|resource| StResource { resource })
    }
}

impl<T> Clone for WeakStResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
