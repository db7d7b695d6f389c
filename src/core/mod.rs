//! # Core Module
//!
//! Shared ownership primitives used throughout the terrain subsystem. Both
//! wrappers hand out lock guards instead of raw references so that callers
//! never hold on to data across a tick boundary by accident.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking.
//!   Used for state that worker threads and the tick thread both touch, such as
//!   the pending mesh result queue.
//! - `StResource`: Single-threaded reference-counted resource. Chunks live in one
//!   of these so that mesh callbacks can hold a `WeakStResource` and check that
//!   the chunk is still alive before installing anything.
//!
//! ## Usage
//! ```
//! use marching_terrain::core::{MtResource, StResource};
//!
//! let pending = MtResource::new(vec![1, 2]);
//! pending.get_mut().push(3);
//! assert_eq!(pending.take(), vec![1, 2, 3]);
//!
//! let chunk_like = StResource::new(String::from("chunk"));
//! let weak = chunk_like.downgrade();
//! assert!(weak.upgrade().is_some());
//! drop(chunk_like);
//! assert!(weak.upgrade().is_none());
//! ```

/// Cross-thread shared state.
pub mod mt_resource;
/// Tick-thread shared state and its weak handle.
pub mod st_resource;

pub use mt_resource::MtResource;
pub use st_resource::{StResource, WeakStResource};
