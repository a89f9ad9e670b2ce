//! # ECS Error Types
//!
//! Recoverable conditions (`NotFound`, `StaleEntity`) are resolved at the
//! point of detection: callers either check first or handle the error
//! explicitly; there is no silent default construction. `OrderingCycle` is
//! fatal for the tick that produced it and carries the names of the stuck
//! tasks so the offending constraint can be found.

use thiserror::Error;

use crate::ecs::entity::EntityId;
use crate::ecs::tag::ComponentTag;

/// Errors produced by the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A required component (or capability) was not present in the store.
    #[error("no component of type {tag:?} in store")]
    NotFound {
        /// The tag that was queried.
        tag: ComponentTag,
    },

    /// The entity id refers to a destroyed or recycled slot.
    ///
    /// During a tick this is expected under deferred destruction and is
    /// treated as "skip", not surfaced as an error.
    #[error("entity {id:?} is stale or destroyed")]
    StaleEntity {
        /// The stale id.
        id: EntityId,
    },

    /// The per-tick task graph contained a dependency cycle.
    ///
    /// Ordering constraints are the registrant's responsibility; rather than
    /// deadlocking, the tick fails fast and names every task that never
    /// became ready.
    #[error("ordering constraints form a cycle; stuck tasks: {stuck:?}")]
    OrderingCycle {
        /// Names of the tasks that could not be scheduled.
        stuck: Vec<String>,
    },

    /// An operation required a world the entity is not (or no longer)
    /// spawned in.
    #[error("entity is not spawned in a world")]
    WorldGone,

    /// The worker thread pool could not be constructed.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}
