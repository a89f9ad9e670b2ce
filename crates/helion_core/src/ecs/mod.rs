//! # Entity Component System
//!
//! The simulation core: type-tagged component storage with capability
//! indexing, generation-checked entities, per-frame concurrent system
//! scheduling, and deferred structural mutation.
//!
//! ## Design Philosophy
//!
//! - Queries return snapshots, never live views
//! - Structural changes apply between ticks, never during one
//! - Ordering is a per-tick constraint graph, not a global list
//! - External engines (physics, audio, net) hang off trait seams

mod collaborators;
mod component;
mod entity;
mod error;
mod lock;
mod schedule;
mod script;
mod store;
mod system;
mod tag;
mod transform;
mod world;

pub use collaborators::{
    AudioEmitter, AudioEngine, NetworkDelegate, NetworkIdentity, PhysicsBody, PhysicsSolver,
};
pub use component::{Component, ComponentHandle, ComponentRef, ComponentSlot};
pub use entity::{ChildEntity, Entity, EntityId};
pub use error::EcsError;
pub use lock::{RawNullLock, RawSpinLock};
pub use schedule::{NodeId, TaskGraph};
pub use script::{ScriptBehavior, ScriptComponent, ScriptSystem};
pub use store::{ComponentStore, LocalStore, SharedStore, StagingStore};
pub use system::System;
pub use tag::{ComponentTag, SystemTag};
pub use transform::Transform;
pub use world::{World, WorldConfig};
