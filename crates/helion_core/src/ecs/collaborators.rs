//! # Collaborator seams
//!
//! The world drives physics, audio, and replication through trait objects
//! rather than owning those engines. Capability tags ([`PhysicsBody`],
//! [`AudioEmitter`]) let any component type opt in to a collaborator's
//! lifecycle hooks by declaring the tag in
//! [`Component::alternate_tags`](crate::Component::alternate_tags); the
//! concrete numerics live outside this crate.

use std::sync::Arc;

use crate::ecs::component::Component;
use crate::ecs::entity::{Entity, EntityId};
use crate::ecs::tag::ComponentTag;

/// External physics engine. `spawn`/`destroy` fire from the structural
/// drain when a component carrying the [`PhysicsBody`] capability joins or
/// leaves the world; `step` runs as a task-graph node between the declared
/// physics-write and physics-read systems.
pub trait PhysicsSolver: Send + Sync + 'static {
    fn spawn(&self, entity: &Arc<Entity>);
    fn destroy(&self, entity: &Arc<Entity>);
    fn step(&self, dt: f32);
}

/// External audio mixer, hooked through the [`AudioEmitter`] capability.
/// `tick` runs as an unordered task-graph node each frame.
pub trait AudioEngine: Send + Sync + 'static {
    fn emitter_added(&self, entity: &Arc<Entity>);
    fn emitter_removed(&self, entity: &Arc<Entity>);
    fn tick(&self, dt: f32);
}

/// Replication sink. Notified from the structural drain whenever a
/// [`NetworkIdentity`] that asked for replication enters or leaves the
/// world. Wire formats and transport are out of scope.
pub trait NetworkDelegate: Send + Sync + 'static {
    fn component_added(&self, entity: EntityId, tag: ComponentTag);
    fn component_removed(&self, entity: EntityId, tag: ComponentTag);
}

/// Capability tag: the component represents a body the physics solver
/// should simulate.
pub struct PhysicsBody;

impl PhysicsBody {
    #[must_use]
    pub fn tag() -> ComponentTag {
        ComponentTag::of::<Self>()
    }
}

/// Capability tag: the component emits audio.
pub struct AudioEmitter;

impl AudioEmitter {
    #[must_use]
    pub fn tag() -> ComponentTag {
        ComponentTag::of::<Self>()
    }
}

/// Marks an entity as network-visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkIdentity {
    /// Stable cross-host object id.
    pub network_id: u64,
    /// Whether attach/detach of this identity should notify the delegate.
    pub trigger_replication: bool,
}

impl NetworkIdentity {
    #[must_use]
    pub fn new(network_id: u64) -> Self {
        Self {
            network_id,
            trigger_replication: true,
        }
    }

    /// An identity that is tracked locally but never announced.
    #[must_use]
    pub fn silent(network_id: u64) -> Self {
        Self {
            network_id,
            trigger_replication: false,
        }
    }
}

impl Component for NetworkIdentity {}
