//! # HELION Core
//!
//! Real-time entity-component-system core for the HELION engine:
//!
//! - Type-indexed component store with capability (alternate-tag) queries
//! - Generation-checked entity arena; structural changes deferred between
//!   ticks
//! - Per-frame concurrent task graph with system ordering constraints,
//!   executed on a rayon pool
//! - Double-buffered frame data handed to a renderer with zero copies
//!
//! ## Example
//!
//! ```rust
//! use helion_core::{Entity, Transform, World, WorldConfig};
//!
//! let world = World::new(WorldConfig::default()).unwrap();
//! let player = Entity::new();
//! player.transform().write().translation.x = 4.0;
//! world.spawn(&player);
//! world.tick(1.0 / 60.0).unwrap();
//! assert_eq!(world.len(), 1);
//! ```

pub mod ecs;
pub mod render;
pub mod sync;

pub use ecs::{
    AudioEmitter, AudioEngine, ChildEntity, Component, ComponentHandle, ComponentRef,
    ComponentSlot, ComponentStore, ComponentTag, EcsError, Entity, EntityId, LocalStore,
    NetworkDelegate, NetworkIdentity, PhysicsBody, PhysicsSolver, ScriptBehavior, ScriptComponent,
    ScriptSystem, SharedStore, StagingStore, System, SystemTag, TaskGraph, Transform, World,
    WorldConfig,
};
pub use render::{
    AmbientLight, CameraBlock, CameraComponent, DirectionalLight, FrameData, FrameDataBuffers,
    InstanceKey, MaterialHandle, MeshHandle, PointLight, SpotLight, StaticMesh,
};
pub use sync::DoubleBuffer;
