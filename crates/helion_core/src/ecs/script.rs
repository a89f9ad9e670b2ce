//! # Scripted behaviors
//!
//! Gameplay code attaches to entities as a [`ScriptComponent`] wrapping a
//! user [`ScriptBehavior`]. The built-in [`ScriptSystem`] — registered by
//! every world at construction — drives `tick` once per frame; `start` and
//! `stop` fire from the world's lifecycle hooks when the component enters
//! or leaves a running world, always between ticks.

use std::sync::Arc;

use crate::ecs::component::{Component, ComponentHandle};
use crate::ecs::entity::Entity;
use crate::ecs::system::System;
use crate::ecs::tag::ComponentTag;

/// Per-entity gameplay logic.
///
/// All three callbacks receive the owning entity, run on the simulation
/// side under the component's write lock, and may stage structural changes
/// (spawn, destroy, attach) which land at the next inter-tick drain.
pub trait ScriptBehavior: Send + Sync + 'static {
    /// Called once when the owning entity joins a world.
    fn start(&mut self, entity: &Arc<Entity>) {
        let _ = entity;
    }

    /// Called once when the owning entity leaves its world.
    fn stop(&mut self, entity: &Arc<Entity>) {
        let _ = entity;
    }

    /// Called every frame while the owning entity is in a world.
    fn tick(&mut self, dt: f32, entity: &Arc<Entity>);
}

/// Component slot carrying a boxed [`ScriptBehavior`].
pub struct ScriptComponent {
    behavior: Box<dyn ScriptBehavior>,
    started: bool,
}

impl ScriptComponent {
    #[must_use]
    pub fn new<B: ScriptBehavior>(behavior: B) -> Self {
        Self {
            behavior: Box::new(behavior),
            started: false,
        }
    }

    /// Idempotent: a component attached after spawn and then re-seen at the
    /// spawn drain starts exactly once.
    pub(crate) fn fire_start(&mut self, entity: &Arc<Entity>) {
        if !self.started {
            self.started = true;
            self.behavior.start(entity);
        }
    }

    pub(crate) fn fire_stop(&mut self, entity: &Arc<Entity>) {
        if self.started {
            self.started = false;
            self.behavior.stop(entity);
        }
    }

    pub(crate) fn fire_tick(&mut self, dt: f32, entity: &Arc<Entity>) {
        self.behavior.tick(dt, entity);
    }
}

impl Component for ScriptComponent {}

/// Built-in system that ticks every [`ScriptComponent`] in the world.
pub struct ScriptSystem;

impl System for ScriptSystem {
    fn queries(&self) -> Vec<ComponentTag> {
        vec![ComponentTag::of::<ScriptComponent>()]
    }

    fn tick(&self, dt: f32, entity: &Arc<Entity>, component: &ComponentHandle) {
        if let Some(script) = component.downcast::<ScriptComponent>() {
            script.write().fire_tick(dt, entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Probe {
        starts: Arc<AtomicU32>,
        stops: Arc<AtomicU32>,
        ticks: Arc<AtomicU32>,
    }
    impl ScriptBehavior for Probe {
        fn start(&mut self, _entity: &Arc<Entity>) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn stop(&mut self, _entity: &Arc<Entity>) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        fn tick(&mut self, _dt: f32, _entity: &Arc<Entity>) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_start_stop_idempotent() {
        let starts = Arc::new(AtomicU32::new(0));
        let stops = Arc::new(AtomicU32::new(0));
        let probe = Probe {
            starts: starts.clone(),
            stops: stops.clone(),
            ticks: Arc::new(AtomicU32::new(0)),
        };

        let entity = Entity::new();
        let mut script = ScriptComponent::new(probe);

        script.fire_stop(&entity);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        script.fire_start(&entity);
        script.fire_start(&entity);
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        script.fire_stop(&entity);
        script.fire_stop(&entity);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_system_drives_tick() {
        let ticks = Arc::new(AtomicU32::new(0));
        let probe = Probe {
            starts: Arc::new(AtomicU32::new(0)),
            stops: Arc::new(AtomicU32::new(0)),
            ticks: ticks.clone(),
        };

        let entity = Entity::new();
        let script = entity.attach(ScriptComponent::new(probe));
        let handle = ComponentHandle::of(&script);

        ScriptSystem.tick(0.016, &entity, &handle);
        ScriptSystem.tick(0.016, &entity, &handle);
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }
}
