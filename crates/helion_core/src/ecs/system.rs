//! # Systems
//!
//! A system declares which component types it operates on and, optionally,
//! ordering constraints against other systems. The world expands each
//! registered system into per-query task-graph nodes every tick; the
//! registry here only tracks registration and timed-cadence bookkeeping.

use std::sync::Arc;

use crate::ecs::component::ComponentHandle;
use crate::ecs::entity::Entity;
use crate::ecs::tag::{ComponentTag, SystemTag};

/// Per-frame logic over one component instance at a time.
///
/// `tick` is invoked once per matching component, from worker threads, with
/// the resolved owner entity. Implementations must confine mutation to the
/// component locks and the world's deferred queues; structural changes made
/// through [`Entity`] handles land between ticks.
pub trait System: Send + Sync + 'static {
    /// Component types this system wants to visit. One task-graph node is
    /// scheduled per non-empty query.
    fn queries(&self) -> Vec<ComponentTag>;

    /// Systems that must not start until this one has finished.
    fn must_run_before(&self) -> Vec<SystemTag> {
        Vec::new()
    }

    /// Systems that must finish before this one starts.
    fn must_run_after(&self) -> Vec<SystemTag> {
        Vec::new()
    }

    /// Processes one component instance for this frame.
    fn tick(&self, dt: f32, entity: &Arc<Entity>, component: &ComponentHandle);
}

/// A system paired with the tag it was registered under.
#[derive(Clone)]
pub(crate) struct ScheduledSystem {
    pub tag: SystemTag,
    pub system: Arc<dyn System>,
}

struct TimedEntry {
    scheduled: ScheduledSystem,
    interval: f32,
    next_due: f32,
}

/// Registration table for always-on and fixed-interval systems.
///
/// Timed cadence runs off the accumulated virtual clock: an entry fires on
/// the first tick whose total elapsed time reaches its deadline, then the
/// deadline advances by exactly one interval. Drift does not accumulate and
/// a long frame fires at most one catch-up invocation.
pub(crate) struct SystemRegistry {
    always: Vec<ScheduledSystem>,
    timed: Vec<TimedEntry>,
    elapsed: f32,
}

impl SystemRegistry {
    pub(crate) fn new() -> Self {
        Self {
            always: Vec::new(),
            timed: Vec::new(),
            elapsed: 0.0,
        }
    }

    /// Registers a system to run every tick. Re-registering the same type
    /// replaces the previous instance.
    pub(crate) fn register<S: System>(&mut self, system: S) {
        let tag = SystemTag::of::<S>();
        self.unregister(tag);
        self.always.push(ScheduledSystem {
            tag,
            system: Arc::new(system),
        });
    }

    /// Registers a system to run once every `interval` seconds of virtual
    /// time. The first firing is due `interval` after registration.
    pub(crate) fn register_timed<S: System>(&mut self, system: S, interval: f32) {
        debug_assert!(interval > 0.0);
        let tag = SystemTag::of::<S>();
        self.unregister(tag);
        self.timed.push(TimedEntry {
            scheduled: ScheduledSystem {
                tag,
                system: Arc::new(system),
            },
            interval,
            next_due: self.elapsed + interval,
        });
    }

    /// Removes a system from both tables. Unknown tags are a no-op.
    pub(crate) fn unregister(&mut self, tag: SystemTag) {
        self.always.retain(|s| s.tag != tag);
        self.timed.retain(|t| t.scheduled.tag != tag);
    }

    /// Advances the virtual clock by `dt` and returns every system that
    /// should run this tick, in registration order.
    pub(crate) fn due_systems(&mut self, dt: f32) -> Vec<ScheduledSystem> {
        self.elapsed += dt;
        let mut due: Vec<ScheduledSystem> = self.always.clone();
        for entry in &mut self.timed {
            if self.elapsed >= entry.next_due {
                // Skip over any deadlines the frame blew past entirely.
                while entry.next_due <= self.elapsed {
                    entry.next_due += entry.interval;
                }
                due.push(entry.scheduled.clone());
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Marker;

    #[derive(Default)]
    struct Counting;
    impl System for Counting {
        fn queries(&self) -> Vec<ComponentTag> {
            vec![ComponentTag::of::<Marker>()]
        }
        fn tick(&self, _dt: f32, _entity: &Arc<Entity>, _component: &ComponentHandle) {}
    }

    struct Other;
    impl System for Other {
        fn queries(&self) -> Vec<ComponentTag> {
            vec![ComponentTag::of::<Marker>()]
        }
        fn tick(&self, _dt: f32, _entity: &Arc<Entity>, _component: &ComponentHandle) {}
    }

    #[test]
    fn test_always_systems_fire_every_tick() {
        let mut registry = SystemRegistry::new();
        registry.register(Counting);
        for _ in 0..4 {
            let due = registry.due_systems(1.0);
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].tag, SystemTag::of::<Counting>());
        }
    }

    #[test]
    fn test_timed_cadence() {
        let mut registry = SystemRegistry::new();
        registry.register_timed(Counting, 2.5);

        // With dt = 1.0, a 2.5s interval fires on ticks 3, 5, and 8.
        let mut fired = Vec::new();
        for tick in 1..=8 {
            if !registry.due_systems(1.0).is_empty() {
                fired.push(tick);
            }
        }
        assert_eq!(fired, vec![3, 5, 8]);
    }

    #[test]
    fn test_long_frame_fires_once() {
        let mut registry = SystemRegistry::new();
        registry.register_timed(Counting, 1.0);

        // One 5-second frame: a single catch-up invocation, and the
        // deadline lands past the frame rather than queueing a burst.
        assert_eq!(registry.due_systems(5.0).len(), 1);
        assert!(registry.due_systems(0.1).is_empty());
        assert_eq!(registry.due_systems(1.0).len(), 1);
    }

    #[test]
    fn test_reregister_replaces() {
        static DROPS: AtomicU32 = AtomicU32::new(0);
        struct Dropper;
        impl Drop for Dropper {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }
        impl System for Dropper {
            fn queries(&self) -> Vec<ComponentTag> {
                Vec::new()
            }
            fn tick(&self, _dt: f32, _entity: &Arc<Entity>, _component: &ComponentHandle) {}
        }

        let mut registry = SystemRegistry::new();
        registry.register(Dropper);
        registry.register(Dropper);
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        assert_eq!(registry.due_systems(1.0).len(), 1);

        registry.unregister(SystemTag::of::<Other>());
        assert_eq!(registry.due_systems(1.0).len(), 1);
        registry.unregister(SystemTag::of::<Dropper>());
        assert!(registry.due_systems(1.0).is_empty());
    }
}
