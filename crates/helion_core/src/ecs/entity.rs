//! # Entities
//!
//! An entity is a named bag of components plus a weak link back to the world
//! that owns it. Entity handles are reference-counted; the world's arena
//! hands out generation-checked [`EntityId`]s so stale ids never resolve to
//! a recycled slot.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::ecs::component::{Component, ComponentHandle, ComponentRef};
use crate::ecs::error::EcsError;
use crate::ecs::store::LocalStore;
use crate::ecs::tag::SystemTag;
use crate::ecs::transform::Transform;
use crate::ecs::world::{World, WorldCommand};

const GENERATION_SHIFT: u32 = 32;
const INDEX_MASK: u64 = u32::MAX as u64;

/// Stable identifier for an entity slot in a world's arena.
///
/// Packs a 32-bit slot index and a 32-bit generation into one `u64`. A
/// lookup succeeds only while the generation matches the slot's current
/// generation, so ids held across a destroy are detected as stale rather
/// than resolving to whatever entity reused the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Sentinel for "not spawned into any world".
    pub const NULL: Self = Self(u64::MAX);

    #[inline]
    #[must_use]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self(u64::from(generation) << GENERATION_SHIFT | u64::from(index))
    }

    /// Slot index within the arena.
    #[inline]
    #[must_use]
    pub fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    /// Reuse counter of the slot at the time this id was issued.
    #[inline]
    #[must_use]
    pub fn generation(self) -> u32 {
        (self.0 >> GENERATION_SHIFT) as u32
    }

    /// Raw packed representation, for serialization and atomics.
    #[inline]
    #[must_use]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds an id from [`to_bits`](Self::to_bits) output.
    #[inline]
    #[must_use]
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Whether this is the "not spawned" sentinel.
    #[inline]
    #[must_use]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "EntityId(null)")
        } else {
            write!(f, "EntityId({}v{})", self.index(), self.generation())
        }
    }
}

/// A simulated object: a local component store, an id once spawned, and a
/// weak pointer to the owning world.
///
/// Entities are constructed free-standing, populated with components, and
/// then handed to [`World::spawn`]. Component attachment before spawn is
/// immediate; after spawn it is additionally staged into the world's
/// deferred queue so the shared store and lifecycle hooks catch up at the
/// next inter-tick drain.
pub struct Entity {
    id: AtomicU64,
    components: LocalStore,
    transform: ComponentRef<Transform>,
    world: RwLock<Weak<World>>,
    /// Ordered opt-in list of systems this entity declares an interest in.
    /// Carried for tooling; scheduling matches on component queries.
    systems_order: RwLock<Vec<SystemTag>>,
}

impl Entity {
    /// Creates a free-standing entity not yet in any world.
    ///
    /// Every entity carries a [`Transform`] from birth; spatial systems and
    /// render collection rely on its presence.
    #[must_use]
    pub fn new() -> Arc<Self> {
        let components = LocalStore::new();
        let transform = components.add_component(Transform::IDENTITY);
        Arc::new(Self {
            id: AtomicU64::new(EntityId::NULL.to_bits()),
            components,
            transform,
            world: RwLock::new(Weak::new()),
            systems_order: RwLock::new(Vec::new()),
        })
    }

    /// The id assigned at spawn time, or [`EntityId::NULL`] before that.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        EntityId::from_bits(self.id.load(Ordering::Acquire))
    }

    pub(crate) fn set_id(&self, id: EntityId) {
        self.id.store(id.to_bits(), Ordering::Release);
    }

    /// The world this entity currently lives in, if any.
    #[must_use]
    pub fn world(&self) -> Option<Arc<World>> {
        self.world.read().upgrade()
    }

    /// Whether the entity has been spawned and not yet destroyed.
    #[must_use]
    pub fn is_in_world(&self) -> bool {
        self.world().is_some()
    }

    pub(crate) fn set_world(&self, world: &Weak<World>) {
        *self.world.write() = world.clone();
    }

    pub(crate) fn clear_world(&self) {
        *self.world.write() = Weak::new();
        self.set_id(EntityId::NULL);
    }

    /// The entity's private component store.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &LocalStore {
        &self.components
    }

    /// Attaches a component, returning a shared reference to it.
    ///
    /// The component joins the local store immediately. If the entity is in
    /// a world, the handle is also staged so the world's aggregate store and
    /// attach hooks pick it up between ticks — never mid-tick.
    pub fn attach<T: Component>(&self, value: T) -> ComponentRef<T> {
        let component = self.components.add_component(value);
        let handle = ComponentHandle::of(&component);
        handle.set_owner(self.id());
        if let Some(world) = self.world() {
            world.enqueue(WorldCommand::Attach(handle));
        }
        component
    }

    /// Detaches a component, symmetrically to [`attach`](Self::attach).
    pub fn detach<T: Component>(&self, component: &ComponentRef<T>) {
        self.components.remove_ref(component);
        if let Some(world) = self.world() {
            world.enqueue(WorldCommand::Detach(ComponentHandle::of(component)));
        }
    }

    /// Looks up a component of type `T` on this entity.
    pub fn get_component<T: Component>(&self) -> Result<ComponentRef<T>, EcsError> {
        self.components.get_component::<T>()
    }

    /// Whether this entity carries a component of type `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.components.has_component::<T>()
    }

    /// The entity's spatial transform, present from construction.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> &ComponentRef<Transform> {
        &self.transform
    }

    /// Declares an interest in system `S`, appended to the opt-in order.
    pub fn opt_in_system<S: 'static>(&self) {
        let tag = SystemTag::of::<S>();
        let mut order = self.systems_order.write();
        if !order.contains(&tag) {
            order.push(tag);
        }
    }

    /// Withdraws a prior [`opt_in_system`](Self::opt_in_system).
    pub fn opt_out_system<S: 'static>(&self) {
        self.systems_order.write().retain(|t| *t != SystemTag::of::<S>());
    }

    /// The declared system interests, in opt-in order.
    #[must_use]
    pub fn systems_order(&self) -> Vec<SystemTag> {
        self.systems_order.read().clone()
    }

    /// Removes this entity from its world. Structural removal happens at
    /// the next inter-tick drain; the entity handle itself stays usable as
    /// a free-standing component bag.
    ///
    /// # Errors
    /// [`EcsError::WorldGone`] if the entity is not in a world.
    pub fn destroy(&self) -> Result<(), EcsError> {
        let world = self.world().ok_or(EcsError::WorldGone)?;
        world.enqueue(WorldCommand::Destroy(self.id()));
        Ok(())
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity").field("id", &self.id()).finish()
    }
}

/// Parent-side link to a subtree entity. Spawning or destroying the parent
/// recursively spawns or destroys every linked child.
pub struct ChildEntity {
    child: Arc<Entity>,
}

impl ChildEntity {
    #[must_use]
    pub fn new(child: Arc<Entity>) -> Self {
        Self { child }
    }

    #[must_use]
    pub fn entity(&self) -> &Arc<Entity> {
        &self.child
    }
}

impl Component for ChildEntity {}

/// Generation-checked slot arena mapping [`EntityId`]s to live entities.
///
/// Slots are recycled through a free list; each recycle bumps the slot's
/// generation so ids issued before the recycle go stale instead of aliasing
/// the new occupant.
pub(crate) struct EntityArena {
    slots: Vec<ArenaSlot>,
    free: Vec<u32>,
}

struct ArenaSlot {
    generation: u32,
    entity: Option<Arc<Entity>>,
}

impl EntityArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Stores an entity and issues its id.
    pub(crate) fn insert(&mut self, entity: Arc<Entity>) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            EntityId::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).expect("entity arena exhausted");
            self.slots.push(ArenaSlot {
                generation: 0,
                entity: Some(entity),
            });
            EntityId::new(index, 0)
        }
    }

    /// Removes the entity behind `id`, if the id is still current.
    ///
    /// Stale ids (wrong generation, already-freed slot) return `None`; a
    /// double destroy is a no-op, not a panic.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Arc<Entity>> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(entity)
    }

    /// Resolves an id to its entity, if still current.
    pub(crate) fn get(&self, id: EntityId) -> Option<Arc<Entity>> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.clone()
    }

    /// Number of live entities.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(u32);
    impl Component for Health {}

    #[test]
    fn test_id_packing() {
        let id = EntityId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
        assert!(!id.is_null());
        assert!(EntityId::NULL.is_null());
    }

    #[test]
    fn test_freestanding_entity_components() {
        let entity = Entity::new();
        assert!(!entity.is_in_world());
        assert_eq!(entity.id(), EntityId::NULL);
        assert!(entity.has_component::<Transform>());
        assert!(entity.destroy().is_err());

        let health = entity.attach(Health(100));
        assert!(entity.has_component::<Health>());
        health.write().0 = 50;
        assert_eq!(entity.get_component::<Health>().unwrap().read().0, 50);

        entity.detach(&health);
        assert!(!entity.has_component::<Health>());
    }

    #[test]
    fn test_systems_order_round_trip() {
        struct Movement;
        struct Targeting;

        let entity = Entity::new();
        entity.opt_in_system::<Movement>();
        entity.opt_in_system::<Targeting>();
        entity.opt_in_system::<Movement>();

        let order = entity.systems_order();
        assert_eq!(order, vec![SystemTag::of::<Movement>(), SystemTag::of::<Targeting>()]);

        entity.opt_out_system::<Movement>();
        assert_eq!(entity.systems_order(), vec![SystemTag::of::<Targeting>()]);
    }

    #[test]
    fn test_arena_generation_check() {
        let mut arena = EntityArena::with_capacity(0);
        let first = Entity::new();
        let id = arena.insert(first.clone());
        assert_eq!(arena.len(), 1);
        assert!(arena.get(id).is_some());

        let removed = arena.remove(id).unwrap();
        assert!(Arc::ptr_eq(&removed, &first));
        assert!(arena.get(id).is_none());
        assert!(arena.remove(id).is_none());

        // Slot is recycled with a bumped generation; the old id stays stale.
        let second_id = arena.insert(Entity::new());
        assert_eq!(second_id.index(), id.index());
        assert_ne!(second_id.generation(), id.generation());
        assert!(arena.get(id).is_none());
        assert!(arena.get(second_id).is_some());
    }
}
