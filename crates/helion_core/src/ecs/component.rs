//! # Component Machinery
//!
//! A component is a unit of entity state. It is conceptually owned by
//! exactly one entity but physically held through a shared, reference
//! counted slot so that the entity's local store and the world's aggregate
//! store reference the same instance without duplication.
//!
//! Ownership is tracked as a generation-checked [`EntityId`] stamped on the
//! slot, not a weak back-pointer: resolving the owner is an O(1) arena
//! lookup that fails cleanly when the owning entity has been destroyed.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ecs::entity::EntityId;
use crate::ecs::tag::ComponentTag;

/// Marker trait for ECS components.
///
/// A component may declare *alternate* tags — capability markers it is
/// additionally indexed under in every store that holds it. This is the
/// polymorphic-query mechanism: declared once per type, resolved at
/// insertion time, never via runtime inheritance walks.
///
/// # Example
///
/// ```rust,ignore
/// struct RigidBody { mass: f32 }
///
/// impl Component for RigidBody {
///     fn alternate_tags() -> Vec<ComponentTag> {
///         vec![ComponentTag::of::<PhysicsBody>()]
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Capability tags this component type is additionally indexed under.
    #[must_use]
    fn alternate_tags() -> Vec<ComponentTag>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Shared storage cell for a single component instance.
///
/// The payload sits behind a `RwLock` so systems can mutate it from worker
/// tasks; two systems mutating the same component in the same tick must be
/// related by an ordering constraint, the lock only keeps that mistake
/// memory-safe.
pub struct ComponentSlot<T: Component> {
    /// Owning entity id bits; `EntityId::NULL` while detached.
    owner: AtomicU64,
    data: RwLock<T>,
}

impl<T: Component> ComponentSlot<T> {
    fn new(value: T) -> Self {
        Self {
            owner: AtomicU64::new(EntityId::NULL.to_bits()),
            data: RwLock::new(value),
        }
    }

    /// Read access to the component payload.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.data.read()
    }

    /// Write access to the component payload.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.data.write()
    }

    /// The id of the owning entity, `EntityId::NULL` if detached.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> EntityId {
        EntityId::from_bits(self.owner.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_owner(&self, id: EntityId) {
        self.owner.store(id.to_bits(), Ordering::Release);
    }
}

/// Shared handle to a typed component slot.
pub type ComponentRef<T> = Arc<ComponentSlot<T>>;

/// Object-safe view of a component slot, for type-erased storage.
pub(crate) trait AnySlot: Send + Sync {
    fn owner(&self) -> EntityId;
    fn set_owner(&self, id: EntityId);
    fn alternate_tags(&self) -> Vec<ComponentTag>;
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Component> AnySlot for ComponentSlot<T> {
    fn owner(&self) -> EntityId {
        ComponentSlot::owner(self)
    }

    fn set_owner(&self, id: EntityId) {
        ComponentSlot::set_owner(self, id);
    }

    fn alternate_tags(&self) -> Vec<ComponentTag> {
        T::alternate_tags()
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Type-erased, reference-counted component handle.
///
/// Equality and hashing use slot identity, so the same component instance
/// hashes identically in every store that indexes it.
#[derive(Clone)]
pub struct ComponentHandle {
    tag: ComponentTag,
    slot: Arc<dyn AnySlot>,
}

impl ComponentHandle {
    /// Wraps a typed component reference.
    #[must_use]
    pub fn of<T: Component>(component: &ComponentRef<T>) -> Self {
        Self {
            tag: ComponentTag::of::<T>(),
            slot: Arc::clone(component) as Arc<dyn AnySlot>,
        }
    }

    /// Creates a fresh slot for a component value, returning both views.
    pub(crate) fn from_value<T: Component>(value: T) -> (Self, ComponentRef<T>) {
        let component = Arc::new(ComponentSlot::new(value));
        (Self::of(&component), component)
    }

    /// The primary type tag this component is indexed under.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> ComponentTag {
        self.tag
    }

    /// The id of the owning entity, `EntityId::NULL` if detached.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.slot.owner()
    }

    #[inline]
    pub(crate) fn set_owner(&self, id: EntityId) {
        self.slot.set_owner(id);
    }

    /// The capability tags declared by the component's type.
    #[must_use]
    pub fn alternate_tags(&self) -> Vec<ComponentTag> {
        self.slot.alternate_tags()
    }

    /// Whether the component's type declared the given capability tag.
    #[must_use]
    pub fn has_capability(&self, tag: ComponentTag) -> bool {
        self.slot.alternate_tags().contains(&tag)
    }

    /// Whether the concrete component type is `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.tag == ComponentTag::of::<T>()
    }

    /// Recovers the typed reference if the concrete type is `T`.
    #[must_use]
    pub fn downcast<T: Component>(&self) -> Option<ComponentRef<T>> {
        Arc::clone(&self.slot)
            .as_any_arc()
            .downcast::<ComponentSlot<T>>()
            .ok()
    }

    fn slot_addr(&self) -> usize {
        Arc::as_ptr(&self.slot) as *const () as usize
    }
}

impl PartialEq for ComponentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.slot_addr() == other.slot_addr()
    }
}

impl Eq for ComponentHandle {}

impl Hash for ComponentHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot_addr().hash(state);
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("tag", &self.tag)
            .field("owner", &self.owner())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(u32);
    impl Component for Health {}

    struct Mana(u32);
    impl Component for Mana {}

    #[test]
    fn test_handle_identity() {
        let (a, a_ref) = ComponentHandle::from_value(Health(10));
        let b = ComponentHandle::of(&a_ref);
        let (c, _c_ref) = ComponentHandle::from_value(Health(10));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_handle_downcast() {
        let (handle, _r) = ComponentHandle::from_value(Health(42));

        assert!(handle.is::<Health>());
        assert!(!handle.is::<Mana>());

        let typed = handle.downcast::<Health>().unwrap();
        assert_eq!(typed.read().0, 42);
        assert!(handle.downcast::<Mana>().is_none());
    }

    #[test]
    fn test_owner_stamp() {
        let (handle, r) = ComponentHandle::from_value(Health(1));
        assert!(handle.owner().is_null());

        let id = EntityId::new(3, 7);
        handle.set_owner(id);
        assert_eq!(r.owner(), id);
    }
}
