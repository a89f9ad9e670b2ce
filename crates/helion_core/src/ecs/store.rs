//! # Component Store
//!
//! Polymorphic container mapping component type tags to the live set of
//! component instances of that type, plus a secondary capability index for
//! polymorphic queries.
//!
//! Locking policy: structural mutation (insert/erase) takes the store lock;
//! snapshot queries take it only for the duration of the copy. Queries
//! return snapshots, never live views, so worker tasks can iterate a result
//! while other threads stage structural changes through the world's
//! deferred queues.

use std::collections::{HashMap, HashSet};

use parking_lot::lock_api::{Mutex, RawMutex};

use crate::ecs::component::{Component, ComponentHandle, ComponentRef};
use crate::ecs::error::EcsError;
use crate::ecs::lock::{RawNullLock, RawSpinLock};
use crate::ecs::tag::ComponentTag;

#[derive(Default)]
struct StoreMaps {
    /// Component type tag -> live instances of exactly that type.
    primary: HashMap<ComponentTag, HashSet<ComponentHandle>>,
    /// Capability tag -> instances whose type declared that capability.
    alternate: HashMap<ComponentTag, HashSet<ComponentHandle>>,
}

impl StoreMaps {
    fn insert(&mut self, handle: &ComponentHandle, alternates: &[ComponentTag]) {
        self.primary
            .entry(handle.tag())
            .or_default()
            .insert(handle.clone());
        for &alt in alternates {
            self.alternate.entry(alt).or_default().insert(handle.clone());
        }
    }

    fn remove(&mut self, handle: &ComponentHandle, alternates: &[ComponentTag]) {
        if let Some(set) = self.primary.get_mut(&handle.tag()) {
            set.remove(handle);
            if set.is_empty() {
                self.primary.remove(&handle.tag());
            }
        }
        for alt in alternates {
            if let Some(set) = self.alternate.get_mut(alt) {
                set.remove(handle);
                if set.is_empty() {
                    self.alternate.remove(alt);
                }
            }
        }
    }
}

/// A thread-synchronizable component container, generic over its lock
/// strategy. See [`LocalStore`] and [`SharedStore`] for the two roles.
pub struct ComponentStore<R: RawMutex> {
    maps: Mutex<R, StoreMaps>,
}

/// Entity-local store. Spin-locked: scripts may attach components from
/// worker threads mid-tick, so even per-entity stores see concurrency.
pub type LocalStore = ComponentStore<RawSpinLock>;

/// Single-threaded staging store, for assembling component sets under
/// external exclusion before handing them to a world.
pub type StagingStore = ComponentStore<RawNullLock>;

/// World-level aggregate store: snapshotted concurrently by worker tasks.
pub type SharedStore = ComponentStore<RawSpinLock>;

impl<R: RawMutex> ComponentStore<R> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            maps: Mutex::new(StoreMaps::default()),
        }
    }

    /// Inserts a new component value, returning a shared reference to it.
    ///
    /// The component is indexed under its own tag and under every declared
    /// alternate tag.
    pub fn add_component<T: Component>(&self, value: T) -> ComponentRef<T> {
        let (handle, component) = ComponentHandle::from_value(value);
        self.insert_handle(&handle);
        component
    }

    /// Inserts an existing component reference.
    pub fn insert_ref<T: Component>(&self, component: &ComponentRef<T>) {
        self.insert_handle(&ComponentHandle::of(component));
    }

    /// Inserts a type-erased handle under its primary and alternate tags.
    pub fn insert_handle(&self, handle: &ComponentHandle) {
        let alternates = handle.alternate_tags();
        self.maps.lock().insert(handle, &alternates);
    }

    /// Removes a component reference, symmetrically to insertion.
    pub fn remove_ref<T: Component>(&self, component: &ComponentRef<T>) {
        self.remove_handle(&ComponentHandle::of(component));
    }

    /// Removes a type-erased handle from the primary and alternate indices.
    pub fn remove_handle(&self, handle: &ComponentHandle) {
        let alternates = handle.alternate_tags();
        self.maps.lock().remove(handle, &alternates);
    }

    /// Returns the first component of type `T`.
    ///
    /// Checks the primary index, then the capability index, and fails with
    /// [`EcsError::NotFound`] if neither holds a match — callers must check
    /// existence first or handle the error; there is no silent default.
    ///
    /// When multiple instances exist, which one is returned is unspecified.
    pub fn get_component<T: Component>(&self) -> Result<ComponentRef<T>, EcsError> {
        let tag = ComponentTag::of::<T>();
        let maps = self.maps.lock();
        if let Some(set) = maps.primary.get(&tag) {
            if let Some(component) = set.iter().find_map(ComponentHandle::downcast::<T>) {
                return Ok(component);
            }
        }
        if let Some(set) = maps.alternate.get(&tag) {
            if let Some(component) = set.iter().find_map(ComponentHandle::downcast::<T>) {
                return Ok(component);
            }
        }
        Err(EcsError::NotFound { tag })
    }

    /// Returns the first handle indexed under `tag`, checking the primary
    /// index before the capability index.
    pub fn get_by_capability(&self, tag: ComponentTag) -> Result<ComponentHandle, EcsError> {
        let maps = self.maps.lock();
        maps.primary
            .get(&tag)
            .and_then(|set| set.iter().next())
            .or_else(|| maps.alternate.get(&tag).and_then(|set| set.iter().next()))
            .cloned()
            .ok_or(EcsError::NotFound { tag })
    }

    /// Whether any component is indexed under `T`'s tag (either index).
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        let tag = ComponentTag::of::<T>();
        let maps = self.maps.lock();
        maps.primary.contains_key(&tag) || maps.alternate.contains_key(&tag)
    }

    /// Snapshot of all components of exactly type `T`.
    #[must_use]
    pub fn components_of<T: Component>(&self) -> Vec<ComponentRef<T>> {
        self.snapshot(ComponentTag::of::<T>())
            .iter()
            .filter_map(ComponentHandle::downcast::<T>)
            .collect()
    }

    /// Snapshot of the primary index for `tag`.
    ///
    /// The returned vector is a copy of the live set at call time — it stays
    /// stable for the caller regardless of later structural changes.
    #[must_use]
    pub fn snapshot(&self, tag: ComponentTag) -> Vec<ComponentHandle> {
        let maps = self.maps.lock();
        maps.primary
            .get(&tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of everything indexed under `tag`, primary and capability
    /// indices combined (deduplicated).
    #[must_use]
    pub fn snapshot_capability(&self, tag: ComponentTag) -> Vec<ComponentHandle> {
        let maps = self.maps.lock();
        let mut seen: HashSet<ComponentHandle> = HashSet::new();
        if let Some(set) = maps.primary.get(&tag) {
            seen.extend(set.iter().cloned());
        }
        if let Some(set) = maps.alternate.get(&tag) {
            seen.extend(set.iter().cloned());
        }
        seen.into_iter().collect()
    }

    /// Snapshot of every handle in the primary index.
    #[must_use]
    pub fn handles(&self) -> Vec<ComponentHandle> {
        let maps = self.maps.lock();
        maps.primary
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Bulk-adds all of another store's contents into this one, preserving
    /// capability-index consistency. Used when an entity joins a world.
    pub fn merge<R2: RawMutex>(&self, other: &ComponentStore<R2>) {
        // Two-phase to avoid holding both locks at once.
        let handles = other.handles();
        let mut maps = self.maps.lock();
        for handle in &handles {
            let alternates = handle.alternate_tags();
            maps.insert(handle, &alternates);
        }
    }

    /// Bulk-removes another store's contents from this one. Reverse of
    /// [`merge`](Self::merge); used when an entity leaves a world.
    pub fn unmerge<R2: RawMutex>(&self, other: &ComponentStore<R2>) {
        let handles = other.handles();
        let mut maps = self.maps.lock();
        for handle in &handles {
            let alternates = handle.alternate_tags();
            maps.remove(handle, &alternates);
        }
    }

    /// Number of live components of exactly the tagged type.
    #[must_use]
    pub fn count(&self, tag: ComponentTag) -> usize {
        self.maps.lock().primary.get(&tag).map_or(0, HashSet::len)
    }

    /// Whether the store holds no components at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.lock().primary.is_empty()
    }

    /// Removes all components from this store.
    pub fn clear(&self) {
        let mut maps = self.maps.lock();
        maps.primary.clear();
        maps.alternate.clear();
    }
}

impl<R: RawMutex> Default for ComponentStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
