//! # Type Tags
//!
//! Stable identifiers for component and system types, used as map keys in
//! the component store and the system registry. Two tags are equal iff they
//! denote the same Rust type; tags are never reused and remain stable for
//! the lifetime of the process.

use std::any::{type_name, TypeId};
use std::fmt;

/// Identifies a component type (or a capability marker type).
///
/// Components are indexed under their own tag plus every tag returned by
/// [`Component::alternate_tags`](crate::ecs::Component::alternate_tags),
/// which is how polymorphic "all components with capability X" queries work
/// without any runtime downcast walk.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentTag {
    id: TypeId,
    name: &'static str,
}

impl ComponentTag {
    /// Returns the tag for a type.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The full type name, for diagnostics only.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ComponentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTag({})", self.name)
    }
}

/// Identifies a system type.
///
/// Ordering constraints between systems are expressed as `SystemTag`s rather
/// than references, so a constraint naming a system that is not scheduled
/// this tick is simply ignored for that tick.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemTag {
    id: TypeId,
    name: &'static str,
}

impl SystemTag {
    /// Returns the tag for a system type.
    #[must_use]
    pub fn of<S: 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// The full type name, for diagnostics only.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for SystemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemTag({})", self.name)
    }
}
