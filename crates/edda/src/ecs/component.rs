//! # Component — Typed Data Owned by One Entity
//!
//! Components are plain data: a `Position`, a `Health`, a `Counter`. Any
//! `'static + Send + Sync` type is a component, and its Rust type *is* its
//! component type. There is no registration step.
//!
//! ## Storage
//!
//! Each entity keeps a small map from [`TypeId`] to a boxed value:
//!
//! ```text
//! committed:    { TypeId(Position) → Box<Position>, TypeId(Health) → Box<Health> }
//! pending_add:  { TypeId(Counter)  → Box<Counter> }
//! ```
//!
//! Values are stored as `Box<dyn Any + Send + Sync>` and recovered with
//! `downcast_ref`/`downcast_mut`. This keeps the whole crate free of `unsafe`
//! at the cost of one allocation per component.
//!
//! ## Type Identity
//!
//! Filters and errors talk about component *types*, not values. A
//! [`ComponentType`] pairs the [`TypeId`] with the type's name so that filters
//! can be printed and error messages can say which component was missing.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker trait for component values. Blanket-implemented for every
/// `'static + Send + Sync` type.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// A set of component types, used to evaluate filters against either an
/// entity's committed state or a hypothetical future state.
pub type TypeSet = HashSet<TypeId>;

/// The identity of a component type.
///
/// Equality and hashing use the [`TypeId`] only.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// The component type of `T`.
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(self) -> TypeId {
        self.id
    }

    /// Fully-qualified type name, e.g. `my_game::components::Position`.
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Type name without its module path, e.g. `Position`.
    pub fn short_name(self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.short_name())
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A single type-erased component value.
pub(crate) struct ComponentBox {
    value: Box<dyn Any + Send + Sync>,
    name: &'static str,
}

impl ComponentBox {
    pub(crate) fn new<T: Component>(value: T) -> Self {
        Self {
            value: Box::new(value),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully-qualified type name of the stored value.
    pub(crate) fn type_name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub(crate) fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut()
    }
}

/// Strip the module path from a type name, keeping generic arguments intact
/// (e.g. `game::Health` → `Health`, `alloc::vec::Vec<u8>` → `Vec<u8>`).
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

// ── Bundles ──────────────────────────────────────────────────────────────

/// A group of components attached to a new entity in one call.
///
/// Implemented for `()` and for tuples of up to 8 components. Each element must
/// have a distinct type; [`World::create_entity`](super::World::create_entity)
/// rejects a bundle that repeats a type.
pub trait Bundle {
    /// The component types in this bundle, in tuple order.
    fn component_types() -> Vec<ComponentType>;

    #[doc(hidden)]
    fn into_components(self, out: &mut HashMap<TypeId, ComponentBox>);
}

impl Bundle for () {
    fn component_types() -> Vec<ComponentType> {
        Vec::new()
    }

    fn into_components(self, _out: &mut HashMap<TypeId, ComponentBox>) {}
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            fn component_types() -> Vec<ComponentType> {
                vec![$(ComponentType::of::<$T>()),+]
            }

            #[allow(non_snake_case)]
            fn into_components(self, out: &mut HashMap<TypeId, ComponentBox>) {
                let ($($T,)+) = self;
                $(
                    out.insert(TypeId::of::<$T>(), ComponentBox::new($T));
                )+
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
