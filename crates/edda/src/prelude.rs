//! Convenience re-exports — `use edda::prelude::*` for the common items.

pub use crate::config::WorldConfig;
pub use crate::ecs::{
    Bundle, Component, ComponentType, Entity, EntityMut, EntityRef, Filter, FilterItem, FilterOp,
    Members, System, TypeSet, World, and_filter, component, or_filter,
};
pub use crate::error::{EcsError, Result};
#[cfg(feature = "diagnostics")]
pub use crate::diag::WorldSnapshot;
