//! # Reactive Entity Component System
//!
//! Entities are bags of typed components. Systems declare [`Filter`]s over
//! component types and the world keeps, per filter, the set of entities that
//! currently match. Component additions and removals are deferred and applied
//! at flush points, where systems are told exactly once about every entity that
//! starts or stops matching.
//!
//! ## Module Overview
//!
//! - [`entity`] — Generational entity handles and per-entity bookkeeping
//! - [`component`] — Component identity, type-erased storage, bundles
//! - [`filter`] — AND/OR trees over component types
//! - [`system`] — System trait, membership snapshots
//! - [`world`] — Central container and the flush algorithm

pub mod component;
pub mod entity;
pub mod filter;
pub mod system;
pub mod world;

pub use component::{Bundle, Component, ComponentType, TypeSet};
pub use entity::{Entity, EntityMut, EntityRef};
pub use filter::{Filter, FilterItem, FilterOp, and_filter, component, or_filter};
#[cfg(feature = "diagnostics")]
pub use system::SystemTiming;
pub use system::{Members, System};
pub use world::World;
