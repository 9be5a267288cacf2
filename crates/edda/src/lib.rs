//! # Edda — Reactive ECS Kernel
//!
//! A small entity component system where systems react to *membership*:
//! each system declares named filters over component types and is told when
//! an entity starts or stops matching one. Mutations are deferred and applied
//! in batches, so every hook sees a consistent world.
//!
//! Start with `use edda::prelude::*`, create a [`World`](ecs::World), register
//! systems and call `update()` once per tick.

pub mod config;
pub mod ecs;
pub mod error;
pub mod prelude;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use error::{EcsError, Result};
