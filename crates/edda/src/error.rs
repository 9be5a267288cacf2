//! Error types for world, entity and system operations.
//!
//! Every error is raised synchronously by the call that misused the world.
//! A call that returns an error has not recorded anything: pools, pending sets
//! and the system registry are exactly as they were before the call.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors raised by the ECS kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The component type is already attached (and not being removed), or is
    /// already waiting to be added.
    ///
    /// When a bundle passed to `create_entity` repeats a type, no entity is
    /// created and `entity` is the handle the call would have returned.
    #[error("entity {entity} already has a `{component}` component")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    /// The component type is not committed on the entity. Types that are only
    /// waiting to be added do not count.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    /// The handle does not resolve to a registered entity. Either it was
    /// destroyed or it belongs to another world.
    #[error("no entity with uid {0}")]
    NoSuchUid(Entity),

    /// A system of this type is already registered.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// No system of this type is registered.
    #[error("system `{0}` is not registered")]
    MissingSystem(String),

    /// Another system already runs at this position in the schedule.
    #[error("sort key {sort_key} is already used by system `{existing}`")]
    DuplicateSortKey { sort_key: i32, existing: String },

    /// No resource of this type has been inserted.
    #[error("resource `{0}` not found")]
    MissingResource(&'static str),
}

/// Result type for ECS operations.
pub type Result<T> = std::result::Result<T, EcsError>;
