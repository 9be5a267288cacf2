//! Diagnostics snapshot: a serializable view of a [`World`](crate::ecs::World).
//!
//! Enabled by the `diagnostics` feature flag. [`World::snapshot`] captures
//! entity pool statistics, dirty pool sizes, every system's filters and
//! membership counts, and the per-system timings of the last `update()`. The
//! snapshot serializes to JSON for external tooling.
//!
//! ```ignore
//! let json = world.snapshot().to_json_pretty()?;
//! log::debug!("{json}");
//! ```
//!
//! [`World::snapshot`]: crate::ecs::World::snapshot

use serde::Serialize;

use crate::ecs::SystemTiming;

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub label: String,
    pub tick: u64,
    pub entity_count: usize,
    pub entity_pool: EntityPoolSnapshot,
    /// Entities waiting for their additions to be committed.
    pub dirty_additions: usize,
    /// Entities waiting for their removals to be applied.
    pub dirty_removals: usize,
    pub systems: Vec<SystemSnapshot>,
    pub entities: Vec<EntitySnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timings: Vec<SystemTiming>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityPoolSnapshot {
    pub total_slots: usize,
    pub free_count: usize,
    pub alive_count: usize,
    /// Destroyed entities whose exits have not been flushed yet.
    pub lingering_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub sort_key: i32,
    pub name: String,
    pub filters: Vec<FilterSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterSnapshot {
    pub name: String,
    /// The filter tree, e.g. `(Position & (Sprite | Mesh))`.
    pub filter: String,
    pub members: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub generation: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short names of the committed component types, sorted.
    pub components: Vec<String>,
    pub pending_additions: usize,
    pub pending_removals: usize,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
