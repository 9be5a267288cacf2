//! # System — Logic Driven by Filter Membership
//!
//! A system declares one or more named [`Filter`]s. The world keeps, for each
//! of them, the set of entities that currently match, and tells the system
//! whenever an entity joins or leaves:
//!
//! ```text
//!            flush establishes match             flush drops match
//!   absent ─────────────────────────► present ─────────────────────► absent
//!                 on_enter(filter, e)                on_exit(filter, e)
//!                                                    (data still readable)
//! ```
//!
//! Once per tick the world calls [`System::update`] with a [`Members`]
//! snapshot of every set.
//!
//! ## Hooks Receive the World
//!
//! Every callback gets `&mut World`. Systems may add and remove components,
//! create and destroy entities, and even register or remove other systems from
//! inside any callback. Those changes are deferred and applied by the
//! surrounding flush, so the snapshot a system is iterating over never changes
//! under it.
//!
//! While its callback runs, the system is taken out of the registry and put
//! back afterwards. This is what lets the world hand out `&mut World` and
//! `&mut self` at the same time without `unsafe`.
//!
//! ## Execution Order
//!
//! Systems are registered with an explicit `i32` sort key and run in ascending
//! key order. Two systems can never share a key.

use std::collections::BTreeSet;

use super::component::TypeSet;
use super::entity::Entity;
use super::filter::Filter;
use super::world::World;

/// A logic unit driven by filter membership.
///
/// ```ignore
/// struct Count;
///
/// impl System for Count {
///     fn filters(&self) -> Vec<(&'static str, Filter)> {
///         vec![("counts", Filter::of::<Counter>())]
///     }
///
///     fn update(&mut self, world: &mut World, members: &Members) {
///         for &entity in members.get("counts") {
///             if let Ok(counter) = world.get_mut::<Counter>(entity) {
///                 counter.value += 1;
///             }
///         }
///     }
/// }
/// ```
pub trait System: 'static {
    /// Named filters, read once when the system is registered.
    fn filters(&self) -> Vec<(&'static str, Filter)>;

    /// Called once per tick, after a flush, with the current membership.
    fn update(&mut self, _world: &mut World, _members: &Members) {}

    /// An entity started matching `filter`. Its components are committed.
    fn on_enter(&mut self, _world: &mut World, _filter: &str, _entity: Entity) {}

    /// An entity stopped matching `filter`, or the system is being removed.
    /// Components that are about to be deleted can still be read.
    fn on_exit(&mut self, _world: &mut World, _filter: &str, _entity: Entity) {}

    /// Name used in logs, errors and diagnostics.
    fn name(&self) -> String {
        short_system_name(std::any::type_name::<Self>())
    }
}

/// Snapshot of a system's membership sets, handed to [`System::update`].
///
/// Entities are listed in handle order.
#[derive(Debug, Clone, Default)]
pub struct Members {
    sets: Vec<(&'static str, Vec<Entity>)>,
}

impl Members {
    /// Entities matching `filter`. Unknown names yield an empty slice.
    pub fn get(&self, filter: &str) -> &[Entity] {
        self.sets
            .iter()
            .find(|(name, _)| *name == filter)
            .map(|(_, entities)| entities.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[Entity])> {
        self.sets
            .iter()
            .map(|(name, entities)| (*name, entities.as_slice()))
    }

    /// `true` if no filter has any member.
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(|(_, entities)| entities.is_empty())
    }
}

// ── Registry entry ───────────────────────────────────────────────────────

pub(crate) struct FilterSlot {
    pub(crate) name: &'static str,
    pub(crate) filter: Filter,
    pub(crate) members: BTreeSet<Entity>,
}

/// A registered system plus the membership the world maintains for it.
pub(crate) struct SystemEntry {
    /// Unique per registration. Distinguishes a re-registered system from the
    /// one it replaced at the same sort key.
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) filters: Vec<FilterSlot>,
    /// `None` while one of the system's callbacks is running.
    pub(crate) system: Option<Box<dyn System>>,
}

impl SystemEntry {
    pub(crate) fn new(id: u64, system: Box<dyn System>) -> Self {
        let name = system.name();
        let mut filters: Vec<FilterSlot> = Vec::new();
        for (filter_name, filter) in system.filters() {
            if filters.iter().any(|slot| slot.name == filter_name) {
                log::warn!("system `{name}` declares filter `{filter_name}` twice; keeping the first");
                continue;
            }
            filters.push(FilterSlot {
                name: filter_name,
                filter,
                members: BTreeSet::new(),
            });
        }
        Self {
            id,
            name,
            filters,
            system: Some(system),
        }
    }

    /// Drop `entity` from the first filter that holds it but no longer matches
    /// `remaining`, returning that filter's name. A destroyed entity leaves
    /// every filter.
    pub(crate) fn take_exit(
        &mut self,
        entity: Entity,
        remaining: &TypeSet,
        destroyed: bool,
    ) -> Option<&'static str> {
        let slot = self.filters.iter_mut().find(|slot| {
            slot.members.contains(&entity) && (destroyed || !slot.filter.matches(remaining))
        })?;
        slot.members.remove(&entity);
        Some(slot.name)
    }

    /// Add `entity` to the first filter that matches `committed` but does not
    /// hold it yet, returning that filter's name.
    pub(crate) fn take_enter(&mut self, entity: Entity, committed: &TypeSet) -> Option<&'static str> {
        let slot = self
            .filters
            .iter_mut()
            .find(|slot| !slot.members.contains(&entity) && slot.filter.matches(committed))?;
        slot.members.insert(entity);
        Some(slot.name)
    }

    /// Empty every membership set, returning `(filter, entity)` pairs in
    /// declaration order.
    pub(crate) fn drain_members(&mut self) -> Vec<(&'static str, Entity)> {
        let mut out = Vec::new();
        for slot in &mut self.filters {
            let members = std::mem::take(&mut slot.members);
            out.extend(members.into_iter().map(|entity| (slot.name, entity)));
        }
        out
    }

    pub(crate) fn members(&self, filter: &str) -> Option<&BTreeSet<Entity>> {
        self.filters
            .iter()
            .find(|slot| slot.name == filter)
            .map(|slot| &slot.members)
    }

    pub(crate) fn snapshot(&self) -> Members {
        Members {
            sets: self
                .filters
                .iter()
                .map(|slot| (slot.name, slot.members.iter().copied().collect()))
                .collect(),
        }
    }
}

/// Per-system timing recorded during the most recent `update()`.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last segment (e.g. `my_game::systems::Movement` → `Movement`).
pub(crate) fn short_system_name(full: &str) -> String {
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map_or(0, |i| i + 2);
    full[start..].to_string()
}

#[cfg(test)]
mod tests {
    use std::any::TypeId;

    use super::*;
    use crate::ecs::filter::{component, or_filter};

    struct Position;
    struct Sprite;
    struct Mesh;

    struct Render;

    impl System for Render {
        fn filters(&self) -> Vec<(&'static str, Filter)> {
            vec![
                ("sprites", Filter::of::<Sprite>()),
                (
                    "drawable",
                    or_filter([component::<Sprite>(), component::<Mesh>()]),
                ),
                ("sprites", Filter::of::<Position>()),
            ]
        }
    }

    fn entity(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    fn set(types: &[TypeId]) -> TypeSet {
        types.iter().copied().collect()
    }

    #[test]
    fn default_name_is_short_type_name() {
        assert_eq!(Render.name(), "Render");
        assert_eq!(short_system_name("game::systems::Movement"), "Movement");
        assert_eq!(short_system_name("game::Wrap<game::Inner>"), "Wrap<game::Inner>");
    }

    #[test]
    fn duplicate_filter_names_keep_first() {
        let entry = SystemEntry::new(1, Box::new(Render));
        let names: Vec<_> = entry.filters.iter().map(|slot| slot.name).collect();
        assert_eq!(names, vec!["sprites", "drawable"]);
    }

    #[test]
    fn enter_then_exit_once_per_filter() {
        let mut entry = SystemEntry::new(1, Box::new(Render));
        let e = entity(0);
        let sprite = set(&[TypeId::of::<Sprite>()]);

        assert_eq!(entry.take_enter(e, &sprite), Some("sprites"));
        assert_eq!(entry.take_enter(e, &sprite), Some("drawable"));
        assert_eq!(entry.take_enter(e, &sprite), None);

        // Swapping Sprite for Mesh only drops the sprite-only filter.
        let mesh = set(&[TypeId::of::<Mesh>()]);
        assert_eq!(entry.take_exit(e, &mesh, false), Some("sprites"));
        assert_eq!(entry.take_exit(e, &mesh, false), None);
        assert_eq!(entry.members("drawable").unwrap().len(), 1);

        // Destruction drops everything regardless of filter shape.
        assert_eq!(entry.take_exit(e, &mesh, true), Some("drawable"));
        assert_eq!(entry.take_exit(e, &mesh, true), None);
    }

    #[test]
    fn snapshot_and_drain() {
        let mut entry = SystemEntry::new(1, Box::new(Render));
        let sprite = set(&[TypeId::of::<Sprite>()]);
        for index in [2, 0, 1] {
            while entry.take_enter(entity(index), &sprite).is_some() {}
        }

        let members = entry.snapshot();
        assert_eq!(members.get("sprites"), &[entity(0), entity(1), entity(2)]);
        assert!(members.get("unknown").is_empty());
        assert!(!members.is_empty());

        let drained = entry.drain_members();
        assert_eq!(drained.len(), 6);
        assert_eq!(drained[0], ("sprites", entity(0)));
        assert_eq!(drained[3], ("drawable", entity(0)));
        assert!(entry.snapshot().is_empty());
    }

    #[test]
    fn absent_types_never_enter() {
        let mut entry = SystemEntry::new(1, Box::new(Render));
        assert_eq!(entry.take_enter(entity(0), &set(&[TypeId::of::<Position>()])), None);
    }
}
