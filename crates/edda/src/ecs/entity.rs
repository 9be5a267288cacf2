//! # Entity — Identities and Their Pending Changes
//!
//! An [`Entity`] is just a handle. The [`World`] keeps the actual data in an
//! arena of slots, one [`EntityRecord`] per live entity.
//!
//! ## Generational Handles
//!
//! Entities refer to each other only through handles, never through ownership.
//! A handle can therefore outlive its target. To make that safe, each handle
//! pairs a slot index with a **generation**:
//!
//! ```text
//! Entity { index: 5, generation: 0 }  ← original
//! destroy + flush                      ← slot 5 freed, generation bumped to 1
//! Entity { index: 5, generation: 1 }  ← next entity to reuse the slot
//! ```
//!
//! A stale handle still says `generation: 0`, so lookups fail with
//! [`NoSuchUid`](crate::EcsError::NoSuchUid) instead of reaching the wrong entity.
//!
//! ## Committed vs. Pending
//!
//! Every record carries three component collections:
//!
//! ```text
//! committed       type → value   what readers and filters see
//! pending_add     type → value   added this tick, invisible until flush
//! pending_remove  {type}         removed this tick, still readable until flush
//! ```
//!
//! The world moves data between them only during a flush, which is what lets
//! systems see each change exactly once and never half-applied.
//!
//! ## Registered vs. Alive
//!
//! Destroying an entity unregisters it immediately: it can no longer be looked
//! up or mutated. The record itself stays in its slot until the next flush has
//! told every system that the entity left, so exit hooks can still read the
//! departing components. Only then is the slot freed.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::component::{Component, ComponentBox, ComponentType, TypeSet};
use super::filter::Filter;
use super::world::World;
use crate::error::Result;

/// A handle to an entity in a [`World`] (its UID).
///
/// Handles are cheap to copy and compare. Equality is identity: two handles
/// are equal only if they name the same allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Returns the raw slot index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

// ── EntityRecord ─────────────────────────────────────────────────────────

/// Component storage and pending bookkeeping for one entity.
pub(crate) struct EntityRecord {
    pub(crate) name: Option<String>,
    /// `false` once the entity has been destroyed. The record lingers until its
    /// removals are flushed.
    pub(crate) registered: bool,
    pub(crate) committed: HashMap<TypeId, ComponentBox>,
    pub(crate) pending_add: HashMap<TypeId, ComponentBox>,
    pub(crate) pending_remove: HashSet<TypeId>,
}

impl EntityRecord {
    fn new(name: Option<String>, pending_add: HashMap<TypeId, ComponentBox>) -> Self {
        Self {
            name,
            registered: true,
            committed: HashMap::new(),
            pending_add,
            pending_remove: HashSet::new(),
        }
    }

    /// Types visible to readers right now.
    pub(crate) fn committed_types(&self) -> TypeSet {
        self.committed.keys().copied().collect()
    }

    /// Types the entity will still have once its pending removals are applied.
    pub(crate) fn remaining_types(&self) -> TypeSet {
        self.committed
            .keys()
            .filter(|ty| !self.pending_remove.contains(ty))
            .copied()
            .collect()
    }

    /// Committed and not scheduled for removal.
    pub(crate) fn holds(&self, ty: &TypeId) -> bool {
        self.committed.contains_key(ty) && !self.pending_remove.contains(ty)
    }

    /// Move pending additions into the committed map.
    ///
    /// A type that is still waiting for its old value to be removed stays
    /// pending; returns `true` if anything was held back.
    pub(crate) fn commit_additions(&mut self) -> bool {
        if self.pending_remove.is_empty() {
            self.committed.extend(self.pending_add.drain());
            return false;
        }
        let pending = std::mem::take(&mut self.pending_add);
        for (ty, value) in pending {
            if self.pending_remove.contains(&ty) {
                self.pending_add.insert(ty, value);
            } else {
                self.committed.insert(ty, value);
            }
        }
        !self.pending_add.is_empty()
    }

    /// Physically delete removed components. Only types in `types` are
    /// touched; removals scheduled after the caller's snapshot stay pending.
    pub(crate) fn delete_removed(&mut self, types: &[TypeId]) {
        for ty in types {
            if self.pending_remove.remove(ty) {
                self.committed.remove(ty);
            }
        }
    }
}

// ── EntityStore ──────────────────────────────────────────────────────────

struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Arena of entity records addressed by generational handles.
///
/// ```text
/// slots:     [ {g0, Some}, {g1, None}, {g0, Some} ]
/// free_list: [1]            ← slot 1 was freed; its generation is already bumped
/// ```
pub(crate) struct EntityStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    registered: usize,
}

impl EntityStore {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            registered: 0,
        }
    }

    /// The handle the next call to [`allocate`](Self::allocate) will return.
    pub(crate) fn next_handle(&self) -> Entity {
        match self.free_list.last() {
            Some(&index) => Entity {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => Entity {
                index: self.slots.len() as u32,
                generation: 0,
            },
        }
    }

    pub(crate) fn allocate(
        &mut self,
        name: Option<String>,
        pending_add: HashMap<TypeId, ComponentBox>,
    ) -> Entity {
        let record = EntityRecord::new(name, pending_add);
        self.registered += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            Entity {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Any record the handle still points at, registered or lingering.
    pub(crate) fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.slots
            .get(entity.index as usize)
            .filter(|slot| slot.generation == entity.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    pub(crate) fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.slots
            .get_mut(entity.index as usize)
            .filter(|slot| slot.generation == entity.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    /// The record, only if the entity has not been destroyed.
    pub(crate) fn registered(&self, entity: Entity) -> Option<&EntityRecord> {
        self.get(entity).filter(|record| record.registered)
    }

    pub(crate) fn registered_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.get_mut(entity).filter(|record| record.registered)
    }

    pub(crate) fn is_registered(&self, entity: Entity) -> bool {
        self.registered(entity).is_some()
    }

    /// Mark the entity destroyed. Returns its record so the caller can
    /// schedule the removals.
    pub(crate) fn unregister(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        if !self.is_registered(entity) {
            return None;
        }
        self.registered -= 1;
        let record = self.get_mut(entity)?;
        record.registered = false;
        Some(record)
    }

    /// Drop the record and bump the slot's generation so every outstanding
    /// handle goes stale.
    pub(crate) fn free(&mut self, entity: Entity) -> Option<EntityRecord> {
        let slot = self
            .slots
            .get_mut(entity.index as usize)
            .filter(|slot| slot.generation == entity.generation)?;
        let record = slot.record.take()?;
        if record.registered {
            self.registered -= 1;
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(entity.index);
        Some(record)
    }

    pub(crate) fn registered_count(&self) -> usize {
        self.registered
    }

    /// Registered handles in slot order.
    pub(crate) fn handles(&self) -> Vec<Entity> {
        self.iter().map(|(entity, _)| entity).collect()
    }

    /// Registered entities with their records, in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let record = slot.record.as_ref().filter(|r| r.registered)?;
            let entity = Entity {
                index: index as u32,
                generation: slot.generation,
            };
            Some((entity, record))
        })
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn total_slots(&self) -> usize {
        self.slots.len()
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

// ── Views ────────────────────────────────────────────────────────────────

/// Read-only view of a registered entity, returned by
/// [`World::get_entity`].
pub struct EntityRef<'w> {
    pub(crate) world: &'w World,
    pub(crate) entity: Entity,
}

impl<'w> EntityRef<'w> {
    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn name(&self) -> Option<&'w str> {
        self.world.name(self.entity)
    }

    pub fn get<T: Component>(&self) -> Result<&'w T> {
        self.world.get::<T>(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    /// The committed component types.
    pub fn component_types(&self) -> TypeSet {
        self.world.committed_types(self.entity).unwrap_or_default()
    }

    /// Short names of the committed component types, sorted.
    pub fn component_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .world
            .store
            .get(self.entity)
            .map(|record| {
                record
                    .committed
                    .values()
                    .map(|value| super::component::short_type_name(value.type_name()))
                    .collect()
            })
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn matches(&self, filter: &Filter) -> bool {
        self.world.matches(filter, self.entity).unwrap_or(false)
    }
}

/// Mutable view of a registered entity, returned by [`World::entity_mut`].
///
/// Additions and removals go through the same deferred path as the
/// corresponding [`World`] methods; they chain:
///
/// ```ignore
/// world.entity_mut(e)?.add_component(Health(10))?.remove_component::<Stunned>()?;
/// ```
pub struct EntityMut<'w> {
    pub(crate) world: &'w mut World,
    pub(crate) entity: Entity,
}

impl EntityMut<'_> {
    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn add_component<T: Component>(&mut self, value: T) -> Result<&mut Self> {
        self.world.add_component(self.entity, value)?;
        Ok(self)
    }

    pub fn remove_component<T: Component>(&mut self) -> Result<&mut Self> {
        self.world.remove_component::<T>(self.entity)?;
        Ok(self)
    }

    pub fn get<T: Component>(&self) -> Result<&T> {
        self.world.get::<T>(self.entity)
    }

    pub fn get_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.world.get_mut::<T>(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    /// Whether `T` is committed, or waiting to be added, and not scheduled
    /// for removal. Unlike [`has`](Self::has) this reflects calls made this tick.
    pub fn will_have<T: Component>(&self) -> bool {
        let ty = ComponentType::of::<T>().id();
        self.world
            .store
            .registered(self.entity)
            .is_some_and(|record| record.pending_add.contains_key(&ty) || record.holds(&ty))
    }

    pub fn destroy(self) -> Result<()> {
        self.world.destroy_entity(self.entity)
    }
}
