//! # World — The Central Container
//!
//! The [`World`] owns every entity, every system and every resource. It is the
//! only way to create or destroy entities and the only thing that drives ticks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ World                                                    │
//! │                                                          │
//! │  store: EntityStore      slab of EntityRecords           │
//! │    committed / pending_add / pending_remove per entity   │
//! │                                                          │
//! │  additions: DirtyPool    entities with pending adds      │
//! │  removals:  DirtyPool    entities with pending removals  │
//! │                                                          │
//! │  systems: BTreeMap<i32, SystemEntry>                     │
//! │    sort key → system + one membership set per filter     │
//! │                                                          │
//! │  resources: HashMap<TypeId, Box<dyn Any>>                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deferred Mutation
//!
//! `add_component` and `remove_component` never touch committed data. They
//! record the change on the entity and put the entity in a dirty pool. The
//! change becomes visible, to readers and to systems at once, when the world
//! flushes.
//!
//! ## The Flush
//!
//! ```text
//! loop until both pools are empty:
//!   while removals non-empty:
//!     for each entity:
//!       for each system, each filter holding it:
//!         no longer matches (committed − pending_remove)?  → on_exit
//!       delete the removed components                     ← after every exit
//!   for each entity in additions:
//!     commit pending_add                                  ← before any enter
//!     for each system, each filter not holding it:
//!       now matches committed?                            → on_enter
//! ```
//!
//! Hooks may add and remove components or destroy entities. Those calls simply
//! dirty more entities, and the outer loop keeps going until nothing is left.
//! A hook therefore always sees an entity either just before a removal or just
//! after an addition, never halfway.
//!
//! `update()` flushes before every system and once more after the last one.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::component::{Bundle, Component, ComponentBox, ComponentType, TypeSet};
use super::entity::{Entity, EntityMut, EntityRef, EntityStore};
use super::filter::Filter;
#[cfg(feature = "diagnostics")]
use super::system::SystemTiming;
use super::system::{System, SystemEntry, short_system_name};
use crate::config::WorldConfig;
use crate::error::{EcsError, Result};

/// Insertion-ordered set of entities awaiting a flush.
#[derive(Default)]
struct DirtyPool {
    order: Vec<Entity>,
    members: HashSet<Entity>,
}

impl DirtyPool {
    fn insert(&mut self, entity: Entity) {
        if self.members.insert(entity) {
            self.order.push(entity);
        }
    }

    fn remove(&mut self, entity: Entity) {
        if self.members.remove(&entity) {
            self.order.retain(|e| *e != entity);
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(any(feature = "diagnostics", test))]
    fn len(&self) -> usize {
        self.order.len()
    }

    fn take(&mut self) -> Vec<Entity> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }
}

/// The central container for entities, systems and resources.
pub struct World {
    config: WorldConfig,
    pub(crate) store: EntityStore,
    systems: BTreeMap<i32, SystemEntry>,
    /// System type → its sort key.
    system_keys: HashMap<TypeId, i32>,
    /// Systems removed while one of their own callbacks was running. They are
    /// torn down as soon as that callback returns.
    detached: Vec<SystemEntry>,
    next_system_id: u64,
    additions: DirtyPool,
    removals: DirtyPool,
    resources: HashMap<TypeId, Box<dyn Any>>,
    flushing: bool,
    /// Number of system callbacks currently on the stack.
    callback_depth: u32,
    tick: u64,
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            store: EntityStore::new(),
            systems: BTreeMap::new(),
            system_keys: HashMap::new(),
            detached: Vec::new(),
            next_system_id: 0,
            additions: DirtyPool::default(),
            removals: DirtyPool::default(),
            resources: HashMap::new(),
            flushing: false,
            callback_depth: 0,
            tick: 0,
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of completed `update()` calls.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Insert a resource (singleton value). Replaces any existing resource of
    /// the same type.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn resource<T: 'static + Send + Sync>(&self) -> Result<&T> {
        self.get_resource::<T>()
            .ok_or(EcsError::MissingResource(std::any::type_name::<T>()))
    }

    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> Result<&mut T> {
        self.get_resource_mut::<T>()
            .ok_or(EcsError::MissingResource(std::any::type_name::<T>()))
    }

    pub fn get_resource<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<T>())
    }

    pub fn has_resource<T: 'static + Send + Sync>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Remove a resource, taking ownership.
    pub fn remove_resource<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|r| r.downcast::<T>().ok())
            .map(|b| *b)
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Create an entity whose initial components become visible at the next
    /// flush.
    ///
    /// A bundle that repeats a component type fails with `DuplicateComponent`
    /// and creates nothing.
    ///
    /// ```ignore
    /// let e = world.create_entity((Position { x: 0.0, y: 0.0 }, Health(10)))?;
    /// let empty = world.create_entity(())?;
    /// ```
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> Result<Entity> {
        self.spawn(None, bundle)
    }

    /// Like [`create_entity`](Self::create_entity), with a human-readable label.
    pub fn create_named_entity<B: Bundle>(
        &mut self,
        name: impl Into<String>,
        bundle: B,
    ) -> Result<Entity> {
        self.spawn(Some(name.into()), bundle)
    }

    fn spawn<B: Bundle>(&mut self, name: Option<String>, bundle: B) -> Result<Entity> {
        let types = B::component_types();
        let repeated = types
            .iter()
            .enumerate()
            .find(|(i, ty)| types[..*i].contains(ty))
            .map(|(_, ty)| *ty);
        if let Some(ty) = repeated {
            // Nothing is allocated; the error names the handle this call would
            // have returned.
            return Err(EcsError::DuplicateComponent {
                entity: self.store.next_handle(),
                component: ty.short_name(),
            });
        }

        let mut pending = HashMap::with_capacity(types.len());
        bundle.into_components(&mut pending);
        let entity = self.store.allocate(name, pending);
        // Even a bare entity is offered to every system: an empty AND filter
        // matches it.
        self.additions.insert(entity);
        log::debug!(
            "[{}] created entity {entity} with {} pending component(s)",
            self.config.label,
            types.len()
        );
        Ok(entity)
    }

    /// Destroy an entity.
    ///
    /// The entity is unregistered immediately. Its committed components stay
    /// readable until the next flush has delivered an exit for every filter
    /// it was in; then they are dropped and the handle goes stale. Pending
    /// additions are discarded.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        let record = self
            .store
            .unregister(entity)
            .ok_or(EcsError::NoSuchUid(entity))?;
        record.pending_add.clear();
        let committed: Vec<TypeId> = record.committed.keys().copied().collect();
        record.pending_remove.extend(committed);
        self.additions.remove(entity);
        self.removals.insert(entity);
        log::debug!("[{}] destroyed entity {entity}", self.config.label);
        Ok(())
    }

    /// Resolve a handle to a registered entity.
    pub fn get_entity(&self, entity: Entity) -> Result<EntityRef<'_>> {
        if !self.store.is_registered(entity) {
            return Err(EcsError::NoSuchUid(entity));
        }
        Ok(EntityRef {
            world: self,
            entity,
        })
    }

    pub fn entity_mut(&mut self, entity: Entity) -> Result<EntityMut<'_>> {
        if !self.store.is_registered(entity) {
            return Err(EcsError::NoSuchUid(entity));
        }
        Ok(EntityMut {
            world: self,
            entity,
        })
    }

    /// `true` until the entity is destroyed.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.store.is_registered(entity)
    }

    /// Number of registered (not destroyed) entities.
    pub fn entity_count(&self) -> usize {
        self.store.registered_count()
    }

    /// Registered entities in handle order.
    pub fn entities(&self) -> Vec<Entity> {
        self.store.handles()
    }

    /// The entity's label, if it was created with one.
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.store.get(entity)?.name.as_deref()
    }

    /// First registered entity with the given label.
    pub fn find_named(&self, name: &str) -> Option<Entity> {
        self.store
            .iter()
            .find(|(_, record)| record.name.as_deref() == Some(name))
            .map(|(entity, _)| entity)
    }

    // ── Components ───────────────────────────────────────────────────

    /// Schedule `value` to be attached at the next flush.
    ///
    /// Fails with `DuplicateComponent` if a `T` is already committed (and not
    /// being removed) or already pending.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        let ty = TypeId::of::<T>();
        let record = self
            .store
            .registered_mut(entity)
            .ok_or(EcsError::NoSuchUid(entity))?;
        if record.pending_add.contains_key(&ty) || record.holds(&ty) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: ComponentType::of::<T>().short_name(),
            });
        }
        record.pending_add.insert(ty, ComponentBox::new(value));
        self.additions.insert(entity);
        Ok(())
    }

    /// Schedule the committed `T` to be detached at the next flush.
    ///
    /// Fails with `MissingComponent` if no `T` is committed, including when it
    /// is only pending addition. Removing a `T` whose removal is already
    /// scheduled is accepted and changes nothing.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
        let ty = TypeId::of::<T>();
        let record = self
            .store
            .registered_mut(entity)
            .ok_or(EcsError::NoSuchUid(entity))?;
        if !record.committed.contains_key(&ty) {
            return Err(missing::<T>(entity));
        }
        record.pending_remove.insert(ty);
        self.removals.insert(entity);
        Ok(())
    }

    /// Read a committed component.
    ///
    /// Components added since the last flush are not visible yet. Components
    /// of a destroyed entity stay readable until the flush that drops them.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T> {
        let record = self.store.get(entity).ok_or(EcsError::NoSuchUid(entity))?;
        record
            .committed
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or_else(|| missing::<T>(entity))
    }

    /// Mutate a committed component in place.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        let record = self
            .store
            .get_mut(entity)
            .ok_or(EcsError::NoSuchUid(entity))?;
        record
            .committed
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
            .ok_or_else(|| missing::<T>(entity))
    }

    /// Whether a `T` is committed on the entity.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.store
            .get(entity)
            .is_some_and(|record| record.committed.contains_key(&TypeId::of::<T>()))
    }

    /// The entity's committed component types.
    pub fn committed_types(&self, entity: Entity) -> Result<TypeSet> {
        self.store
            .get(entity)
            .map(|record| record.committed_types())
            .ok_or(EcsError::NoSuchUid(entity))
    }

    /// Evaluate `filter` against the entity's committed components.
    pub fn matches(&self, filter: &Filter, entity: Entity) -> Result<bool> {
        Ok(filter.matches(&self.committed_types(entity)?))
    }

    // ── Systems ──────────────────────────────────────────────────────

    /// Register a system to run at `sort_key` (ascending order).
    ///
    /// Every registered entity is re-evaluated at the next flush, so the new
    /// system receives one `on_enter` per matching entity and filter.
    pub fn add_system<S: System>(&mut self, system: S, sort_key: i32) -> Result<()> {
        let type_id = TypeId::of::<S>();
        if self.system_keys.contains_key(&type_id) {
            return Err(EcsError::DuplicateSystem(system.name()));
        }
        if let Some(existing) = self.systems.get(&sort_key) {
            return Err(EcsError::DuplicateSortKey {
                sort_key,
                existing: existing.name.clone(),
            });
        }

        self.next_system_id += 1;
        let entry = SystemEntry::new(self.next_system_id, Box::new(system));
        log::info!(
            "[{}] registered system `{}` at sort key {sort_key} with {} filter(s)",
            self.config.label,
            entry.name,
            entry.filters.len()
        );
        self.systems.insert(sort_key, entry);
        self.system_keys.insert(type_id, sort_key);

        for entity in self.store.handles() {
            self.additions.insert(entity);
        }
        Ok(())
    }

    /// Unregister a system. It receives `on_exit` for every entity in every
    /// one of its filters before it is dropped.
    ///
    /// A system may remove itself from inside its own callback; the teardown
    /// then runs as soon as that callback returns.
    pub fn remove_system<S: System>(&mut self) -> Result<()> {
        let missing = || EcsError::MissingSystem(short_system_name(std::any::type_name::<S>()));
        let sort_key = *self
            .system_keys
            .get(&TypeId::of::<S>())
            .ok_or_else(missing)?;
        let mut entry = self.systems.remove(&sort_key).ok_or_else(missing)?;
        self.system_keys.remove(&TypeId::of::<S>());
        log::info!(
            "[{}] removing system `{}` from sort key {sort_key}",
            self.config.label,
            entry.name
        );
        match entry.system.take() {
            Some(system) => self.teardown(entry, system),
            None => self.detached.push(entry),
        }
        Ok(())
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.system_keys.contains_key(&TypeId::of::<S>())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Current members of one of `S`'s filters, in handle order. Unknown
    /// filter names yield an empty list.
    pub fn members<S: System>(&self, filter: &str) -> Result<Vec<Entity>> {
        let entry = self
            .system_keys
            .get(&TypeId::of::<S>())
            .and_then(|key| self.systems.get(key))
            .ok_or_else(|| EcsError::MissingSystem(short_system_name(std::any::type_name::<S>())))?;
        Ok(entry
            .members(filter)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn teardown(&mut self, mut entry: SystemEntry, mut system: Box<dyn System>) {
        let departures = entry.drain_members();
        self.callback_depth += 1;
        for (filter, entity) in departures {
            log::trace!(
                "[{}] `{}` exit `{filter}` {entity} (teardown)",
                self.config.label,
                entry.name
            );
            system.on_exit(self, filter, entity);
        }
        self.callback_depth -= 1;
        log::debug!("[{}] system `{}` torn down", self.config.label, entry.name);
    }

    /// Run `f` with the system registered at `sort_key`, provided it is still
    /// the registration `id`. The system is taken out of the registry for the
    /// duration of the call.
    fn call_system(
        &mut self,
        sort_key: i32,
        id: u64,
        f: impl FnOnce(&mut dyn System, &mut World),
    ) -> bool {
        let Some(entry) = self.systems.get_mut(&sort_key).filter(|entry| entry.id == id) else {
            return false;
        };
        let Some(mut system) = entry.system.take() else {
            return false;
        };
        self.callback_depth += 1;
        f(system.as_mut(), self);
        self.callback_depth -= 1;
        self.restore_system(sort_key, id, system);
        true
    }

    fn restore_system(&mut self, sort_key: i32, id: u64, system: Box<dyn System>) {
        if let Some(entry) = self.systems.get_mut(&sort_key) {
            if entry.id == id {
                entry.system = Some(system);
                return;
            }
        }
        // Removed while running.
        if let Some(pos) = self.detached.iter().position(|entry| entry.id == id) {
            let entry = self.detached.swap_remove(pos);
            self.teardown(entry, system);
        }
    }

    fn sort_keys(&self) -> Vec<i32> {
        self.systems.keys().copied().collect()
    }

    // ── Flush ────────────────────────────────────────────────────────

    /// Apply all pending additions and removals, notifying systems, until
    /// nothing is pending.
    ///
    /// Called from inside a flush or a system callback this does nothing: the
    /// enclosing flush point picks the changes up.
    pub fn flush(&mut self) {
        if self.flushing || self.callback_depth > 0 {
            return;
        }
        self.flushing = true;

        let mut passes = 0usize;
        let mut removed = 0usize;
        let mut added = 0usize;
        while !(self.removals.is_empty() && self.additions.is_empty()) {
            passes += 1;
            if passes == self.config.flush_pass_warning {
                log::warn!(
                    "[{}] flush has needed {passes} passes; hooks may be re-dirtying entities in a loop",
                    self.config.label
                );
            }
            while !self.removals.is_empty() {
                for entity in self.removals.take() {
                    removed += 1;
                    self.apply_removals(entity);
                }
            }
            for entity in self.additions.take() {
                added += 1;
                self.apply_additions(entity);
            }
        }

        self.flushing = false;
        if passes > 0 {
            log::debug!(
                "[{}] flush settled after {passes} pass(es): {removed} removal(s), {added} addition(s)",
                self.config.label
            );
        }
    }

    fn apply_removals(&mut self, entity: Entity) {
        let Some(record) = self.store.get(entity) else {
            return;
        };
        let destroyed = !record.registered;
        let removing: Vec<TypeId> = record.pending_remove.iter().copied().collect();
        let remaining = record.remaining_types();

        for sort_key in self.sort_keys() {
            self.notify_exits(sort_key, entity, &remaining, destroyed);
        }

        // Every system has seen the departure; now the data can go.
        let Some(record) = self.store.get_mut(entity) else {
            return;
        };
        record.delete_removed(&removing);
        if destroyed {
            self.store.free(entity);
            log::trace!("[{}] freed entity {entity}", self.config.label);
        }
    }

    fn apply_additions(&mut self, entity: Entity) {
        let Some(record) = self.store.registered_mut(entity) else {
            return;
        };
        let held_back = record.commit_additions();
        let committed = record.committed_types();
        if held_back {
            // Waiting on a removal of the same type; retried next pass.
            self.additions.insert(entity);
        }

        for sort_key in self.sort_keys() {
            self.notify_enters(sort_key, entity, &committed);
        }
    }

    fn notify_exits(&mut self, sort_key: i32, entity: Entity, remaining: &TypeSet, destroyed: bool) {
        loop {
            let Some(entry) = self.systems.get_mut(&sort_key) else {
                return;
            };
            let Some(filter) = entry.take_exit(entity, remaining, destroyed) else {
                return;
            };
            let id = entry.id;
            log::trace!(
                "[{}] `{}` exit `{filter}` {entity}",
                self.config.label,
                entry.name
            );
            self.call_system(sort_key, id, |system, world| {
                system.on_exit(world, filter, entity)
            });
        }
    }

    fn notify_enters(&mut self, sort_key: i32, entity: Entity, committed: &TypeSet) {
        loop {
            // A hook may have destroyed the entity; its removal will be
            // processed next, so stop handing out enters.
            if !self.store.is_registered(entity) {
                return;
            }
            let Some(entry) = self.systems.get_mut(&sort_key) else {
                return;
            };
            let Some(filter) = entry.take_enter(entity, committed) else {
                return;
            };
            let id = entry.id;
            log::trace!(
                "[{}] `{}` enter `{filter}` {entity}",
                self.config.label,
                entry.name
            );
            self.call_system(sort_key, id, |system, world| {
                system.on_enter(world, filter, entity)
            });
        }
    }

    // ── Update ───────────────────────────────────────────────────────

    /// Run one tick: every system in ascending sort-key order, each preceded
    /// by a flush, and a final flush after the last one.
    ///
    /// Systems registered during the tick first run on the next one; systems
    /// removed during the tick are skipped. Calling `update()` from inside a
    /// system callback is ignored.
    pub fn update(&mut self) {
        if self.flushing || self.callback_depth > 0 {
            log::warn!(
                "[{}] update() called from inside a flush or system callback; ignored",
                self.config.label
            );
            return;
        }
        #[cfg(feature = "diagnostics")]
        {
            self.timings.clear();
        }

        let schedule: Vec<(i32, u64)> = self
            .systems
            .iter()
            .map(|(sort_key, entry)| (*sort_key, entry.id))
            .collect();
        for (sort_key, id) in schedule {
            self.flush();
            let Some(entry) = self.systems.get(&sort_key).filter(|entry| entry.id == id) else {
                continue;
            };
            let members = entry.snapshot();
            #[cfg(feature = "diagnostics")]
            let (name, start) = (entry.name.clone(), std::time::Instant::now());

            self.call_system(sort_key, id, |system, world| system.update(world, &members));

            #[cfg(feature = "diagnostics")]
            {
                self.timings.push(SystemTiming {
                    name,
                    duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
                });
            }
        }
        self.flush();
        self.tick += 1;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn missing<T: Component>(entity: Entity) -> EcsError {
    EcsError::MissingComponent {
        entity,
        component: ComponentType::of::<T>().short_name(),
    }
}

// ── Diagnostics ──────────────────────────────────────────────────────────

#[cfg(feature = "diagnostics")]
impl World {
    /// Per-system update durations from the most recent `update()`.
    pub fn system_timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    /// Capture a serializable view of the world for debugging tools.
    pub fn snapshot(&self) -> crate::diag::WorldSnapshot {
        use crate::diag::{
            EntityPoolSnapshot, EntitySnapshot, FilterSnapshot, SystemSnapshot, WorldSnapshot,
        };

        let total_slots = self.store.total_slots();
        let free_count = self.store.free_count();
        let alive_count = self.store.registered_count();

        let systems = self
            .systems
            .iter()
            .map(|(sort_key, entry)| SystemSnapshot {
                sort_key: *sort_key,
                name: entry.name.clone(),
                filters: entry
                    .filters
                    .iter()
                    .map(|slot| FilterSnapshot {
                        name: slot.name.to_string(),
                        filter: slot.filter.to_string(),
                        members: slot.members.len(),
                    })
                    .collect(),
            })
            .collect();

        let entities = self
            .store
            .iter()
            .map(|(entity, record)| {
                let mut components: Vec<String> = record
                    .committed
                    .values()
                    .map(|value| super::component::short_type_name(value.type_name()).to_string())
                    .collect();
                components.sort();
                EntitySnapshot {
                    id: entity.index(),
                    generation: entity.generation(),
                    name: record.name.clone(),
                    components,
                    pending_additions: record.pending_add.len(),
                    pending_removals: record.pending_remove.len(),
                }
            })
            .collect();

        WorldSnapshot {
            label: self.config.label.clone(),
            tick: self.tick,
            entity_count: alive_count,
            entity_pool: EntityPoolSnapshot {
                total_slots,
                free_count,
                alive_count,
                lingering_count: total_slots - free_count - alive_count,
            },
            dirty_additions: self.additions.len(),
            dirty_removals: self.removals.len(),
            systems,
            entities,
            timings: self.timings.clone(),
        }
    }
}
