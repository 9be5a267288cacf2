//! Lifecycle — enter/exit hooks and cascading changes.
//!
//! A `Spawner` gives every new creature a `Health` and a `Shield`. `Combat`
//! wears shields down, removes them when they break and destroys creatures
//! whose health runs out. `Obituary` watches the `mortal` filter and prints
//! each creature's last health value from its exit hook, which runs before
//! the component is deleted.
//!
//! Run with: `RUST_LOG=trace cargo run -p edda --example lifecycle`

use edda::prelude::*;

// ── Components ───────────────────────────────────────────────────────────

struct Creature;

struct Health(u32);

struct Shield(u32);

// ── Resources ────────────────────────────────────────────────────────────

struct Deaths(u32);

// ── Systems ──────────────────────────────────────────────────────────────

/// Equips every creature the moment it appears.
struct Spawner;

impl System for Spawner {
    fn filters(&self) -> Vec<(&'static str, Filter)> {
        vec![("creatures", Filter::of::<Creature>())]
    }

    fn on_enter(&mut self, world: &mut World, _filter: &str, entity: Entity) {
        let hp = 2 + entity.index() * 2;
        if let Ok(mut creature) = world.entity_mut(entity) {
            let equipped = creature
                .add_component(Health(hp))
                .and_then(|c| c.add_component(Shield(1)));
            if let Err(err) = equipped {
                log::warn!("could not equip {entity}: {err}");
            }
        }
    }
}

struct Combat;

impl System for Combat {
    fn filters(&self) -> Vec<(&'static str, Filter)> {
        vec![
            ("shielded", Filter::of::<Shield>()),
            ("exposed", Filter::of::<Health>()),
        ]
    }

    fn update(&mut self, world: &mut World, members: &Members) {
        for &entity in members.get("shielded") {
            let broken = match world.get_mut::<Shield>(entity) {
                Ok(shield) => {
                    shield.0 = shield.0.saturating_sub(1);
                    shield.0 == 0
                }
                Err(_) => false,
            };
            if broken {
                log::info!("{entity}: shield broke");
                if let Err(err) = world.remove_component::<Shield>(entity) {
                    log::warn!("{err}");
                }
            }
        }

        let exposed = members.get("exposed").iter().copied();
        for entity in exposed.filter(|e| !members.get("shielded").contains(e)) {
            let dead = match world.get_mut::<Health>(entity) {
                Ok(health) => {
                    health.0 = health.0.saturating_sub(2);
                    health.0 == 0
                }
                Err(_) => false,
            };
            if dead {
                if let Err(err) = world.destroy_entity(entity) {
                    log::warn!("{err}");
                }
            }
        }
    }
}

struct Obituary;

impl System for Obituary {
    fn filters(&self) -> Vec<(&'static str, Filter)> {
        vec![(
            "mortal",
            and_filter([component::<Creature>(), component::<Health>()]),
        )]
    }

    fn on_enter(&mut self, world: &mut World, _filter: &str, entity: Entity) {
        let name = world.name(entity).unwrap_or("?").to_string();
        println!("{name} joins the fight");
    }

    fn on_exit(&mut self, world: &mut World, _filter: &str, entity: Entity) {
        let name = world.name(entity).unwrap_or("?").to_string();
        let last = world.get::<Health>(entity).map(|h| h.0).unwrap_or(0);
        println!("{name} falls (last health {last})");
        if let Ok(deaths) = world.resource_mut::<Deaths>() {
            deaths.0 += 1;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut world = World::new();
    world.insert_resource(Deaths(0));
    world.add_system(Spawner, 0)?;
    world.add_system(Combat, 10)?;
    world.add_system(Obituary, 20)?;

    for name in ["goblin", "orc", "troll"] {
        world.create_named_entity(name, (Creature,))?;
    }

    while world.entity_count() > 0 {
        world.update();
        log::info!("tick {}: {} creature(s) left", world.tick(), world.entity_count());
    }

    println!(
        "all {} creatures fell after {} ticks",
        world.resource::<Deaths>()?.0,
        world.tick()
    );
    Ok(())
}
