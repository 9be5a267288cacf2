//! Counter — the smallest useful world.
//!
//! One entity carries a `Counter`; one system increments every counter it
//! sees. After three ticks the value is 3.
//!
//! Run with: `RUST_LOG=debug cargo run -p edda --example counter`

use edda::prelude::*;

// ── Components ───────────────────────────────────────────────────────────

struct Counter {
    value: i32,
}

// ── Systems ──────────────────────────────────────────────────────────────

struct Count;

impl System for Count {
    fn filters(&self) -> Vec<(&'static str, Filter)> {
        vec![("counts", Filter::of::<Counter>())]
    }

    fn update(&mut self, world: &mut World, members: &Members) {
        for &entity in members.get("counts") {
            if let Ok(counter) = world.get_mut::<Counter>(entity) {
                counter.value += 1;
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut world = World::with_config(WorldConfig::default().label("counter"));
    let entity = world.create_named_entity("tally", ())?;
    world.add_component(entity, Counter { value: 0 })?;
    world.add_system(Count, 0)?;

    for _ in 0..3 {
        world.update();
        log::info!(
            "tick {}: counter = {}",
            world.tick(),
            world.get::<Counter>(entity)?.value
        );
    }

    #[cfg(feature = "diagnostics")]
    {
        if let Ok(json) = world.snapshot().to_json_pretty() {
            println!("{json}");
        }
    }

    Ok(())
}
