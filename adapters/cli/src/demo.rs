//! Demo arena laid out on the in-memory reference world.

use arena_rounds_core::{AnchorKind, CellCoord, MapSize, ThingBlueprint, ThingCategory};
use arena_rounds_world::World;

const MAP_SIZE: MapSize = MapSize::new(80, 80);
const CORE: CellCoord = CellCoord::new(40, 40);
const SPAWN_A: CellCoord = CellCoord::new(32, 40);
const SPAWN_B: CellCoord = CellCoord::new(48, 40);

/// Builds an 80x80 map holding the three anchors, some cover and a pond.
pub(crate) fn arena_world() -> World {
    let mut world = World::new(MAP_SIZE, "Soil");
    for (kind, cell) in [
        (AnchorKind::Core, CORE),
        (AnchorKind::TeamASpawn, SPAWN_A),
        (AnchorKind::TeamBSpawn, SPAWN_B),
    ] {
        let _ = world.place_anchor(kind, cell);
    }

    for z in 36..=44 {
        if z == 40 {
            continue;
        }
        for x in [37, 43] {
            let _ = world.place_thing(
                CellCoord::new(x, z),
                ThingBlueprint::new("Sandbags", ThingCategory::Building, 150).with_stuff("Cloth"),
            );
        }
    }

    for x in 38..=42 {
        let cell = CellCoord::new(x, 33);
        world.paint(cell, "Concrete", Some("RoofConstructed"), 0.0);
        let _ = world.place_thing(
            cell,
            ThingBlueprint::new("Wall", ThingCategory::Building, 300).with_stuff("Granite"),
        );
    }

    for (x, z) in [(30, 34), (35, 46), (45, 33), (50, 47), (41, 49)] {
        let _ = world.place_thing(
            CellCoord::new(x, z),
            ThingBlueprint::new("Plant_Tree", ThingCategory::Plant, 200),
        );
    }

    for x in 44..=47 {
        for z in 45..=47 {
            world.paint(CellCoord::new(x, z), "DeepWater", None, 0.0);
        }
    }
    let _ = world.place_thing(
        CellCoord::new(45, 46),
        ThingBlueprint::new("Plant_Kelp", ThingCategory::Plant, 20),
    );

    world
}
