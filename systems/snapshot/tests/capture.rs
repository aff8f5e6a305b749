use arena_rounds_core::{
    AnchorKind, ArenaBounds, CellCoord, MapSize, ThingBlueprint, ThingCategory,
};
use arena_rounds_system_snapshot::{CaptureOutcome, CaptureStage, WorldSnapshot};
use arena_rounds_world::World;

fn furnished_world() -> World {
    let mut world = World::new(MapSize::new(16, 16), "Soil");
    world.paint(CellCoord::new(2, 2), "Marble", Some("RoofConstructed"), 0.4);
    let _ = world.place_thing(
        CellCoord::new(2, 2),
        ThingBlueprint::new("Wall", ThingCategory::Building, 300).with_stuff("Granite"),
    );
    let _ = world.place_thing(
        CellCoord::new(2, 2),
        ThingBlueprint::new("Filth_Blood", ThingCategory::Filth, 1),
    );
    let _ = world.place_thing(
        CellCoord::new(3, 2),
        ThingBlueprint::new("Plant_Grass", ThingCategory::Plant, 10),
    );
    let _ = world.place_anchor(AnchorKind::Core, CellCoord::new(4, 4));
    world
}

#[test]
fn capture_records_surface_and_permanent_things() {
    let world = furnished_world();
    let region = ArenaBounds::from_limits(0, 0, 5, 5);
    let mut snapshot = WorldSnapshot::new();

    let report = snapshot.capture(region, &world);

    assert_eq!(report.outcome, CaptureOutcome::Captured);
    assert_eq!(report.cells_recorded, 36);
    assert_eq!(report.things_recorded, 3);
    assert_eq!(report.things_skipped, 1);
    assert!(report.failures.is_empty());
    assert_eq!(snapshot.len(), 36);
    assert_eq!(snapshot.region(), Some(region));

    let record = snapshot.cell_at(CellCoord::new(2, 2)).expect("captured");
    assert_eq!(record.terrain.as_str(), "Marble");
    assert_eq!(
        record.roof.as_ref().map(|roof| roof.as_str()),
        Some("RoofConstructed")
    );
    assert!((record.ground_cover - 0.4).abs() < f32::EPSILON);
    assert_eq!(record.things.len(), 1);
    assert_eq!(record.things[0].def.as_str(), "Wall");

    assert!(snapshot.cell_at(CellCoord::new(6, 6)).is_none());
}

#[test]
fn second_capture_is_a_no_op() {
    let mut world = furnished_world();
    let region = ArenaBounds::from_limits(0, 0, 5, 5);
    let mut snapshot = WorldSnapshot::new();
    let _ = snapshot.capture(region, &world);
    let before: Vec<_> = snapshot
        .iter()
        .map(|(cell, record)| (cell, record.clone()))
        .collect();

    world.paint(CellCoord::new(2, 2), "Sand", None, 0.0);
    let report = snapshot.capture(ArenaBounds::from_limits(0, 0, 9, 9), &world);

    assert_eq!(report.outcome, CaptureOutcome::AlreadyCaptured);
    assert_eq!(snapshot.region(), Some(region));
    let after: Vec<_> = snapshot
        .iter()
        .map(|(cell, record)| (cell, record.clone()))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn clear_allows_recapture() {
    let world = furnished_world();
    let mut snapshot = WorldSnapshot::new();
    let _ = snapshot.capture(ArenaBounds::from_limits(0, 0, 1, 1), &world);
    snapshot.clear();
    assert!(!snapshot.is_initialized());
    assert!(snapshot.is_empty());

    let report = snapshot.capture(ArenaBounds::from_limits(0, 0, 2, 2), &world);
    assert_eq!(report.outcome, CaptureOutcome::Captured);
    assert_eq!(snapshot.len(), 9);
}

#[test]
fn unreadable_cells_are_skipped_and_reported() {
    let mut world = furnished_world();
    world.inject_fault(CellCoord::new(2, 2));
    let region = ArenaBounds::from_limits(0, 0, 5, 5);
    let mut snapshot = WorldSnapshot::new();

    let report = snapshot.capture(region, &world);

    assert_eq!(report.cells_recorded, 35);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].cell, CellCoord::new(2, 2));
    assert_eq!(report.failures[0].stage, CaptureStage::Surface);
    assert!(snapshot.cell_at(CellCoord::new(2, 2)).is_none());
    assert!(snapshot.is_initialized());
}
