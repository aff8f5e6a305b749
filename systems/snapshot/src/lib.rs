#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Baseline capture of the arena region.
//!
//! A [`WorldSnapshot`] records terrain, roof, ground cover and the permanent
//! things of every cell inside the arena exactly once. The restorer later
//! reconciles the region back to this record after each round.

use std::collections::BTreeMap;

use arena_rounds_core::{
    ArenaBounds, ArenaWorld, CellCoord, DefName, Durability, QualityTier, RoofId, Rotation,
    TerrainId, ThingBlueprint, ThingCategory, ThingKey, ThingSnapshot, WorldError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Reports whether a thing belongs in the baseline.
///
/// Structures, plants and anything exposing building properties are kept,
/// unless the thing is a pawn, corpse, filth, item, projectile, gas, fire or
/// an ethereal marker.
#[must_use]
pub fn is_permanent(thing: &ThingSnapshot) -> bool {
    let transient = matches!(
        thing.category,
        ThingCategory::Pawn
            | ThingCategory::Corpse
            | ThingCategory::Filth
            | ThingCategory::Item
            | ThingCategory::Projectile
            | ThingCategory::Gas
            | ThingCategory::Fire
            | ThingCategory::Ethereal
    );
    if transient {
        return false;
    }

    matches!(thing.category, ThingCategory::Building | ThingCategory::Plant)
        || thing.has_building_properties
}

/// Recorded state of a single permanent thing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThingRecord {
    /// Definition of the thing.
    pub def: DefName,
    /// Material the thing is made from, if any.
    pub stuff: Option<DefName>,
    /// Facing of the thing.
    pub rotation: Rotation,
    /// Category the thing belongs to.
    pub category: ThingCategory,
    /// Hit points at capture time.
    pub durability: Durability,
    /// Crafting quality, if the definition has one.
    pub quality: Option<QualityTier>,
    /// Whether the thing exposes building-specific properties.
    pub has_building_properties: bool,
    /// Whether the thing was an active structure at capture time.
    pub active: bool,
}

impl ThingRecord {
    /// Builds a record from a live thing.
    #[must_use]
    pub fn from_snapshot(thing: &ThingSnapshot) -> Self {
        Self {
            def: thing.def.clone(),
            stuff: thing.stuff.clone(),
            rotation: thing.rotation,
            category: thing.category,
            durability: thing.durability,
            quality: thing.quality,
            has_building_properties: thing.has_building_properties,
            active: thing.active,
        }
    }

    /// Reconciliation key of the recorded thing.
    #[must_use]
    pub fn key(&self) -> ThingKey {
        ThingKey {
            def: self.def.clone(),
            stuff: self.stuff.clone(),
            rotation: self.rotation,
        }
    }

    /// Blueprint that re-creates the thing as recorded.
    #[must_use]
    pub fn to_blueprint(&self) -> ThingBlueprint {
        ThingBlueprint {
            def: self.def.clone(),
            stuff: self.stuff.clone(),
            rotation: self.rotation,
            category: self.category,
            durability: self.durability,
            quality: self.quality,
            has_building_properties: self.has_building_properties,
            active: self.active,
        }
    }
}

/// Recorded state of a single cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Terrain laid on the cell.
    pub terrain: TerrainId,
    /// Roof covering the cell, if any.
    pub roof: Option<RoofId>,
    /// Ground cover depth.
    pub ground_cover: f32,
    /// Permanent things in the order the world reported them.
    pub things: Vec<ThingRecord>,
}

/// Part of a cell that could not be read during capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStage {
    /// Terrain, roof or ground cover; the cell was skipped.
    Surface,
    /// Thing list; the cell was recorded without permanent things.
    Things,
}

/// Failure encountered while capturing a single cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureFailure {
    /// Cell that failed.
    pub cell: CellCoord,
    /// Part of the cell that could not be read.
    pub stage: CaptureStage,
    /// Error reported by the world.
    pub error: WorldError,
}

/// Whether a capture call recorded anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The snapshot was empty and has now been populated.
    Captured,
    /// The snapshot was already initialized; nothing changed.
    AlreadyCaptured,
}

/// Summary of a capture pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureReport {
    /// Whether the call populated the snapshot.
    pub outcome: CaptureOutcome,
    /// Number of cells recorded.
    pub cells_recorded: usize,
    /// Number of permanent things recorded across every cell.
    pub things_recorded: usize,
    /// Number of things seen but left out by the inclusion policy.
    pub things_skipped: usize,
    /// Per-cell failures, in the order they occurred.
    pub failures: Vec<CaptureFailure>,
}

impl CaptureReport {
    fn already_captured() -> Self {
        Self {
            outcome: CaptureOutcome::AlreadyCaptured,
            cells_recorded: 0,
            things_recorded: 0,
            things_skipped: 0,
            failures: Vec::new(),
        }
    }
}

/// Immutable baseline of the arena region.
#[derive(Clone, Debug, Default)]
pub struct WorldSnapshot {
    region: Option<ArenaBounds>,
    cells: BTreeMap<CellCoord, CellRecord>,
}

impl WorldSnapshot {
    /// Creates an empty, uninitialized snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every cell of `region` unless the snapshot is already initialized.
    pub fn capture<W>(&mut self, region: ArenaBounds, world: &W) -> CaptureReport
    where
        W: ArenaWorld + ?Sized,
    {
        if self.is_initialized() {
            debug!(?region, "snapshot already captured; ignoring capture request");
            return CaptureReport::already_captured();
        }

        let mut report = CaptureReport {
            outcome: CaptureOutcome::Captured,
            cells_recorded: 0,
            things_recorded: 0,
            things_skipped: 0,
            failures: Vec::new(),
        };

        for cell in region.cells() {
            let surface = match world.surface(cell) {
                Ok(surface) => surface,
                Err(error) => {
                    warn!(%cell, %error, "skipping cell whose surface cannot be read");
                    report.failures.push(CaptureFailure {
                        cell,
                        stage: CaptureStage::Surface,
                        error,
                    });
                    continue;
                }
            };

            let things = match world.things_at(cell) {
                Ok(things) => {
                    let (permanent, transient): (Vec<_>, Vec<_>) =
                        things.iter().partition(|thing| is_permanent(thing));
                    report.things_skipped += transient.len();
                    permanent
                        .into_iter()
                        .map(ThingRecord::from_snapshot)
                        .collect()
                }
                Err(error) => {
                    warn!(%cell, %error, "recording cell without permanent things");
                    report.failures.push(CaptureFailure {
                        cell,
                        stage: CaptureStage::Things,
                        error,
                    });
                    Vec::new()
                }
            };

            report.things_recorded += things.len();
            report.cells_recorded += 1;
            let _ = self.cells.insert(
                cell,
                CellRecord {
                    terrain: surface.terrain,
                    roof: surface.roof,
                    ground_cover: surface.ground_cover,
                    things,
                },
            );
        }

        self.region = Some(region);
        info!(
            cells = report.cells_recorded,
            things = report.things_recorded,
            skipped = report.things_skipped,
            failures = report.failures.len(),
            "captured arena baseline"
        );
        report
    }

    /// Recorded state of a cell, if it was captured.
    #[must_use]
    pub fn cell_at(&self, cell: CellCoord) -> Option<&CellRecord> {
        self.cells.get(&cell)
    }

    /// Iterates over every recorded cell in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &CellRecord)> {
        self.cells.iter().map(|(cell, record)| (*cell, record))
    }

    /// Discards the baseline so the next capture records afresh.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.region = None;
    }

    /// Reports whether a baseline has been captured.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.region.is_some()
    }

    /// Region the baseline was captured for.
    #[must_use]
    pub fn region(&self) -> Option<ArenaBounds> {
        self.region
    }

    /// Number of recorded cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_rounds_core::{AnchorKind, ThingId};

    fn thing(category: ThingCategory, has_building_properties: bool) -> ThingSnapshot {
        ThingSnapshot {
            id: ThingId::new(1),
            cell: CellCoord::new(0, 0),
            def: DefName::new("Thing"),
            stuff: None,
            rotation: Rotation::North,
            category,
            durability: Durability::full(10),
            quality: None,
            has_building_properties,
            active: false,
            anchor: None::<AnchorKind>,
            type_namespace: String::new(),
        }
    }

    #[test]
    fn buildings_and_plants_are_permanent() {
        assert!(is_permanent(&thing(ThingCategory::Building, true)));
        assert!(is_permanent(&thing(ThingCategory::Plant, false)));
        assert!(is_permanent(&thing(ThingCategory::Other, true)));
        assert!(!is_permanent(&thing(ThingCategory::Other, false)));
    }

    #[test]
    fn transient_categories_are_excluded_even_with_building_properties() {
        for category in [
            ThingCategory::Pawn,
            ThingCategory::Corpse,
            ThingCategory::Filth,
            ThingCategory::Item,
            ThingCategory::Projectile,
            ThingCategory::Gas,
            ThingCategory::Fire,
            ThingCategory::Ethereal,
        ] {
            assert!(!is_permanent(&thing(category, true)), "{category:?}");
        }
    }

    #[test]
    fn record_round_trips_into_blueprint() {
        let mut snapshot = thing(ThingCategory::Building, true);
        snapshot.stuff = Some(DefName::new("Granite"));
        snapshot.quality = Some(QualityTier::Good);
        snapshot.durability = Durability::new(300, 120);
        let record = ThingRecord::from_snapshot(&snapshot);
        let blueprint = record.to_blueprint();
        assert_eq!(blueprint.key(), snapshot.key());
        assert_eq!(blueprint.durability, Durability::new(300, 120));
        assert_eq!(blueprint.quality, Some(QualityTier::Good));
    }
}
