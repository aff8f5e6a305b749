#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Post-round cleanup and reconciliation of the arena region.
//!
//! [`WorldRestorer::reset_region`] first removes transient debris, then walks
//! the region back to the captured [`WorldSnapshot`]. Arena anchors are
//! shielded by the [`ProtectionPolicy`] at every step and verified before and
//! after the pass.

mod classify;

use std::collections::BTreeMap;

use arena_rounds_core::{
    AnchorKind, AnchorTriad, ArenaBounds, ArenaWorld, CellCoord, Command, DefName, Event,
    ThingCategory, ThingKey, ThingSnapshot, WorldError,
};
use arena_rounds_system_snapshot::{ThingRecord, WorldSnapshot};
use tracing::{error, info, warn};

pub use classify::{classify, Classification, ProtectionPolicy};

/// Operation that failed during a restore pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOperation {
    /// Listing the things of a cell.
    ReadThings,
    /// Reading terrain, roof and ground cover.
    ReadSurface,
    /// Resetting ground cover depth.
    ClearGroundCover,
    /// Clearing designation markers.
    ClearDesignations,
    /// Destroying a thing.
    Destroy,
    /// Restoring the terrain.
    RestoreTerrain,
    /// Restoring or clearing the roof.
    RestoreRoof,
    /// Healing a matched thing.
    Heal,
    /// Re-creating a missing thing.
    Spawn,
}

/// Failure of a single operation; the pass continues regardless.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoreFailure {
    /// Cell the operation targeted.
    pub cell: CellCoord,
    /// Operation that failed.
    pub operation: RestoreOperation,
    /// Error reported by the world.
    pub error: WorldError,
}

/// Protected things that went missing across a restore pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorViolation {
    /// Anchors that could no longer be found.
    pub missing: Vec<AnchorKind>,
    /// Every protected-looking thing still present on the map.
    pub protected_present: Vec<(DefName, CellCoord)>,
}

/// Summary of a cleanup and restore pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Cells visited by the cleanup phase.
    pub cells_cleaned: usize,
    /// Transient things destroyed by the cleanup phase.
    pub debris_removed: usize,
    /// Protected things left alone during cleanup.
    pub protected_kept: usize,
    /// Active structures left alone during cleanup.
    pub active_kept: usize,
    /// Protected things that reached the destroy pass and were dropped from it.
    pub anomalies_caught: usize,
    /// Cells whose terrain was put back.
    pub terrain_restored: usize,
    /// Cells whose roof was put back or cleared.
    pub roofs_restored: usize,
    /// Matched permanent things healed to full durability.
    pub things_healed: usize,
    /// Surplus permanent things destroyed during reconciliation.
    pub things_destroyed: usize,
    /// Missing permanent things re-created.
    pub things_spawned: usize,
    /// Missing things not re-created because their cell is not standable.
    pub spawns_skipped: usize,
    /// Anchors that were already missing before cleanup started.
    pub anchors_missing_before: Vec<AnchorKind>,
    /// Set when an anchor could not be found after the restore phase.
    pub anchor_violation: Option<AnchorViolation>,
    /// Per-operation failures in the order they occurred.
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    /// Reports whether the pass finished without failures or violations.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.anomalies_caught == 0
            && self.anchors_missing_before.is_empty()
            && self.anchor_violation.is_none()
    }
}

/// Cleans and reconciles the arena region after each round.
#[derive(Debug, Default)]
pub struct WorldRestorer {
    policy: ProtectionPolicy,
    candidates: Vec<ThingSnapshot>,
    events: Vec<Event>,
}

impl WorldRestorer {
    /// Creates a restorer enforcing the provided protection policy.
    #[must_use]
    pub fn new(policy: ProtectionPolicy) -> Self {
        Self {
            policy,
            candidates: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Runs the cleanup phase followed by the restore phase over `bounds`.
    pub fn reset_region<W>(
        &mut self,
        world: &mut W,
        bounds: &ArenaBounds,
        snapshot: &WorldSnapshot,
        anchors: &AnchorTriad,
    ) -> RestoreReport
    where
        W: ArenaWorld + ?Sized,
    {
        let mut report = RestoreReport {
            anchors_missing_before: self.verify_anchors(world, anchors),
            ..RestoreReport::default()
        };
        if !report.anchors_missing_before.is_empty() {
            error!(
                missing = ?report.anchors_missing_before,
                "arena anchors missing before cleanup"
            );
        }

        self.cleanup(world, bounds, &mut report);
        self.restore(world, bounds, snapshot, &mut report);

        let missing = self.verify_anchors(world, anchors);
        if !missing.is_empty() {
            let protected_present: Vec<(DefName, CellCoord)> = world
                .find_things(&|thing: &ThingSnapshot| self.policy.is_protected(thing))
                .into_iter()
                .map(|thing| (thing.def, thing.cell))
                .collect();
            error!(
                ?missing,
                ?protected_present,
                "arena anchor missing after restore"
            );
            report.anchor_violation = Some(AnchorViolation {
                missing,
                protected_present,
            });
        }

        info!(
            debris = report.debris_removed,
            healed = report.things_healed,
            destroyed = report.things_destroyed,
            spawned = report.things_spawned,
            terrain = report.terrain_restored,
            roofs = report.roofs_restored,
            anomalies = report.anomalies_caught,
            failures = report.failures.len(),
            "arena region reset"
        );
        report
    }

    /// Removes transient debris, ground cover and designations from `bounds`.
    pub fn cleanup<W>(&mut self, world: &mut W, bounds: &ArenaBounds, report: &mut RestoreReport)
    where
        W: ArenaWorld + ?Sized,
    {
        let mut candidates = std::mem::take(&mut self.candidates);
        candidates.clear();

        for cell in bounds.cells() {
            report.cells_cleaned += 1;
            match world.things_at(cell) {
                Ok(things) => {
                    for thing in things {
                        match classify(&thing, &self.policy) {
                            Classification::Protected => report.protected_kept += 1,
                            Classification::ActiveStructure => report.active_kept += 1,
                            Classification::Removable => candidates.push(thing),
                            Classification::Keep => {}
                        }
                    }
                }
                Err(error) => note_failure(report, cell, RestoreOperation::ReadThings, error),
            }

            let result = self.execute(world, Command::SetGroundCover { cell, depth: 0.0 });
            if let Err(error) = result {
                note_failure(report, cell, RestoreOperation::ClearGroundCover, error);
            }
            let result = self.execute(world, Command::ClearDesignations { cell });
            if let Err(error) = result {
                note_failure(report, cell, RestoreOperation::ClearDesignations, error);
            }
        }

        let destroyed = self.destroy_candidates(world, &candidates, report);
        report.debris_removed += destroyed;
        self.candidates = candidates;
    }

    /// Destroys `candidates`, refusing any that the protection policy matches.
    ///
    /// Protected candidates are logged and counted as caught anomalies. Returns
    /// the number of things destroyed.
    pub fn destroy_candidates<W>(
        &mut self,
        world: &mut W,
        candidates: &[ThingSnapshot],
        report: &mut RestoreReport,
    ) -> usize
    where
        W: ArenaWorld + ?Sized,
    {
        let mut destroyed = 0;
        for candidate in candidates {
            if self.policy.is_protected(candidate) {
                report.anomalies_caught += 1;
                error!(
                    thing = candidate.id.get(),
                    def = %candidate.def,
                    cell = %candidate.cell,
                    "protected thing reached the destroy pass; skipping"
                );
                continue;
            }

            match self.execute(world, Command::DestroyThing { thing: candidate.id }) {
                Ok(()) => destroyed += 1,
                Err(error) => note_failure(report, candidate.cell, RestoreOperation::Destroy, error),
            }
        }
        destroyed
    }

    /// Walks every captured cell of `bounds` back to the snapshot.
    pub fn restore<W>(
        &mut self,
        world: &mut W,
        bounds: &ArenaBounds,
        snapshot: &WorldSnapshot,
        report: &mut RestoreReport,
    ) where
        W: ArenaWorld + ?Sized,
    {
        for cell in bounds.cells() {
            let Some(baseline) = snapshot.cell_at(cell) else {
                continue;
            };

            let surface = match world.surface(cell) {
                Ok(surface) => surface,
                Err(error) => {
                    note_failure(report, cell, RestoreOperation::ReadSurface, error);
                    continue;
                }
            };

            if surface.terrain != baseline.terrain {
                let command = Command::SetTerrain {
                    cell,
                    terrain: baseline.terrain.clone(),
                };
                match self.execute(world, command) {
                    Ok(()) => report.terrain_restored += 1,
                    Err(error) => note_failure(report, cell, RestoreOperation::RestoreTerrain, error),
                }
            }

            if surface.roof != baseline.roof {
                let command = Command::SetRoof {
                    cell,
                    roof: baseline.roof.clone(),
                };
                match self.execute(world, command) {
                    Ok(()) => report.roofs_restored += 1,
                    Err(error) => note_failure(report, cell, RestoreOperation::RestoreRoof, error),
                }
            }

            self.reconcile(world, cell, &baseline.things, report);
        }
    }

    /// Anchors from `anchors` that can no longer be found by marker or name.
    ///
    /// Each anchor is looked for at its recorded position first and anywhere on
    /// the map second.
    pub fn verify_anchors<W>(&self, world: &W, anchors: &AnchorTriad) -> Vec<AnchorKind>
    where
        W: ArenaWorld + ?Sized,
    {
        AnchorKind::ALL
            .into_iter()
            .filter(|kind| {
                let matches = |thing: &ThingSnapshot| {
                    thing.anchor == Some(*kind) || thing.def.as_str() == kind.def_name()
                };
                let at_position = anchors
                    .position(*kind)
                    .and_then(|cell| world.things_at(cell).ok())
                    .map_or(false, |things| things.iter().any(matches));
                !at_position && world.find_things(&matches).is_empty()
            })
            .collect()
    }

    fn reconcile<W>(
        &mut self,
        world: &mut W,
        cell: CellCoord,
        expected: &[ThingRecord],
        report: &mut RestoreReport,
    ) where
        W: ArenaWorld + ?Sized,
    {
        let current = match world.things_at(cell) {
            Ok(current) => current,
            Err(error) => {
                note_failure(report, cell, RestoreOperation::ReadThings, error);
                return;
            }
        };

        let mut remaining: BTreeMap<ThingKey, Vec<&ThingRecord>> = BTreeMap::new();
        for thing in expected
            .iter()
            .filter(|thing| !self.policy.is_protected_def(&thing.def))
        {
            remaining.entry(thing.key()).or_default().push(thing);
        }

        let reconcilable: Vec<&ThingSnapshot> = current
            .iter()
            // Live pawns roam in and out of the region and are left alone.
            .filter(|thing| thing.category != ThingCategory::Pawn)
            .filter(|thing| !self.policy.is_protected(thing))
            .collect();
        for thing in reconcilable {
            let matched = remaining
                .get_mut(&thing.key())
                .and_then(|records| records.pop())
                .is_some();

            if !matched {
                match self.execute(world, Command::DestroyThing { thing: thing.id }) {
                    Ok(()) => report.things_destroyed += 1,
                    Err(error) => note_failure(report, cell, RestoreOperation::Destroy, error),
                }
            } else if !thing.durability.is_full() {
                match self.execute(world, Command::HealThing { thing: thing.id }) {
                    Ok(()) => report.things_healed += 1,
                    Err(error) => note_failure(report, cell, RestoreOperation::Heal, error),
                }
            }
        }

        let standable = world.is_standable(cell);
        for missing in remaining.into_values().flatten() {
            if !standable && !missing.has_building_properties {
                report.spawns_skipped += 1;
                continue;
            }
            let command = Command::SpawnThing {
                cell,
                blueprint: missing.to_blueprint(),
            };
            match self.execute(world, command) {
                Ok(()) => report.things_spawned += 1,
                Err(error) => note_failure(report, cell, RestoreOperation::Spawn, error),
            }
        }
    }

    fn execute<W>(&mut self, world: &mut W, command: Command) -> Result<(), WorldError>
    where
        W: ArenaWorld + ?Sized,
    {
        self.events.clear();
        world.apply(command, &mut self.events)
    }
}

fn note_failure(
    report: &mut RestoreReport,
    cell: CellCoord,
    operation: RestoreOperation,
    error: WorldError,
) {
    warn!(%cell, ?operation, %error, "restore operation failed");
    report.failures.push(RestoreFailure {
        cell,
        operation,
        error,
    });
}
