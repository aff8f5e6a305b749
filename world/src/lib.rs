#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative in-memory host world for Arena Rounds.
//!
//! The world owns terrain, roofs, ground cover, designations, things and
//! combatants on a rectangular grid. It implements [`ArenaWorld`] so the round
//! orchestrator can run against it exactly as it would against a real host,
//! and it carries a deliberately small combat model in [`World::step`] so
//! rounds produce deaths, corpses and debris.

mod combat;

#[cfg(feature = "fault_injection")]
use std::collections::BTreeSet;
use std::collections::BTreeMap;

use arena_rounds_core::{
    Activity, AnchorKind, ArenaWorld, CellCoord, CellSurface, CombatantId, CombatantSnapshot,
    Command, Durability, Event, FactionId, MapSize, Order, RoofId, TerrainId, ThingBlueprint,
    ThingCategory, ThingId, ThingSnapshot, Team, WorldError, ANCHOR_NAMESPACE, MELEE_REACH,
};

/// Namespace reported for every thing that is not an arena anchor.
pub const HOST_NAMESPACE: &str = "host::things";

/// Terrain types combatants cannot stand on.
pub const IMPASSABLE_TERRAIN: [&str; 2] = ["DeepWater", "Chasm"];

const COMBATANT_HEALTH: u32 = 100;
const RANGED_WEAPON_RANGE: u32 = 12;
const ANCHOR_HIT_POINTS: u32 = 5_000;
const SPAWN_SPREAD: [(i32, i32); 9] = [
    (0, 0),
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
];

#[derive(Clone, Debug)]
struct CellState {
    terrain: TerrainId,
    roof: Option<RoofId>,
    ground_cover: f32,
    designations: u32,
}

#[derive(Clone, Debug)]
struct ThingState {
    cell: CellCoord,
    blueprint: ThingBlueprint,
    anchor: Option<AnchorKind>,
    type_namespace: String,
}

#[derive(Clone, Debug)]
struct CombatantState {
    team: Team,
    faction: FactionId,
    label: String,
    cell: CellCoord,
    health: u32,
    activity: Activity,
    order: Option<Order>,
    weapon_range: u32,
    engaged: bool,
    dead: bool,
    cooldown: u32,
}

/// Represents the authoritative host world state.
#[derive(Debug)]
pub struct World {
    map_size: MapSize,
    cells: Vec<CellState>,
    things: BTreeMap<ThingId, ThingState>,
    next_thing_id: u64,
    combatants: BTreeMap<CombatantId, CombatantState>,
    next_combatant_id: u32,
    factions: BTreeMap<FactionId, Team>,
    next_faction_id: u32,
    paused: bool,
    tick_index: u64,
    #[cfg(feature = "fault_injection")]
    faults: BTreeSet<CellCoord>,
}

impl World {
    /// Creates a world of the provided size with every cell laid with `terrain`.
    #[must_use]
    pub fn new(map_size: MapSize, terrain: &str) -> Self {
        let capacity_u64 = u64::from(map_size.width()) * u64::from(map_size.depth());
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            map_size,
            cells: vec![
                CellState {
                    terrain: TerrainId::new(terrain),
                    roof: None,
                    ground_cover: 0.0,
                    designations: 0,
                };
                capacity
            ],
            things: BTreeMap::new(),
            next_thing_id: 1,
            combatants: BTreeMap::new(),
            next_combatant_id: 1,
            factions: BTreeMap::new(),
            next_faction_id: 1,
            paused: false,
            tick_index: 0,
            #[cfg(feature = "fault_injection")]
            faults: BTreeSet::new(),
        }
    }

    /// Places an arena anchor structure carrying the authoritative anchor marker.
    pub fn place_anchor(&mut self, kind: AnchorKind, cell: CellCoord) -> ThingId {
        let blueprint = ThingBlueprint::new(
            kind.def_name(),
            ThingCategory::Building,
            ANCHOR_HIT_POINTS,
        )
        .active();
        self.insert_thing(cell, blueprint, Some(kind), ANCHOR_NAMESPACE.to_owned())
    }

    /// Places an ordinary thing without going through the command surface.
    pub fn place_thing(&mut self, cell: CellCoord, blueprint: ThingBlueprint) -> ThingId {
        self.insert_thing(cell, blueprint, None, HOST_NAMESPACE.to_owned())
    }

    /// Places a thing reporting an arbitrary runtime namespace.
    pub fn place_thing_in_namespace(
        &mut self,
        cell: CellCoord,
        blueprint: ThingBlueprint,
        namespace: &str,
    ) -> ThingId {
        self.insert_thing(cell, blueprint, None, namespace.to_owned())
    }

    /// Overwrites terrain, roof and ground cover of a cell without emitting events.
    pub fn paint(&mut self, cell: CellCoord, terrain: &str, roof: Option<&str>, ground_cover: f32) {
        if let Some(index) = self.index(cell) {
            let state = &mut self.cells[index];
            state.terrain = TerrainId::new(terrain);
            state.roof = roof.map(RoofId::new);
            state.ground_cover = ground_cover.clamp(0.0, 1.0);
        }
    }

    /// Adds designation markers to a cell.
    pub fn designate(&mut self, cell: CellCoord, count: u32) {
        if let Some(index) = self.index(cell) {
            let state = &mut self.cells[index];
            state.designations = state.designations.saturating_add(count);
        }
    }

    /// Applies damage to a thing, keeping at least one hit point.
    pub fn damage_thing(&mut self, thing: ThingId, amount: u32) -> Result<(), WorldError> {
        let state = self
            .things
            .get_mut(&thing)
            .ok_or(WorldError::MissingThing { thing })?;
        let damaged = state.blueprint.durability.damaged(amount);
        state.blueprint.durability = if damaged.current() == 0 {
            Durability::new(damaged.max(), 1)
        } else {
            damaged
        };
        Ok(())
    }

    /// Kills a combatant as if the host's combat system had resolved a fatal hit.
    pub fn kill_combatant(
        &mut self,
        victim: CombatantId,
        killer: Option<CombatantId>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let state = self
            .combatants
            .get_mut(&victim)
            .ok_or(WorldError::MissingCombatant { combatant: victim })?;
        if state.dead {
            return Ok(());
        }
        state.health = 0;
        self.resolve_death(victim, killer, out_events);
        Ok(())
    }

    /// Advances the host simulation by one tick unless paused.
    ///
    /// Combatants execute their orders: moves advance one cell per step,
    /// attacks within reach deal fixed damage, and lethal hits emit
    /// [`Event::CombatantDied`] and leave a corpse behind.
    pub fn step(&mut self, out_events: &mut Vec<Event>) {
        if self.paused {
            return;
        }

        self.tick_index = self.tick_index.saturating_add(1);
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for id in ids {
            combat::act(self, id, out_events);
        }
    }

    /// Number of simulated ticks executed while unpaused.
    #[must_use]
    pub const fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Makes every read and write touching `cell` fail until faults are cleared.
    #[cfg(feature = "fault_injection")]
    pub fn inject_fault(&mut self, cell: CellCoord) {
        let _ = self.faults.insert(cell);
    }

    /// Removes every injected fault.
    #[cfg(feature = "fault_injection")]
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    fn insert_thing(
        &mut self,
        cell: CellCoord,
        blueprint: ThingBlueprint,
        anchor: Option<AnchorKind>,
        type_namespace: String,
    ) -> ThingId {
        let id = ThingId::new(self.next_thing_id);
        self.next_thing_id = self.next_thing_id.saturating_add(1);
        let _ = self.things.insert(
            id,
            ThingState {
                cell,
                blueprint,
                anchor,
                type_namespace,
            },
        );
        id
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.map_size.contains(cell) {
            return None;
        }
        let x = usize::try_from(cell.x()).ok()?;
        let z = usize::try_from(cell.z()).ok()?;
        let width = usize::try_from(self.map_size.width()).ok()?;
        Some(z * width + x)
    }

    fn checked_index(&self, cell: CellCoord) -> Result<usize, WorldError> {
        #[cfg(feature = "fault_injection")]
        if self.faults.contains(&cell) {
            return Err(WorldError::CellUnavailable { cell });
        }
        self.index(cell).ok_or(WorldError::OutOfBounds { cell })
    }

    fn snapshot_thing(id: ThingId, state: &ThingState) -> ThingSnapshot {
        ThingSnapshot {
            id,
            cell: state.cell,
            def: state.blueprint.def.clone(),
            stuff: state.blueprint.stuff.clone(),
            rotation: state.blueprint.rotation,
            category: state.blueprint.category,
            durability: state.blueprint.durability,
            quality: state.blueprint.quality,
            has_building_properties: state.blueprint.has_building_properties,
            active: state.blueprint.active,
            anchor: state.anchor,
            type_namespace: state.type_namespace.clone(),
        }
    }

    fn snapshot_combatant(id: CombatantId, state: &CombatantState) -> CombatantSnapshot {
        CombatantSnapshot {
            id,
            team: state.team,
            cell: state.cell,
            activity: state.activity,
            weapon_range: state.weapon_range,
            dead: state.dead,
        }
    }

    fn spawn_cell(&self, anchor: CellCoord, slot: usize) -> CellCoord {
        let (dx, dz) = SPAWN_SPREAD[slot % SPAWN_SPREAD.len()];
        let candidate = CellCoord::new(anchor.x() + dx, anchor.z() + dz);
        if self.map_size.contains(candidate) && self.is_standable(candidate) {
            candidate
        } else {
            anchor
        }
    }

    fn resolve_death(
        &mut self,
        victim: CombatantId,
        killer: Option<CombatantId>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(state) = self.combatants.get_mut(&victim) else {
            return;
        };
        state.dead = true;
        state.order = None;
        state.activity = Activity::Idle;
        let cell = state.cell;
        out_events.push(Event::CombatantDied { victim, killer });
        let _ = self.insert_thing(
            cell,
            ThingBlueprint::new("Corpse_Fighter", ThingCategory::Corpse, 60),
            None,
            HOST_NAMESPACE.to_owned(),
        );
    }

    fn apply_command(
        &mut self,
        command: Command,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        match command {
            Command::SetTerrain { cell, terrain } => {
                let index = self.checked_index(cell)?;
                self.cells[index].terrain = terrain;
            }
            Command::SetRoof { cell, roof } => {
                let index = self.checked_index(cell)?;
                self.cells[index].roof = roof;
            }
            Command::SetGroundCover { cell, depth } => {
                let index = self.checked_index(cell)?;
                self.cells[index].ground_cover = depth.clamp(0.0, 1.0);
            }
            Command::ClearDesignations { cell } => {
                let index = self.checked_index(cell)?;
                self.cells[index].designations = 0;
            }
            Command::DestroyThing { thing } => {
                let cell = self
                    .things
                    .get(&thing)
                    .map(|state| state.cell)
                    .ok_or(WorldError::MissingThing { thing })?;
                let _ = self.checked_index(cell)?;
                let _ = self.things.remove(&thing);
                out_events.push(Event::ThingDestroyed { thing });
            }
            Command::SpawnThing { cell, blueprint } => {
                let _ = self.checked_index(cell)?;
                let thing = self.place_thing(cell, blueprint);
                out_events.push(Event::ThingSpawned { thing, cell });
            }
            Command::HealThing { thing } => {
                let cell = self
                    .things
                    .get(&thing)
                    .map(|state| state.cell)
                    .ok_or(WorldError::MissingThing { thing })?;
                let _ = self.checked_index(cell)?;
                if let Some(state) = self.things.get_mut(&thing) {
                    state.blueprint.durability = state.blueprint.durability.healed();
                }
            }
            Command::PauseSimulation => {
                self.paused = true;
                out_events.push(Event::SimulationPaused);
            }
            Command::ResumeSimulation => {
                self.paused = false;
                out_events.push(Event::SimulationResumed);
            }
            Command::CreateFaction { team } => {
                let faction = FactionId::new(self.next_faction_id);
                self.next_faction_id = self.next_faction_id.saturating_add(1);
                let _ = self.factions.insert(faction, team);
                out_events.push(Event::FactionCreated { team, faction });
            }
            Command::RemoveFaction { faction } => {
                if self.factions.remove(&faction).is_none() {
                    return Err(WorldError::MissingFaction { faction });
                }
                out_events.push(Event::FactionRemoved { faction });
            }
            Command::SpawnCombatant {
                team,
                faction,
                slot,
                label,
                cell,
            } => {
                if !self.factions.contains_key(&faction) {
                    return Err(WorldError::MissingFaction { faction });
                }
                let _ = self.checked_index(cell)?;
                let combatant = CombatantId::new(self.next_combatant_id);
                self.next_combatant_id = self.next_combatant_id.saturating_add(1);
                let weapon_range = if slot % 2 == 0 {
                    RANGED_WEAPON_RANGE
                } else {
                    MELEE_REACH
                };
                let state = CombatantState {
                    team,
                    faction,
                    label,
                    cell: self.spawn_cell(cell, slot),
                    health: COMBATANT_HEALTH,
                    activity: Activity::Wandering,
                    order: None,
                    weapon_range,
                    engaged: false,
                    dead: false,
                    cooldown: 0,
                };
                let _ = self.combatants.insert(combatant, state);
                out_events.push(Event::CombatantSpawned {
                    team,
                    slot,
                    combatant,
                });
            }
            Command::DespawnCombatant { combatant } => {
                if self.combatants.remove(&combatant).is_none() {
                    return Err(WorldError::MissingCombatant { combatant });
                }
                out_events.push(Event::CombatantDespawned { combatant });
            }
            Command::ForceEngaged {
                combatant,
                clear_jobs,
            } => {
                let state = self
                    .combatants
                    .get_mut(&combatant)
                    .ok_or(WorldError::MissingCombatant { combatant })?;
                if state.dead {
                    return Ok(());
                }
                state.engaged = true;
                if clear_jobs || state.activity == Activity::Fleeing {
                    state.order = None;
                    state.activity = Activity::Idle;
                }
            }
            Command::IssueOrder { combatant, order } => {
                let state = self
                    .combatants
                    .get_mut(&combatant)
                    .ok_or(WorldError::MissingCombatant { combatant })?;
                if state.dead {
                    return Ok(());
                }
                state.order = Some(order);
                state.activity = match order {
                    Order::AttackMelee { .. } | Order::AttackRanged { .. } => Activity::Attacking,
                    Order::MoveTo { .. } => Activity::Moving,
                };
            }
        }
        Ok(())
    }
}

impl ArenaWorld for World {
    fn map_size(&self) -> MapSize {
        self.map_size
    }

    fn surface(&self, cell: CellCoord) -> Result<CellSurface, WorldError> {
        let index = self.checked_index(cell)?;
        let state = &self.cells[index];
        Ok(CellSurface {
            terrain: state.terrain.clone(),
            roof: state.roof.clone(),
            ground_cover: state.ground_cover,
        })
    }

    fn things_at(&self, cell: CellCoord) -> Result<Vec<ThingSnapshot>, WorldError> {
        let _ = self.checked_index(cell)?;
        Ok(self
            .things
            .iter()
            .filter(|(_, state)| state.cell == cell)
            .map(|(id, state)| Self::snapshot_thing(*id, state))
            .collect())
    }

    fn find_things(&self, predicate: &dyn Fn(&ThingSnapshot) -> bool) -> Vec<ThingSnapshot> {
        self.things
            .iter()
            .map(|(id, state)| Self::snapshot_thing(*id, state))
            .filter(|snapshot| predicate(snapshot))
            .collect()
    }

    fn is_standable(&self, cell: CellCoord) -> bool {
        self.index(cell).map_or(false, |index| {
            let terrain = self.cells[index].terrain.as_str();
            !IMPASSABLE_TERRAIN.contains(&terrain)
        })
    }

    fn combatant(&self, id: CombatantId) -> Option<CombatantSnapshot> {
        self.combatants
            .get(&id)
            .map(|state| Self::snapshot_combatant(id, state))
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn apply(&mut self, command: Command, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.apply_command(command, out_events)
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use arena_rounds_core::{CellCoord, CombatantId, CombatantSnapshot, DefName, FactionId, ThingSnapshot};

    /// Every thing on the map in identifier order.
    #[must_use]
    pub fn things(world: &World) -> Vec<ThingSnapshot> {
        world
            .things
            .iter()
            .map(|(id, state)| World::snapshot_thing(*id, state))
            .collect()
    }

    /// Every thing with the provided definition name.
    #[must_use]
    pub fn things_named(world: &World, def: &DefName) -> Vec<ThingSnapshot> {
        world
            .things
            .iter()
            .filter(|(_, state)| &state.blueprint.def == def)
            .map(|(id, state)| World::snapshot_thing(*id, state))
            .collect()
    }

    /// Every combatant present in the world, dead or alive.
    #[must_use]
    pub fn combatants(world: &World) -> Vec<CombatantSnapshot> {
        world
            .combatants
            .iter()
            .map(|(id, state)| World::snapshot_combatant(*id, state))
            .collect()
    }

    /// Display label assigned to a combatant at spawn time.
    #[must_use]
    pub fn combatant_label(world: &World, id: CombatantId) -> Option<&str> {
        world.combatants.get(&id).map(|state| state.label.as_str())
    }

    /// Faction a combatant was spawned into.
    #[must_use]
    pub fn combatant_faction(world: &World, id: CombatantId) -> Option<FactionId> {
        world.combatants.get(&id).map(|state| state.faction)
    }

    /// Remaining health of a combatant.
    #[must_use]
    pub fn combatant_health(world: &World, id: CombatantId) -> Option<u32> {
        world.combatants.get(&id).map(|state| state.health)
    }

    /// Whether a combatant currently holds the engaged state.
    #[must_use]
    pub fn is_engaged(world: &World, id: CombatantId) -> Option<bool> {
        world.combatants.get(&id).map(|state| state.engaged)
    }

    /// Number of round factions currently registered.
    #[must_use]
    pub fn faction_count(world: &World) -> usize {
        world.factions.len()
    }

    /// Number of designation markers on a cell.
    #[must_use]
    pub fn designations(world: &World, cell: CellCoord) -> u32 {
        world
            .index(cell)
            .map_or(0, |index| world.cells[index].designations)
    }
}
