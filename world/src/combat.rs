//! Minimal order execution standing in for the host's combat resolution.

use arena_rounds_core::{
    Activity, ArenaWorld, CellCoord, CombatantId, DefName, Event, MapSize, Order, ThingBlueprint,
    ThingCategory, MELEE_REACH,
};

use crate::{World, HOST_NAMESPACE};

const MELEE_DAMAGE: u32 = 14;
const RANGED_DAMAGE: u32 = 9;
const ATTACK_COOLDOWN_TICKS: u32 = 30;
const MOVE_COOLDOWN_TICKS: u32 = 6;
const FLEE_HEALTH: u32 = 35;
const CASING_DEF: &str = "Casing_Rifle";
const BLOOD_DEF: &str = "Filth_Blood";

/// Executes one tick of the combatant's current order.
pub(crate) fn act(world: &mut World, id: CombatantId, out_events: &mut Vec<Event>) {
    let Some(state) = world.combatants.get_mut(&id) else {
        return;
    };
    if state.dead {
        return;
    }
    if state.cooldown > 0 {
        state.cooldown -= 1;
        return;
    }

    if !state.engaged && state.health < FLEE_HEALTH {
        state.order = None;
        state.activity = Activity::Fleeing;
    }

    let cell = state.cell;
    let activity = state.activity;
    let order = state.order;
    let weapon_range = state.weapon_range;

    if activity == Activity::Fleeing {
        let destination = flee_destination(world.map_size, cell);
        step_toward(world, id, destination);
        return;
    }

    match order {
        Some(Order::MoveTo { cell: destination }) => {
            if cell == destination {
                finish_order(world, id);
            } else {
                step_toward(world, id, destination);
            }
        }
        Some(Order::AttackMelee { target }) => {
            attack(world, id, target, MELEE_REACH, MELEE_DAMAGE, out_events);
        }
        Some(Order::AttackRanged { target }) => {
            let reach = weapon_range.max(MELEE_REACH);
            attack(world, id, target, reach, RANGED_DAMAGE, out_events);
        }
        None => {}
    }
}

fn attack(
    world: &mut World,
    attacker: CombatantId,
    target: CombatantId,
    reach: u32,
    damage: u32,
    out_events: &mut Vec<Event>,
) {
    let Some(target_cell) = world
        .combatants
        .get(&target)
        .filter(|state| !state.dead)
        .map(|state| state.cell)
    else {
        finish_order(world, attacker);
        return;
    };
    let Some(cell) = world.combatants.get(&attacker).map(|state| state.cell) else {
        return;
    };

    let reach_sq = u64::from(reach) * u64::from(reach);
    if cell.distance_squared(target_cell) > reach_sq {
        step_toward(world, attacker, target_cell);
        return;
    }

    if let Some(state) = world.combatants.get_mut(&attacker) {
        state.cooldown = ATTACK_COOLDOWN_TICKS;
    }
    if reach > MELEE_REACH {
        leave_debris(world, cell, CASING_DEF, ThingCategory::Other);
    }

    let lethal = match world.combatants.get_mut(&target) {
        Some(state) => {
            state.health = state.health.saturating_sub(damage);
            state.engaged = false;
            state.health == 0
        }
        None => false,
    };

    if lethal {
        world.resolve_death(target, Some(attacker), out_events);
    } else {
        leave_debris(world, target_cell, BLOOD_DEF, ThingCategory::Filth);
    }
}

fn step_toward(world: &mut World, id: CombatantId, destination: CellCoord) {
    let Some(cell) = world.combatants.get(&id).map(|state| state.cell) else {
        return;
    };
    let next = cell.step_toward(destination);
    let standable = world.is_standable(next);
    if let Some(state) = world.combatants.get_mut(&id) {
        if standable {
            state.cell = next;
        }
        state.cooldown = MOVE_COOLDOWN_TICKS;
    }
}

fn finish_order(world: &mut World, id: CombatantId) {
    if let Some(state) = world.combatants.get_mut(&id) {
        state.order = None;
        state.activity = Activity::Idle;
    }
}

fn leave_debris(world: &mut World, cell: CellCoord, def: &str, category: ThingCategory) {
    let name = DefName::new(def);
    let present = world
        .things
        .values()
        .any(|state| state.cell == cell && state.blueprint.def == name);
    if !present {
        let _ = world.place_thing_in_namespace(cell, ThingBlueprint::new(def, category, 1), HOST_NAMESPACE);
    }
}

fn flee_destination(map_size: MapSize, cell: CellCoord) -> CellCoord {
    let max_x = i32::try_from(map_size.width()).unwrap_or(i32::MAX).saturating_sub(1);
    let max_z = i32::try_from(map_size.depth()).unwrap_or(i32::MAX).saturating_sub(1);
    let candidates = [
        (cell.x(), CellCoord::new(0, cell.z())),
        (max_x - cell.x(), CellCoord::new(max_x, cell.z())),
        (cell.z(), CellCoord::new(cell.x(), 0)),
        (max_z - cell.z(), CellCoord::new(cell.x(), max_z)),
    ];
    candidates
        .into_iter()
        .min_by_key(|(distance, _)| *distance)
        .map_or(cell, |(_, destination)| destination)
}
