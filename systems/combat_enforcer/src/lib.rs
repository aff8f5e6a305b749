#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that keeps fighters aggressive and inside the arena.

use arena_rounds_core::{
    AnchorTriad, ArenaBounds, CellCoord, CombatantId, CombatantSnapshot, CombatantView, Command,
    Order, Team, MELEE_REACH,
};
use arena_rounds_system_roster::RoundRoster;
use tracing::debug;

/// Combat enforcer that reuses scratch buffers between invocations.
#[derive(Debug, Default)]
pub struct CombatEnforcer {
    fighters: Vec<CombatantSnapshot>,
    enemies: Vec<CombatantSnapshot>,
}

impl CombatEnforcer {
    /// Creates a new combat enforcer with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces every living fighter into combat at the start of the active phase.
    ///
    /// Each fighter has its queued jobs discarded and receives an attack order
    /// on the nearest living enemy, or an advance order toward the enemy spawn
    /// anchor when none exists.
    pub fn engage(
        &mut self,
        roster: &RoundRoster,
        combatants: &CombatantView,
        anchors: &AnchorTriad,
        out: &mut Vec<Command>,
    ) {
        self.prepare_fighters(roster, combatants);
        let fighters = std::mem::take(&mut self.fighters);

        for fighter in &fighters {
            out.push(Command::ForceEngaged {
                combatant: fighter.id,
                clear_jobs: true,
            });
            if let Some(order) = self.pursue(fighter, roster, combatants, anchors) {
                out.push(Command::IssueOrder {
                    combatant: fighter.id,
                    order,
                });
            }
        }

        debug!(fighters = fighters.len(), "engaged fighters");
        self.fighters = fighters;
    }

    /// Re-asserts engagement and reissues orders for idle or stray fighters.
    ///
    /// Fighters outside `bounds` are ordered back toward the center. Fighters
    /// that lack a purposeful order are pointed at the nearest living enemy.
    /// Everyone else keeps their current order.
    pub fn tick(
        &mut self,
        roster: &RoundRoster,
        combatants: &CombatantView,
        bounds: &ArenaBounds,
        anchors: &AnchorTriad,
        out: &mut Vec<Command>,
    ) {
        self.prepare_fighters(roster, combatants);
        let fighters = std::mem::take(&mut self.fighters);
        let mut reordered = 0_usize;

        for fighter in &fighters {
            out.push(Command::ForceEngaged {
                combatant: fighter.id,
                clear_jobs: false,
            });

            let order = if !bounds.contains(fighter.cell) {
                Some(Order::MoveTo {
                    cell: bounds.center(),
                })
            } else if fighter.activity.needs_orders() {
                self.pursue(fighter, roster, combatants, anchors)
            } else {
                None
            };

            if let Some(order) = order {
                reordered += 1;
                out.push(Command::IssueOrder {
                    combatant: fighter.id,
                    order,
                });
            }
        }

        debug!(fighters = fighters.len(), reordered, "enforced combat");
        self.fighters = fighters;
    }

    fn prepare_fighters(&mut self, roster: &RoundRoster, combatants: &CombatantView) {
        self.fighters.clear();
        self.fighters
            .extend(living_snapshots(roster, combatants, None));
    }

    fn pursue(
        &mut self,
        fighter: &CombatantSnapshot,
        roster: &RoundRoster,
        combatants: &CombatantView,
        anchors: &AnchorTriad,
    ) -> Option<Order> {
        let enemy_team = fighter.team.opponent();
        self.enemies.clear();
        self.enemies
            .extend(living_snapshots(roster, combatants, Some(enemy_team)));

        match nearest(fighter.cell, &self.enemies) {
            Some(best) => Some(attack_order(fighter, best)),
            None => anchors
                .spawn_for(enemy_team)
                .map(|cell| Order::MoveTo { cell }),
        }
    }
}

fn living_snapshots<'a>(
    roster: &'a RoundRoster,
    combatants: &'a CombatantView,
    team: Option<Team>,
) -> impl Iterator<Item = CombatantSnapshot> + 'a {
    roster
        .fighters()
        .filter(move |fighter| fighter.is_alive() && team.map_or(true, |team| fighter.team() == team))
        .filter_map(|fighter| fighter.combatant())
        .filter_map(move |id| combatants.get(id).copied())
        .filter(|snapshot| !snapshot.dead)
}

fn nearest(origin: CellCoord, candidates: &[CombatantSnapshot]) -> Option<BestCandidate> {
    let mut best: Option<BestCandidate> = None;
    for candidate in candidates {
        let current = BestCandidate {
            distance_sq: origin.distance_squared(candidate.cell),
            combatant: candidate.id,
        };
        match &mut best {
            Some(existing) => {
                if current.precedes(existing) {
                    *existing = current;
                }
            }
            None => best = Some(current),
        }
    }
    best
}

fn attack_order(fighter: &CombatantSnapshot, target: BestCandidate) -> Order {
    let range = u64::from(fighter.weapon_range);
    if fighter.weapon_range > MELEE_REACH && target.distance_sq <= range * range {
        Order::AttackRanged {
            target: target.combatant,
        }
    } else {
        Order::AttackMelee {
            target: target.combatant,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BestCandidate {
    distance_sq: u64,
    combatant: CombatantId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        (self.distance_sq, self.combatant) < (other.distance_sq, other.combatant)
    }
}
