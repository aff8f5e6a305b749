use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use arena_rounds_core::{
    AnchorKind, ArenaWorld, CellCoord, CombatantId, Command, DefName, Event, ManualTickClock,
    ManualWallClock, MapSize, Team, ThingBlueprint, ThingCategory, ROSTER_SIZE,
};
use arena_rounds_system_round::{
    ArenaStatus, OverrideError, RoundConfig, RoundMachine, RoundState, SetupError,
};
use arena_rounds_system_roster::{
    HolderBatch, HolderFeed, OfflineFeed, RecordingSink, StaticFeed,
};
use arena_rounds_world::{query, World};

const FRAME: Duration = Duration::from_millis(100);
const CORE: CellCoord = CellCoord::new(30, 30);
const SPAWN_A: CellCoord = CellCoord::new(24, 30);
const SPAWN_B: CellCoord = CellCoord::new(36, 30);
const WALL: CellCoord = CellCoord::new(28, 26);

struct Harness {
    world: World,
    ticks: ManualTickClock,
    wall: ManualWallClock,
    sink: RecordingSink,
    machine: RoundMachine<ManualTickClock, ManualWallClock>,
}

fn short_config(seed: u64) -> RoundConfig {
    RoundConfig {
        ticks_per_second: 10,
        cadence_secs: 10.0,
        preview_secs: 2.0,
        combat_secs: 20.0,
        ended_delay_secs: 1.0,
        resetting_delay_secs: 1.0,
        enforce_interval_secs: 0.5,
        seed: Some(seed),
        ..RoundConfig::default()
    }
}

fn arena_world() -> World {
    let mut world = World::new(MapSize::new(60, 60), "Soil");
    for (kind, cell) in [
        (AnchorKind::Core, CORE),
        (AnchorKind::TeamASpawn, SPAWN_A),
        (AnchorKind::TeamBSpawn, SPAWN_B),
    ] {
        let _ = world.place_anchor(kind, cell);
    }
    let _ = world.place_thing(
        WALL,
        ThingBlueprint::new("Wall", ThingCategory::Building, 300).with_stuff("Granite"),
    );
    world
}

fn harness_with(world: World, config: RoundConfig, feed: Box<dyn HolderFeed>) -> Harness {
    let ticks = ManualTickClock::new();
    let wall = ManualWallClock::new();
    let sink = RecordingSink::new();
    let machine = RoundMachine::new(
        config,
        ticks.clone(),
        wall.clone(),
        feed,
        Box::new(sink.clone()),
    )
    .expect("valid config");
    Harness {
        world,
        ticks,
        wall,
        sink,
        machine,
    }
}

fn harness(config: RoundConfig) -> Harness {
    harness_with(arena_world(), config, Box::new(OfflineFeed))
}

impl Harness {
    fn start(&mut self) {
        self.machine.start(&self.world).expect("anchors placed");
    }

    fn status(&self) -> ArenaStatus {
        self.machine.status()
    }

    /// One host frame: a simulation tick when unpaused, a frame update otherwise.
    fn frame(&mut self) {
        self.wall.advance(FRAME);
        if self.world.is_paused() {
            self.machine.update(&mut self.world);
            return;
        }
        let mut events = Vec::new();
        self.world.step(&mut events);
        self.ticks.set(self.world.tick_index());
        self.machine.tick(&mut self.world, &events);
    }

    fn drive_until(&mut self, max_frames: usize, done: impl Fn(&Self) -> bool) {
        for _ in 0..max_frames {
            if done(self) {
                return;
            }
            self.frame();
        }
        assert!(done(self), "condition not reached: {:?}", self.status());
    }

    fn combatants_of(&self, team: Team) -> Vec<CombatantId> {
        self.machine
            .roster()
            .expect("round in flight")
            .team(team)
            .iter()
            .filter_map(|fighter| fighter.combatant())
            .collect()
    }
}

#[test]
fn preview_advances_to_combat_on_wall_time_while_paused() {
    let mut h = harness(RoundConfig::default());
    h.start();
    assert_eq!(h.status().ticks_until_next_round, Some(16_200));

    h.ticks.set(16_200);
    h.machine.tick(&mut h.world, &[]);

    assert_eq!(h.machine.state(), RoundState::Preview);
    assert!(h.world.is_paused());
    assert_eq!(query::combatants(&h.world).len(), ROSTER_SIZE);
    assert_eq!(query::faction_count(&h.world), 2);
    assert!(h.machine.snapshot().is_initialized());
    assert_eq!(h.status().phase_remaining, Some(Duration::from_secs(30)));

    let roster = h.machine.roster().expect("roster built");
    for fighter in roster.fighters() {
        let id = fighter.combatant().expect("spawned");
        assert_eq!(
            query::combatant_label(&h.world, id),
            Some(fighter.identity().short())
        );
    }

    h.wall.advance(Duration::from_secs(29));
    h.machine.update(&mut h.world);
    assert_eq!(h.machine.state(), RoundState::Preview);

    h.wall.advance(Duration::from_secs(2));
    h.machine.update(&mut h.world);
    assert_eq!(h.machine.state(), RoundState::Combat);
    assert!(!h.world.is_paused());
    let status = h.status();
    assert!(status.roster.expect("roster summary").live);
    for combatant in query::combatants(&h.world) {
        assert_eq!(query::is_engaged(&h.world, combatant.id), Some(true));
    }
}

#[test]
fn next_tick_after_preview_forces_combat_and_resumes_the_host() {
    let mut h = harness(RoundConfig::default());
    h.start();
    h.ticks.set(16_200);
    h.machine.tick(&mut h.world, &[]);
    assert_eq!(h.machine.state(), RoundState::Preview);
    assert!(h.world.is_paused());

    h.wall.advance(Duration::from_secs(31));
    h.machine.tick(&mut h.world, &[]);

    assert_eq!(h.machine.state(), RoundState::Combat);
    assert!(!h.world.is_paused());
    assert!(h.status().roster.expect("roster summary").live);
}

#[test]
fn unset_seed_is_drawn_fresh_per_machine() {
    let first = harness(RoundConfig::default());
    let second = harness(RoundConfig::default());
    assert_eq!(first.machine.config().seed, None);
    assert_ne!(first.machine.seed(), second.machine.seed());

    let pinned = harness(short_config(11));
    assert_eq!(pinned.machine.seed(), 11);
}

#[test]
fn full_round_settles_and_restores_the_arena() {
    let mut h = harness(short_config(3));
    h.start();
    assert_eq!(h.status().ticks_until_next_round, Some(80));

    h.drive_until(200, |h| h.machine.state() == RoundState::Combat);
    let wall = query::things_named(&h.world, &DefName::new("Wall"))[0].id;
    let mut events = Vec::new();
    h.world
        .apply(Command::DestroyThing { thing: wall }, &mut events)
        .expect("wall destroyed");
    let _ = h.world.place_thing(
        CellCoord::new(31, 31),
        ThingBlueprint::new("Fire", ThingCategory::Fire, 1),
    );

    h.drive_until(1_000, |h| {
        h.machine.state() == RoundState::Idle && h.status().last_result.is_some()
    });

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.round, 1);
    assert_eq!(report.team_a.len(), 10);
    assert_eq!(report.team_b.len(), 10);
    assert_eq!(report.pool_amount, 0.0);
    assert_eq!(report.payout_fraction, 0.5);

    let status = h.status();
    let summary = status.last_result.expect("summary kept");
    assert_eq!(summary.winner, report.winner);
    assert_eq!(summary.match_id, report.match_id);
    assert!(status.roster.is_none());
    assert!(status.anchor_violation.is_none());
    assert!(status.ticks_until_next_round.is_some());

    assert!(!h.world.is_paused());
    assert!(query::combatants(&h.world).is_empty());
    assert_eq!(query::faction_count(&h.world), 0);
    assert!(query::things_named(&h.world, &DefName::new("Fire")).is_empty());
    assert!(query::things_named(&h.world, &DefName::new("Corpse_Fighter")).is_empty());
    let walls = query::things_named(&h.world, &DefName::new("Wall"));
    assert_eq!(walls.len(), 1);
    assert_eq!(walls[0].cell, WALL);

    let restore = h.machine.last_restore().expect("restore ran");
    assert!(restore.is_clean(), "{restore:?}");
    assert_eq!(restore.things_spawned, 1);
}

#[test]
fn eliminating_a_team_ends_combat_and_credits_kills() {
    let identities = (0..ROSTER_SIZE)
        .map(|index| format!("Holder{index:02}xxxxxxxxxxxxxxxxxxxx"))
        .collect();
    let feed = StaticFeed::new(HolderBatch {
        identities,
        pool_amount: 1_000.0,
        payout_fraction: 0.5,
    });
    let mut h = harness_with(arena_world(), short_config(9), Box::new(feed));
    h.start();
    h.machine.force_next_round(&mut h.world).expect("idle");
    h.machine.force_skip_preview(&mut h.world).expect("preview");

    let killer = h.combatants_of(Team::A)[0];
    let mut events = Vec::new();
    for victim in h.combatants_of(Team::B) {
        h.world
            .kill_combatant(victim, Some(killer), &mut events)
            .expect("victim present");
    }
    h.machine.tick(&mut h.world, &events);

    assert_eq!(h.machine.state(), RoundState::Ended);
    let summary = h.status().last_result.expect("decided");
    assert_eq!(summary.winner, Team::A);
    assert_eq!(summary.team_a.alive, 10);
    assert_eq!(summary.team_a.kills, 10);
    assert_eq!(summary.team_b.alive, 0);

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].winner, Team::A);
    assert_eq!(reports[0].team_a[0].identity, "Holder00xxxxxxxxxxxxxxxxxxxx");
    assert_eq!(reports[0].team_a[0].kills, 10);
    assert!(reports[0].team_b.iter().all(|fighter| !fighter.alive));
    assert_eq!(reports[0].payout_per_winner, 50.0);

    h.wall.advance(Duration::from_secs(1));
    h.machine.update(&mut h.world);
    assert_eq!(h.machine.state(), RoundState::Resetting);
    assert!(query::combatants(&h.world).is_empty());
    assert!(query::things_named(&h.world, &DefName::new("Corpse_Fighter")).is_empty());

    h.wall.advance(Duration::from_secs(1));
    h.machine.update(&mut h.world);
    assert_eq!(h.machine.state(), RoundState::Idle);
}

#[test]
fn stop_mid_round_tears_down_and_restores() {
    let mut h = harness(short_config(1));
    h.start();
    h.machine.force_next_round(&mut h.world).expect("idle");
    assert!(h.world.is_paused());
    let _ = h.world.place_thing(
        CellCoord::new(25, 25),
        ThingBlueprint::new("Filth_Blood", ThingCategory::Filth, 1),
    );

    h.machine.stop(&mut h.world);

    let status = h.status();
    assert_eq!(status.state, RoundState::Idle);
    assert!(!status.armed);
    assert!(status.snapshot_captured);
    assert_eq!(status.ticks_until_next_round, None);
    assert!(!h.world.is_paused());
    assert!(query::combatants(&h.world).is_empty());
    assert_eq!(query::faction_count(&h.world), 0);
    assert!(query::things_named(&h.world, &DefName::new("Filth_Blood")).is_empty());
    assert!(h.sink.is_empty());

    h.machine.disarm(&mut h.world);
    assert!(!h.status().snapshot_captured);
    assert!(!h.machine.snapshot().is_initialized());
}

#[test]
fn start_refuses_missing_or_duplicated_anchors() {
    let mut world = World::new(MapSize::new(60, 60), "Soil");
    let _ = world.place_anchor(AnchorKind::Core, CORE);
    let _ = world.place_anchor(AnchorKind::TeamASpawn, SPAWN_A);
    let mut h = harness_with(world, short_config(0), Box::new(OfflineFeed));

    assert_eq!(
        h.machine.start(&h.world),
        Err(SetupError::MissingAnchor {
            kind: AnchorKind::TeamBSpawn
        })
    );
    let status = h.status();
    assert!(!status.armed);
    assert!(status.setup_error.is_some());

    let _ = h.world.place_anchor(AnchorKind::TeamBSpawn, SPAWN_B);
    let _ = h.world.place_anchor(AnchorKind::TeamBSpawn, CellCoord::new(40, 30));
    assert_eq!(
        h.machine.start(&h.world),
        Err(SetupError::DuplicateAnchor {
            kind: AnchorKind::TeamBSpawn,
            count: 2
        })
    );
}

#[test]
fn unmarked_structures_are_found_by_name() {
    let mut world = World::new(MapSize::new(60, 60), "Soil");
    for (kind, cell) in [
        (AnchorKind::Core, CORE),
        (AnchorKind::TeamASpawn, SPAWN_A),
        (AnchorKind::TeamBSpawn, SPAWN_B),
    ] {
        let _ = world.place_thing(
            cell,
            ThingBlueprint::new(kind.def_name(), ThingCategory::Building, 1_000),
        );
    }
    let mut h = harness_with(world, short_config(0), Box::new(OfflineFeed));
    h.start();

    let status = h.status();
    assert!(status.armed);
    assert!(status.setup_error.is_none());
    let bounds = status.bounds.expect("bounds resolved");
    assert!(bounds.contains(CORE) && bounds.contains(SPAWN_A) && bounds.contains(SPAWN_B));
}

#[test]
fn vanished_anchor_skips_the_round() {
    let mut h = harness(short_config(0));
    h.start();
    let spawn = query::things_named(&h.world, &DefName::new("ArenaSpawnTeamB"))[0].id;
    let mut events = Vec::new();
    h.world
        .apply(Command::DestroyThing { thing: spawn }, &mut events)
        .expect("spawn destroyed");

    h.machine.force_next_round(&mut h.world).expect("idle");

    let status = h.status();
    assert_eq!(status.state, RoundState::Idle);
    assert_eq!(
        status.setup_error,
        Some(SetupError::MissingAnchor {
            kind: AnchorKind::TeamBSpawn
        })
    );
    assert_eq!(status.round_number, 0);
    assert!(status.ticks_until_next_round.is_some());
    assert!(query::combatants(&h.world).is_empty());
}

#[test]
fn overrides_are_rejected_outside_their_state() {
    let mut h = harness(short_config(0));
    assert_eq!(
        h.machine.force_next_round(&mut h.world),
        Err(OverrideError::NotArmed)
    );

    h.start();
    assert_eq!(
        h.machine.force_skip_preview(&mut h.world),
        Err(OverrideError::WrongState {
            action: "force_skip_preview",
            expected: RoundState::Preview,
            actual: RoundState::Idle,
        })
    );
    assert!(matches!(
        h.machine.force_end_combat(&mut h.world),
        Err(OverrideError::WrongState { .. })
    ));

    h.machine.force_next_round(&mut h.world).expect("idle");
    assert!(matches!(
        h.machine.force_next_round(&mut h.world),
        Err(OverrideError::WrongState {
            actual: RoundState::Preview,
            ..
        })
    ));
    h.machine.force_skip_preview(&mut h.world).expect("preview");
    assert!(!h.world.is_paused());

    h.machine.force_end_combat(&mut h.world).expect("combat");
    assert_eq!(h.machine.state(), RoundState::Resetting);
    assert_eq!(h.sink.len(), 1);
    assert!(query::combatants(&h.world).is_empty());
}

fn replay_fingerprint(seed: u64, rounds: usize) -> u64 {
    let mut h = harness(short_config(seed));
    h.start();
    h.drive_until(5_000, |h| {
        h.sink.len() >= rounds && h.machine.state() == RoundState::Idle
    });

    let mut hasher = DefaultHasher::new();
    for report in h.sink.reports() {
        report.match_id.hash(&mut hasher);
        report.round.hash(&mut hasher);
        report.winner.hash(&mut hasher);
        for fighter in report.team_a.iter().chain(report.team_b.iter()) {
            fighter.identity.hash(&mut hasher);
            fighter.kills.hash(&mut hasher);
            fighter.alive.hash(&mut hasher);
        }
    }
    h.world.tick_index().hash(&mut hasher);
    query::things(&h.world).len().hash(&mut hasher);
    hasher.finish()
}

#[test]
fn replaying_the_same_seed_is_deterministic() {
    let first = replay_fingerprint(7, 2);
    let second = replay_fingerprint(7, 2);
    assert_eq!(first, second);
    assert_ne!(first, replay_fingerprint(8, 2));
}

#[test]
fn kills_outside_combat_are_ignored() {
    let mut h = harness(short_config(0));
    h.start();
    h.machine.force_next_round(&mut h.world).expect("idle");
    let victim = h.combatants_of(Team::B)[0];
    let events = vec![Event::CombatantDied {
        victim,
        killer: None,
    }];

    h.machine.tick(&mut h.world, &events);

    let roster = h.machine.roster().expect("roster");
    assert_eq!(roster.alive_count(Team::B), 10);
}
