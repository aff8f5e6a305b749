#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round orchestrator driving the arena through its lifecycle.
//!
//! [`RoundMachine`] owns every piece of per-arena state: the captured
//! baseline, the current roster, the phase and the schedule. The host calls
//! [`RoundMachine::tick`] once per simulation tick and [`RoundMachine::update`]
//! once per frame; the latter only performs wall-clock transitions, which is
//! how the preview advances while the simulation is paused.

mod config;
mod setup;
mod status;

use std::time::Duration;

use arena_rounds_core::{
    AnchorTriad, ArenaBounds, ArenaWorld, CombatantView, Command, Event, FactionId, Team,
    TickClock, WallClock,
};
use arena_rounds_system_bounds::BoundsCache;
use arena_rounds_system_combat_enforcer::CombatEnforcer;
use arena_rounds_system_restorer::{RestoreReport, WorldRestorer};
use arena_rounds_system_roster::{
    build_roster, determine_winner, resolve_identities, HolderFeed, KillAttribution, MatchId,
    RoundRoster, SettlementReport, SettlementSink,
};
use arena_rounds_system_snapshot::WorldSnapshot;
use chrono::Utc;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

pub use config::{ConfigError, RoundConfig};
pub use setup::{locate_anchors, next_round_tick, SetupError};
pub use status::{
    ArenaStatus, OverrideError, RosterSummary, RoundState, RoundSummary, TeamTally,
};

/// Orchestrates rounds for a single arena.
pub struct RoundMachine<T, C> {
    config: RoundConfig,
    tick_clock: T,
    wall_clock: C,
    feed: Box<dyn HolderFeed>,
    sink: Box<dyn SettlementSink>,
    rng: ChaCha8Rng,
    seed: u64,
    state: RoundState,
    armed: bool,
    anchors: AnchorTriad,
    bounds: BoundsCache,
    snapshot: WorldSnapshot,
    roster: Option<RoundRoster>,
    factions: Vec<FactionId>,
    phase_started: Duration,
    next_round_tick: Option<u64>,
    last_enforce_tick: u64,
    round_number: u64,
    last_result: Option<RoundSummary>,
    last_restore: Option<RestoreReport>,
    setup_error: Option<SetupError>,
    enforcer: CombatEnforcer,
    restorer: WorldRestorer,
    kills: KillAttribution,
    commands: Vec<Command>,
    events: Vec<Event>,
}

impl<T, C> RoundMachine<T, C>
where
    T: TickClock,
    C: WallClock,
{
    /// Creates an idle, unarmed orchestrator.
    pub fn new(
        config: RoundConfig,
        tick_clock: T,
        wall_clock: C,
        feed: Box<dyn HolderFeed>,
        sink: Box<dyn SettlementSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let restorer = WorldRestorer::new(config.protection.clone());
        let seed = config.seed.unwrap_or_else(|| ChaCha8Rng::from_entropy().next_u64());
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            config,
            tick_clock,
            wall_clock,
            feed,
            sink,
            state: RoundState::Idle,
            armed: false,
            anchors: AnchorTriad::default(),
            bounds: BoundsCache::new(),
            snapshot: WorldSnapshot::new(),
            roster: None,
            factions: Vec::new(),
            phase_started: Duration::ZERO,
            next_round_tick: None,
            last_enforce_tick: 0,
            round_number: 0,
            last_result: None,
            last_restore: None,
            setup_error: None,
            enforcer: CombatEnforcer::new(),
            restorer,
            kills: KillAttribution::new(),
            commands: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Arms the arena and schedules the first round.
    ///
    /// Fails without arming when the anchors are missing, duplicated or do
    /// not produce a region on this map. Starting an armed arena is a no-op.
    pub fn start<W>(&mut self, world: &W) -> Result<(), SetupError>
    where
        W: ArenaWorld + ?Sized,
    {
        if self.armed {
            debug!("arena already armed");
            return Ok(());
        }

        if let Err(error) = self.refresh_anchors(world) {
            warn!(%error, "arena refused to start");
            self.setup_error = Some(error.clone());
            return Err(error);
        }

        self.armed = true;
        self.state = RoundState::Idle;
        self.schedule_next_round();
        info!(
            next_round_tick = ?self.next_round_tick,
            bounds = ?self.bounds.current(),
            "arena armed"
        );
        Ok(())
    }

    /// Tears down any round in flight, restores the region and cancels the schedule.
    ///
    /// The captured baseline is kept so a later start reuses it.
    pub fn stop<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        let in_flight = self.state != RoundState::Idle;
        if world.is_paused() {
            self.commands.push(Command::ResumeSimulation);
        }
        self.teardown_round(world);
        if in_flight {
            self.restore_region(world);
        }

        self.roster = None;
        self.state = RoundState::Idle;
        self.next_round_tick = None;
        self.armed = false;
        info!(in_flight, "arena stopped");
    }

    /// Stops the arena and forgets the captured baseline.
    pub fn disarm<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        self.stop(world);
        self.snapshot.clear();
        self.bounds.invalidate();
        info!("arena disarmed");
    }

    /// Advances the machine by one simulation tick.
    ///
    /// `events` are the world events produced since the previous call; deaths
    /// among them are attributed to the live roster.
    pub fn tick<W>(&mut self, world: &mut W, events: &[Event])
    where
        W: ArenaWorld + ?Sized,
    {
        if let Some(roster) = self.roster.as_mut().filter(|roster| roster.is_live()) {
            let _ = self.kills.observe(events, roster);
        }
        if !self.armed {
            return;
        }

        let now = self.tick_clock.ticks();
        match self.state {
            RoundState::Idle => {
                if self.next_round_tick.is_some_and(|tick| now >= tick) {
                    self.enter_preview(world);
                }
            }
            RoundState::Combat => {
                if now.saturating_sub(self.last_enforce_tick) >= self.config.enforce_interval_ticks()
                {
                    self.last_enforce_tick = now;
                    self.enforce(world);
                }
                if self.team_eliminated() {
                    self.enter_ended("team eliminated");
                }
            }
            RoundState::Preview | RoundState::Ended | RoundState::Resetting => {}
        }

        self.advance_phases(world);
    }

    /// Performs wall-clock phase transitions; safe to call every frame.
    pub fn update<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        if self.armed {
            self.advance_phases(world);
        }
    }

    /// Starts the next round immediately instead of waiting for the schedule.
    pub fn force_next_round<W>(&mut self, world: &mut W) -> Result<(), OverrideError>
    where
        W: ArenaWorld + ?Sized,
    {
        self.require("force_next_round", RoundState::Idle)?;
        self.enter_preview(world);
        Ok(())
    }

    /// Ends the preview and starts combat immediately.
    pub fn force_skip_preview<W>(&mut self, world: &mut W) -> Result<(), OverrideError>
    where
        W: ArenaWorld + ?Sized,
    {
        self.require("force_skip_preview", RoundState::Preview)?;
        self.enter_combat(world);
        Ok(())
    }

    /// Decides the winner now and moves straight to resetting.
    pub fn force_end_combat<W>(&mut self, world: &mut W) -> Result<(), OverrideError>
    where
        W: ArenaWorld + ?Sized,
    {
        self.require("force_end_combat", RoundState::Combat)?;
        self.enter_ended("forced");
        self.enter_resetting(world);
        Ok(())
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Configuration the machine was built with.
    #[must_use]
    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    /// Seed behind match ids, coin flips and placeholder identities.
    ///
    /// Drawn from OS entropy when the configuration leaves it unset.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Captured baseline of the arena region.
    #[must_use]
    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    /// Roster of the round in flight.
    #[must_use]
    pub fn roster(&self) -> Option<&RoundRoster> {
        self.roster.as_ref()
    }

    /// Report of the most recent restore pass.
    #[must_use]
    pub fn last_restore(&self) -> Option<&RestoreReport> {
        self.last_restore.as_ref()
    }

    /// Read-only summary for operator surfaces.
    #[must_use]
    pub fn status(&self) -> ArenaStatus {
        let phase_length = match self.state {
            RoundState::Idle => None,
            RoundState::Preview => Some(self.config.preview_duration()),
            RoundState::Combat => Some(self.config.combat_duration()),
            RoundState::Ended => Some(self.config.ended_delay()),
            RoundState::Resetting => Some(self.config.resetting_delay()),
        };
        let elapsed = self.wall_clock.now().saturating_sub(self.phase_started);
        let ticks_until_next_round = match (self.armed, self.state) {
            (true, RoundState::Idle) => self
                .next_round_tick
                .map(|tick| tick.saturating_sub(self.tick_clock.ticks())),
            _ => None,
        };

        ArenaStatus {
            state: self.state,
            armed: self.armed,
            round_number: self.round_number,
            phase_remaining: phase_length.map(|length| length.saturating_sub(elapsed)),
            ticks_until_next_round,
            setup_error: self.setup_error.clone(),
            bounds: self.bounds.current(),
            snapshot_captured: self.snapshot.is_initialized(),
            roster: self.roster.as_ref().map(RosterSummary::of),
            last_result: self.last_result,
            anchor_violation: self
                .last_restore
                .as_ref()
                .and_then(|report| report.anchor_violation.clone()),
        }
    }

    fn require(&self, action: &'static str, expected: RoundState) -> Result<(), OverrideError> {
        if !self.armed {
            return Err(OverrideError::NotArmed);
        }
        if self.state != expected {
            return Err(OverrideError::WrongState {
                action,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn refresh_anchors<W>(&mut self, world: &W) -> Result<ArenaBounds, SetupError>
    where
        W: ArenaWorld + ?Sized,
    {
        let anchors = locate_anchors(world)?;
        let bounds = self
            .bounds
            .resolve(&anchors, world.map_size(), &self.config.bounds)
            .ok_or(SetupError::NoRegion)?;
        self.anchors = anchors;
        self.setup_error = None;
        Ok(bounds)
    }

    fn schedule_next_round(&mut self) {
        self.next_round_tick = Some(next_round_tick(
            self.tick_clock.ticks(),
            self.config.cadence_ticks(),
            self.config.preview_ticks(),
        ));
    }

    fn begin_phase(&mut self, state: RoundState) {
        self.state = state;
        self.phase_started = self.wall_clock.now();
    }

    fn advance_phases<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        while self.advance_once(world) {}
    }

    fn advance_once<W>(&mut self, world: &mut W) -> bool
    where
        W: ArenaWorld + ?Sized,
    {
        let elapsed = self.wall_clock.now().saturating_sub(self.phase_started);
        match self.state {
            RoundState::Idle => false,
            RoundState::Preview if elapsed >= self.config.preview_duration() => {
                self.enter_combat(world);
                true
            }
            RoundState::Combat if elapsed >= self.config.combat_duration() => {
                self.enter_ended("time limit");
                true
            }
            RoundState::Ended if elapsed >= self.config.ended_delay() => {
                self.enter_resetting(world);
                true
            }
            RoundState::Resetting if elapsed >= self.config.resetting_delay() => {
                self.finish_round();
                true
            }
            RoundState::Preview
            | RoundState::Combat
            | RoundState::Ended
            | RoundState::Resetting => false,
        }
    }

    fn enter_preview<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        let bounds = match self.refresh_anchors(world) {
            Ok(bounds) => bounds,
            Err(error) => {
                warn!(%error, "skipping round; arena setup is invalid");
                self.setup_error = Some(error);
                self.schedule_next_round();
                return;
            }
        };

        if !self.snapshot.is_initialized() {
            let _ = self.snapshot.capture(bounds, world);
        }

        let round = self.round_number + 1;
        let resolved = resolve_identities(
            &mut *self.feed,
            self.seed,
            round,
            self.config.fallback_payout_fraction,
        );
        let match_id = MatchId::generate(&mut self.rng);
        let mut roster = build_roster(
            match_id,
            resolved.pool_amount,
            resolved.payout_fraction,
            resolved.identities,
        );

        self.events.clear();
        self.commands
            .extend(Team::ALL.into_iter().map(|team| Command::CreateFaction { team }));
        dispatch(world, &mut self.commands, &mut self.events);
        let factions: Vec<(Team, FactionId)> = self
            .events
            .iter()
            .filter_map(|event| match event {
                Event::FactionCreated { team, faction } => Some((*team, *faction)),
                _ => None,
            })
            .collect();
        self.factions = factions.iter().map(|(_, faction)| *faction).collect();

        for (team, faction) in factions {
            let Some(cell) = self.anchors.spawn_for(team) else {
                continue;
            };
            self.commands
                .extend(roster.team(team).iter().map(|fighter| Command::SpawnCombatant {
                    team,
                    faction,
                    slot: fighter.slot(),
                    label: fighter.identity().short().to_owned(),
                    cell,
                }));
        }
        self.events.clear();
        dispatch(world, &mut self.commands, &mut self.events);
        for event in &self.events {
            if let Event::CombatantSpawned {
                team,
                slot,
                combatant,
            } = event
            {
                if let Some(fighter) = roster.fighter_mut(*team, *slot) {
                    fighter.bind_combatant(*combatant);
                }
            }
        }
        self.events.clear();

        if !world.is_paused() {
            self.commands.push(Command::PauseSimulation);
            dispatch(world, &mut self.commands, &mut self.events);
            self.events.clear();
        }

        self.round_number = round;
        self.next_round_tick = None;
        info!(
            round,
            %match_id,
            source = ?resolved.source,
            spawned = roster.fighters().filter(|fighter| fighter.combatant().is_some()).count(),
            "round preview started"
        );
        self.roster = Some(roster);
        self.begin_phase(RoundState::Preview);
    }

    fn enter_combat<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        if world.is_paused() {
            self.commands.push(Command::ResumeSimulation);
        }
        if let Some(roster) = self.roster.as_mut() {
            roster.go_live();
            let view = combatant_view(world, roster);
            self.enforcer
                .engage(roster, &view, &self.anchors, &mut self.commands);
        }
        dispatch(world, &mut self.commands, &mut self.events);
        self.events.clear();

        self.last_enforce_tick = self.tick_clock.ticks();
        info!(round = self.round_number, "combat started");
        self.begin_phase(RoundState::Combat);
    }

    fn enforce<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        let (Some(roster), Some(bounds)) = (self.roster.as_ref(), self.bounds.current()) else {
            return;
        };
        let view = combatant_view(world, roster);
        self.enforcer
            .tick(roster, &view, &bounds, &self.anchors, &mut self.commands);
        dispatch(world, &mut self.commands, &mut self.events);
        self.events.clear();
    }

    fn team_eliminated(&self) -> bool {
        self.roster.as_ref().is_some_and(|roster| {
            Team::ALL
                .into_iter()
                .any(|team| roster.alive_count(team) == 0)
        })
    }

    fn enter_ended(&mut self, reason: &'static str) {
        if let Some(roster) = self.roster.as_mut() {
            let candidate = determine_winner(roster, &mut self.rng);
            let winner = roster.decide(candidate);
            let summary = RoundSummary {
                round: self.round_number,
                match_id: roster.match_id(),
                winner,
                team_a: TeamTally::of(roster, Team::A),
                team_b: TeamTally::of(roster, Team::B),
            };
            info!(
                round = summary.round,
                match_id = %summary.match_id,
                %winner,
                reason,
                alive_a = summary.team_a.alive,
                alive_b = summary.team_b.alive,
                kills_a = summary.team_a.kills,
                kills_b = summary.team_b.kills,
                "round decided"
            );
            if let Some(report) = SettlementReport::from_roster(roster, self.round_number, Utc::now())
            {
                self.sink.submit(report);
            }
            self.last_result = Some(summary);
        }
        self.begin_phase(RoundState::Ended);
    }

    fn enter_resetting<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        self.teardown_round(world);
        self.restore_region(world);
        self.begin_phase(RoundState::Resetting);
    }

    fn finish_round(&mut self) {
        self.roster = None;
        self.state = RoundState::Idle;
        self.schedule_next_round();
        info!(
            round = self.round_number,
            next_round_tick = ?self.next_round_tick,
            "arena idle"
        );
    }

    fn teardown_round<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        if let Some(roster) = self.roster.as_mut() {
            self.commands.extend(
                roster
                    .fighters_mut()
                    .filter_map(|fighter| fighter.release_combatant())
                    .map(|combatant| Command::DespawnCombatant { combatant }),
            );
        }
        self.commands.extend(
            self.factions
                .drain(..)
                .map(|faction| Command::RemoveFaction { faction }),
        );
        dispatch(world, &mut self.commands, &mut self.events);
        self.events.clear();
    }

    fn restore_region<W>(&mut self, world: &mut W)
    where
        W: ArenaWorld + ?Sized,
    {
        let Some(bounds) = self.bounds.current() else {
            return;
        };
        if !self.snapshot.is_initialized() {
            debug!("no baseline captured; skipping restore");
            return;
        }
        let report = self
            .restorer
            .reset_region(world, &bounds, &self.snapshot, &self.anchors);
        self.last_restore = Some(report);
    }
}

/// Applies queued commands in order, logging the ones the world rejects.
fn dispatch<W>(world: &mut W, commands: &mut Vec<Command>, events: &mut Vec<Event>)
where
    W: ArenaWorld + ?Sized,
{
    for command in commands.drain(..) {
        let label = command_label(&command);
        if let Err(error) = world.apply(command, events) {
            warn!(command = label, %error, "world rejected arena command");
        }
    }
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::SetTerrain { .. } => "set_terrain",
        Command::SetRoof { .. } => "set_roof",
        Command::SetGroundCover { .. } => "set_ground_cover",
        Command::ClearDesignations { .. } => "clear_designations",
        Command::DestroyThing { .. } => "destroy_thing",
        Command::SpawnThing { .. } => "spawn_thing",
        Command::HealThing { .. } => "heal_thing",
        Command::PauseSimulation => "pause_simulation",
        Command::ResumeSimulation => "resume_simulation",
        Command::CreateFaction { .. } => "create_faction",
        Command::RemoveFaction { .. } => "remove_faction",
        Command::SpawnCombatant { .. } => "spawn_combatant",
        Command::DespawnCombatant { .. } => "despawn_combatant",
        Command::ForceEngaged { .. } => "force_engaged",
        Command::IssueOrder { .. } => "issue_order",
    }
}

fn combatant_view<W>(world: &W, roster: &RoundRoster) -> CombatantView
where
    W: ArenaWorld + ?Sized,
{
    CombatantView::from_snapshots(
        roster
            .fighters()
            .filter_map(|fighter| fighter.combatant())
            .filter_map(|id| world.combatant(id))
            .collect(),
    )
}
