//! Read-only view of the orchestrator for operators and overlays.

use std::{fmt, time::Duration};

use arena_rounds_core::{ArenaBounds, Team};
use arena_rounds_system_restorer::AnchorViolation;
use arena_rounds_system_roster::{MatchId, RoundRoster};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SetupError;

/// Phase of the round lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundState {
    /// Waiting for the next scheduled round.
    Idle,
    /// Fighters are spawned and shown while the simulation is paused.
    Preview,
    /// Fighters are fighting.
    Combat,
    /// A winner has been decided and is displayed.
    Ended,
    /// The arena has been cleaned and is about to return to idle.
    Resetting,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundState::Idle => "idle",
            RoundState::Preview => "preview",
            RoundState::Combat => "combat",
            RoundState::Ended => "ended",
            RoundState::Resetting => "resetting",
        };
        f.write_str(name)
    }
}

/// Manual override requested in a state that does not accept it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OverrideError {
    /// The arena has not been started.
    #[error("arena is not armed")]
    NotArmed,
    /// The override does not apply to the current state.
    #[error("{action} is only valid in {expected}, current state is {actual}")]
    WrongState {
        /// Override that was requested.
        action: &'static str,
        /// State the override requires.
        expected: RoundState,
        /// State the arena is in.
        actual: RoundState,
    },
}

/// Counts describing a team at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTally {
    /// Living fighters.
    pub alive: usize,
    /// Kills credited to the team.
    pub kills: u32,
}

impl TeamTally {
    pub(crate) fn of(roster: &RoundRoster, team: Team) -> Self {
        Self {
            alive: roster.alive_count(team),
            kills: roster.kill_sum(team),
        }
    }
}

/// Live state of the current roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSummary {
    /// Identifier of the round.
    pub match_id: MatchId,
    /// Whether combat is in progress.
    pub live: bool,
    /// Team A counts.
    pub team_a: TeamTally,
    /// Team B counts.
    pub team_b: TeamTally,
}

impl RosterSummary {
    pub(crate) fn of(roster: &RoundRoster) -> Self {
        Self {
            match_id: roster.match_id(),
            live: roster.is_live(),
            team_a: TeamTally::of(roster, Team::A),
            team_b: TeamTally::of(roster, Team::B),
        }
    }
}

/// Outcome of the most recently decided round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Sequential round number.
    pub round: u64,
    /// Identifier of the round.
    pub match_id: MatchId,
    /// Winning team.
    pub winner: Team,
    /// Team A counts when the winner was decided.
    pub team_a: TeamTally,
    /// Team B counts when the winner was decided.
    pub team_b: TeamTally,
}

/// Snapshot of the orchestrator polled by operator surfaces.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaStatus {
    /// Current phase.
    pub state: RoundState,
    /// Whether the arena has been started.
    pub armed: bool,
    /// Rounds started since the orchestrator was created.
    pub round_number: u64,
    /// Wall time left in the current phase; `None` while idle.
    pub phase_remaining: Option<Duration>,
    /// Simulation ticks until the next preview; `None` unless idle and armed.
    pub ticks_until_next_round: Option<u64>,
    /// Last setup problem, if the arena could not start or refresh its anchors.
    pub setup_error: Option<SetupError>,
    /// Arena rectangle currently in use.
    pub bounds: Option<ArenaBounds>,
    /// Whether a baseline has been captured.
    pub snapshot_captured: bool,
    /// State of the current roster.
    pub roster: Option<RosterSummary>,
    /// Outcome of the most recent round.
    pub last_result: Option<RoundSummary>,
    /// Anchor problem detected by the latest restore pass.
    pub anchor_violation: Option<AnchorViolation>,
}
