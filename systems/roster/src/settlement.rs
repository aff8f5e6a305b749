//! Results handed to the settlement collaborator after each round.

use std::{cell::RefCell, rc::Rc};

use arena_rounds_core::Team;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{payout_per_winner, Fighter, MatchId, RoundRoster};

/// Final state of a single fighter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterResult {
    /// Full wallet identity.
    pub identity: String,
    /// Kills credited during the round.
    pub kills: u32,
    /// Whether the fighter survived.
    pub alive: bool,
}

impl From<&Fighter> for FighterResult {
    fn from(fighter: &Fighter) -> Self {
        Self {
            identity: fighter.identity().full().to_owned(),
            kills: fighter.kills(),
            alive: fighter.is_alive(),
        }
    }
}

/// Outcome of a decided round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Identifier of the round.
    pub match_id: MatchId,
    /// Sequential round number.
    pub round: u64,
    /// Moment the winner was decided.
    pub timestamp: DateTime<Utc>,
    /// Winning team.
    pub winner: Team,
    /// Final state of team A in slot order.
    pub team_a: Vec<FighterResult>,
    /// Final state of team B in slot order.
    pub team_b: Vec<FighterResult>,
    /// Reward pool advertised for the round.
    pub pool_amount: f64,
    /// Fraction of the pool paid to the winners.
    pub payout_fraction: f64,
    /// Display share of the pool for each winner.
    pub payout_per_winner: f64,
}

impl SettlementReport {
    /// Builds a report for a decided roster; `None` while no winner exists.
    #[must_use]
    pub fn from_roster(roster: &RoundRoster, round: u64, timestamp: DateTime<Utc>) -> Option<Self> {
        let winner = roster.winner()?;
        Some(Self {
            match_id: roster.match_id(),
            round,
            timestamp,
            winner,
            team_a: roster.team(Team::A).iter().map(FighterResult::from).collect(),
            team_b: roster.team(Team::B).iter().map(FighterResult::from).collect(),
            pool_amount: roster.pool_amount(),
            payout_fraction: roster.payout_fraction(),
            payout_per_winner: payout_per_winner(roster.pool_amount(), roster.payout_fraction()),
        })
    }
}

/// Receives settlement reports; delivery is fire-and-forget.
pub trait SettlementSink {
    /// Hands a report to the collaborator.
    fn submit(&mut self, report: SettlementReport);
}

impl<F> SettlementSink for F
where
    F: FnMut(SettlementReport),
{
    fn submit(&mut self, report: SettlementReport) {
        self(report);
    }
}

/// Sink that keeps every report in memory; clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    reports: Rc<RefCell<Vec<SettlementReport>>>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every report submitted so far.
    #[must_use]
    pub fn reports(&self) -> Vec<SettlementReport> {
        self.reports.borrow().clone()
    }

    /// Number of reports submitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    /// Reports whether nothing was submitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl SettlementSink for RecordingSink {
    fn submit(&mut self, report: SettlementReport) {
        self.reports.borrow_mut().push(report);
    }
}
