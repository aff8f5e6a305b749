#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Team rosters, winner determination and the identity feed for each round.

mod feed;
mod settlement;

use std::fmt;

use arena_rounds_core::{CombatantId, Event, Team, ROSTER_SIZE, TEAM_SIZE};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub use feed::{
    placeholder_identities, resolve_identities, FeedError, HolderBatch, HolderFeed, IdentitySource,
    OfflineFeed, ResolvedIdentities, StaticFeed,
};
pub use settlement::{FighterResult, RecordingSink, SettlementReport, SettlementSink};

const SHORT_EDGE: usize = 4;

/// Wallet identity in full and shortened display form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletIdentity {
    full: String,
    short: String,
}

impl WalletIdentity {
    /// Wraps a full identity and derives its `abcd...wxyz` display form.
    #[must_use]
    pub fn new(full: impl Into<String>) -> Self {
        let full = full.into();
        let chars: Vec<char> = full.chars().collect();
        let short = if chars.len() > SHORT_EDGE * 2 {
            let head: String = chars[..SHORT_EDGE].iter().collect();
            let tail: String = chars[chars.len() - SHORT_EDGE..].iter().collect();
            format!("{head}...{tail}")
        } else {
            full.clone()
        };
        Self { full, short }
    }

    /// Complete identity string.
    #[must_use]
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Shortened identity shown above the combatant.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.short
    }
}

/// Unique identifier of a single round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(Uuid);

impl MatchId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn new(value: Uuid) -> Self {
        Self(value)
    }

    /// Generates a random match identifier from the provided source.
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: RngCore + ?Sized,
    {
        let mut bytes = [0_u8; 16];
        rng.fill_bytes(&mut bytes);
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn get(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Participant of a round bound to a wallet identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fighter {
    identity: WalletIdentity,
    team: Team,
    slot: usize,
    combatant: Option<CombatantId>,
    kills: u32,
    alive: bool,
}

impl Fighter {
    fn new(identity: WalletIdentity, team: Team, slot: usize) -> Self {
        Self {
            identity,
            team,
            slot,
            combatant: None,
            kills: 0,
            alive: true,
        }
    }

    /// Wallet identity the fighter represents.
    #[must_use]
    pub fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    /// Team the fighter belongs to.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Position within the team roster.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Handle of the fighter's in-world combatant, once spawned.
    #[must_use]
    pub const fn combatant(&self) -> Option<CombatantId> {
        self.combatant
    }

    /// Number of kills credited to the fighter.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Whether the fighter is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Binds the fighter to its spawned combatant.
    pub fn bind_combatant(&mut self, combatant: CombatantId) {
        self.combatant = Some(combatant);
    }

    /// Forgets the combatant handle after it has been despawned.
    pub fn release_combatant(&mut self) -> Option<CombatantId> {
        self.combatant.take()
    }

    fn mark_dead(&mut self) -> bool {
        let was_alive = self.alive;
        self.alive = false;
        was_alive
    }
}

/// Two fixed-size teams competing in one round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundRoster {
    match_id: MatchId,
    team_a: Vec<Fighter>,
    team_b: Vec<Fighter>,
    pool_amount: f64,
    payout_fraction: f64,
    live: bool,
    winner: Option<Team>,
}

impl RoundRoster {
    /// Identifier of the round.
    #[must_use]
    pub const fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Fighters of the requested team in slot order.
    #[must_use]
    pub fn team(&self, team: Team) -> &[Fighter] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    /// Every fighter, team A first.
    pub fn fighters(&self) -> impl Iterator<Item = &Fighter> {
        self.team_a.iter().chain(self.team_b.iter())
    }

    /// Mutable access to every fighter, team A first.
    pub fn fighters_mut(&mut self) -> impl Iterator<Item = &mut Fighter> {
        self.team_a.iter_mut().chain(self.team_b.iter_mut())
    }

    /// Mutable access to the fighter occupying a roster slot.
    pub fn fighter_mut(&mut self, team: Team, slot: usize) -> Option<&mut Fighter> {
        match team {
            Team::A => self.team_a.get_mut(slot),
            Team::B => self.team_b.get_mut(slot),
        }
    }

    /// Fighter controlling the provided combatant.
    #[must_use]
    pub fn fighter_by_combatant(&self, combatant: CombatantId) -> Option<&Fighter> {
        self.fighters()
            .find(|fighter| fighter.combatant == Some(combatant))
    }

    fn fighter_by_combatant_mut(&mut self, combatant: CombatantId) -> Option<&mut Fighter> {
        self.fighters_mut()
            .find(|fighter| fighter.combatant == Some(combatant))
    }

    /// Number of living fighters on a team.
    #[must_use]
    pub fn alive_count(&self, team: Team) -> usize {
        self.team(team).iter().filter(|fighter| fighter.alive).count()
    }

    /// Total kills credited to a team.
    #[must_use]
    pub fn kill_sum(&self, team: Team) -> u32 {
        self.team(team).iter().map(|fighter| fighter.kills).sum()
    }

    /// Reward pool advertised for the round.
    #[must_use]
    pub const fn pool_amount(&self) -> f64 {
        self.pool_amount
    }

    /// Fraction of the pool paid out to the winners.
    #[must_use]
    pub const fn payout_fraction(&self) -> f64 {
        self.payout_fraction
    }

    /// Whether combat is in progress for this roster.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }

    /// Marks combat as started; ignored once a winner is decided.
    pub fn go_live(&mut self) {
        if self.winner.is_none() {
            self.live = true;
        }
    }

    /// Winner, once decided.
    #[must_use]
    pub const fn winner(&self) -> Option<Team> {
        self.winner
    }

    /// Records the winner and freezes the roster; the first decision sticks.
    pub fn decide(&mut self, winner: Team) -> Team {
        self.live = false;
        *self.winner.get_or_insert(winner)
    }
}

/// Splits twenty identities into two teams of ten.
///
/// The first half of `identities` becomes [`Team::A`] and the second half
/// becomes [`Team::B`], preserving order.
#[must_use]
pub fn build_roster(
    match_id: MatchId,
    pool_amount: f64,
    payout_fraction: f64,
    identities: [WalletIdentity; ROSTER_SIZE],
) -> RoundRoster {
    let mut team_a = Vec::with_capacity(TEAM_SIZE);
    let mut team_b = Vec::with_capacity(TEAM_SIZE);
    for (index, identity) in identities.into_iter().enumerate() {
        if index < TEAM_SIZE {
            team_a.push(Fighter::new(identity, Team::A, index));
        } else {
            team_b.push(Fighter::new(identity, Team::B, index - TEAM_SIZE));
        }
    }

    RoundRoster {
        match_id,
        team_a,
        team_b,
        pool_amount,
        payout_fraction,
        live: false,
        winner: None,
    }
}

/// Picks the winning team.
///
/// More survivors wins; equal survivors fall back to the higher kill total;
/// a full tie is settled by a fair coin flip drawn from `rng`.
pub fn determine_winner<R>(roster: &RoundRoster, rng: &mut R) -> Team
where
    R: Rng + ?Sized,
{
    let alive_a = roster.alive_count(Team::A);
    let alive_b = roster.alive_count(Team::B);
    if alive_a != alive_b {
        return if alive_a > alive_b { Team::A } else { Team::B };
    }

    let kills_a = roster.kill_sum(Team::A);
    let kills_b = roster.kill_sum(Team::B);
    if kills_a != kills_b {
        return if kills_a > kills_b { Team::A } else { Team::B };
    }

    if rng.gen_bool(0.5) {
        Team::A
    } else {
        Team::B
    }
}

/// Display share of the pool paid to each member of the winning team.
#[must_use]
pub fn payout_per_winner(pool_amount: f64, payout_fraction: f64) -> f64 {
    pool_amount * payout_fraction / TEAM_SIZE as f64
}

/// Applies combatant deaths reported by the world to a roster.
#[derive(Debug, Default)]
pub struct KillAttribution;

impl KillAttribution {
    /// Creates a new kill attribution observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Processes every death in `events` and returns how many fighters died.
    ///
    /// A victim's alive flag flips at most once; the killer is credited only
    /// for that first flip, so duplicated events never double count.
    pub fn observe(&self, events: &[Event], roster: &mut RoundRoster) -> usize {
        let mut deaths = 0;
        for event in events {
            let Event::CombatantDied { victim, killer } = event else {
                continue;
            };
            let Some(fighter) = roster.fighter_by_combatant_mut(*victim) else {
                continue;
            };
            if !fighter.mark_dead() {
                continue;
            }
            deaths += 1;
            let victim_team = fighter.team;

            let Some(killer) = killer.filter(|killer| killer != victim) else {
                continue;
            };
            if let Some(credited) = roster.fighter_by_combatant_mut(killer) {
                if credited.team != victim_team {
                    credited.kills += 1;
                }
                debug!(
                    killer = credited.identity.short(),
                    kills = credited.kills,
                    "kill attributed"
                );
            }
        }
        deaths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn identities() -> [WalletIdentity; ROSTER_SIZE] {
        std::array::from_fn(|index| WalletIdentity::new(format!("Wallet{index:02}abcdefghijkl")))
    }

    fn roster() -> RoundRoster {
        let mut roster = build_roster(MatchId::new(Uuid::nil()), 100.0, 0.5, identities());
        for (index, fighter) in roster.fighters_mut().enumerate() {
            fighter.bind_combatant(CombatantId::new(index as u32 + 1));
        }
        roster
    }

    fn kill(roster: &mut RoundRoster, team: Team, count: usize) {
        for fighter in roster
            .fighters_mut()
            .filter(|fighter| fighter.team == team)
            .take(count)
        {
            let _ = fighter.mark_dead();
        }
    }

    #[test]
    fn short_identity_keeps_both_edges() {
        let identity = WalletIdentity::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(identity.short(), "7xKX...gAsU");
        assert_eq!(WalletIdentity::new("tiny").short(), "tiny");
    }

    #[test]
    fn roster_splits_identities_in_order() {
        let roster = roster();
        assert_eq!(roster.team(Team::A).len(), TEAM_SIZE);
        assert_eq!(roster.team(Team::B).len(), TEAM_SIZE);
        assert_eq!(
            roster.team(Team::A)[0].identity().full(),
            "Wallet00abcdefghijkl"
        );
        assert_eq!(
            roster.team(Team::B)[0].identity().full(),
            "Wallet10abcdefghijkl"
        );
        assert_eq!(roster.team(Team::B)[9].slot(), 9);
        assert!(!roster.is_live());
        assert_eq!(roster.alive_count(Team::A), TEAM_SIZE);
    }

    #[test]
    fn survivors_decide_the_winner() {
        let mut roster = roster();
        kill(&mut roster, Team::A, 7);
        kill(&mut roster, Team::B, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(roster.alive_count(Team::A), 3);
        assert_eq!(determine_winner(&roster, &mut rng), Team::A);
    }

    #[test]
    fn kills_break_survivor_ties() {
        let mut roster = roster();
        kill(&mut roster, Team::A, 8);
        kill(&mut roster, Team::B, 8);
        roster.team_b[9].kills = 3;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(determine_winner(&roster, &mut rng), Team::B);
    }

    #[test]
    fn full_ties_are_decided_by_coin_flip() {
        let mut roster = roster();
        kill(&mut roster, Team::A, 8);
        kill(&mut roster, Team::B, 8);
        roster.team_a[9].kills = 5;
        roster.team_b[9].kills = 5;

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..64 {
            match determine_winner(&roster, &mut rng) {
                Team::A => seen_a = true,
                Team::B => seen_b = true,
            }
        }
        assert!(seen_a && seen_b, "coin flip must be able to pick either team");
    }

    #[test]
    fn decision_freezes_roster() {
        let mut roster = roster();
        roster.go_live();
        assert!(roster.is_live());
        assert_eq!(roster.decide(Team::B), Team::B);
        assert!(!roster.is_live());
        assert_eq!(roster.decide(Team::A), Team::B);
        roster.go_live();
        assert!(!roster.is_live());
    }

    #[test]
    fn kill_attribution_counts_each_death_once() {
        let mut roster = roster();
        let victim = roster.team(Team::B)[0].combatant().expect("bound");
        let killer = roster.team(Team::A)[3].combatant().expect("bound");
        let events = vec![
            Event::CombatantDied {
                victim,
                killer: Some(killer),
            },
            Event::CombatantDied {
                victim,
                killer: Some(killer),
            },
            Event::SimulationResumed,
        ];

        let deaths = KillAttribution::new().observe(&events, &mut roster);

        assert_eq!(deaths, 1);
        assert!(!roster.team(Team::B)[0].is_alive());
        assert_eq!(roster.team(Team::A)[3].kills(), 1);
        assert_eq!(roster.kill_sum(Team::A), 1);
        assert_eq!(roster.alive_count(Team::B), TEAM_SIZE - 1);
    }

    #[test]
    fn deaths_without_killer_only_flip_alive() {
        let mut roster = roster();
        let victim = roster.team(Team::A)[0].combatant().expect("bound");
        let events = [Event::CombatantDied {
            victim,
            killer: None,
        }];
        assert_eq!(KillAttribution::new().observe(&events, &mut roster), 1);
        assert_eq!(roster.kill_sum(Team::A) + roster.kill_sum(Team::B), 0);
    }

    #[test]
    fn payout_is_split_across_team() {
        assert!((payout_per_winner(100.0, 0.5) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn generated_match_ids_are_random_v4() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let first = MatchId::generate(&mut rng);
        let second = MatchId::generate(&mut rng);
        assert_ne!(first, second);
        assert_eq!(first.get().get_version_num(), 4);
    }
}
