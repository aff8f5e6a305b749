//! Source of wallet identities for each round.

use arena_rounds_core::ROSTER_SIZE;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::WalletIdentity;

const WALLET_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const PLACEHOLDER_LABEL: &str = "arena-placeholder";

/// Identities and reward parameters supplied by the holder feed.
#[derive(Clone, Debug, PartialEq)]
pub struct HolderBatch {
    /// Full wallet identities; exactly twenty are required.
    pub identities: Vec<String>,
    /// Reward pool advertised for the round.
    pub pool_amount: f64,
    /// Fraction of the pool paid to the winners.
    pub payout_fraction: f64,
}

/// Failures reported while fetching a holder batch.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FeedError {
    /// The feed could not be reached or produced no data.
    #[error("holder feed unavailable: {0}")]
    Unavailable(String),
    /// The feed returned the wrong number of identities.
    #[error("holder feed returned {actual} identities, expected {expected}")]
    WrongIdentityCount {
        /// Number of identities required.
        expected: usize,
        /// Number of identities received.
        actual: usize,
    },
    /// The payout fraction lies outside `[0, 1]`.
    #[error("payout fraction {0} is outside [0, 1]")]
    InvalidPayoutFraction(f64),
}

/// Supplies the wallet identities for a round.
pub trait HolderFeed {
    /// Fetches the identities and reward parameters for the next round.
    fn fetch(&mut self) -> Result<HolderBatch, FeedError>;
}

/// Feed that always returns the same batch.
#[derive(Clone, Debug)]
pub struct StaticFeed {
    batch: HolderBatch,
}

impl StaticFeed {
    /// Creates a feed returning `batch` on every fetch.
    #[must_use]
    pub fn new(batch: HolderBatch) -> Self {
        Self { batch }
    }
}

impl HolderFeed for StaticFeed {
    fn fetch(&mut self) -> Result<HolderBatch, FeedError> {
        Ok(self.batch.clone())
    }
}

/// Feed that is never reachable, forcing placeholder identities.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineFeed;

impl HolderFeed for OfflineFeed {
    fn fetch(&mut self) -> Result<HolderBatch, FeedError> {
        Err(FeedError::Unavailable("no holder feed configured".to_owned()))
    }
}

/// Where a round's identities came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    /// The holder feed supplied a valid batch.
    Feed,
    /// The feed failed and deterministic placeholders were generated.
    Placeholder,
}

/// Identities and reward parameters ready to build a roster from.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedIdentities {
    /// Twenty identities in roster order.
    pub identities: [WalletIdentity; ROSTER_SIZE],
    /// Reward pool advertised for the round.
    pub pool_amount: f64,
    /// Fraction of the pool paid to the winners.
    pub payout_fraction: f64,
    /// Origin of the identities.
    pub source: IdentitySource,
}

/// Generates twenty wallet-like identities from `seed` and `round`.
///
/// The same inputs always produce the same identities.
#[must_use]
pub fn placeholder_identities(seed: u64, round: u64) -> [WalletIdentity; ROSTER_SIZE] {
    std::array::from_fn(|slot| {
        let mut hasher = Sha256::new();
        hasher.update(PLACEHOLDER_LABEL.as_bytes());
        hasher.update(seed.to_le_bytes());
        hasher.update(round.to_le_bytes());
        hasher.update((slot as u64).to_le_bytes());
        let digest = hasher.finalize();
        let encoded: String = digest
            .iter()
            .map(|byte| char::from(WALLET_ALPHABET[usize::from(*byte) % WALLET_ALPHABET.len()]))
            .collect();
        WalletIdentity::new(encoded)
    })
}

/// Fetches identities from `feed`, falling back to placeholders on any failure.
///
/// On fallback the pool amount is zero and `fallback_fraction` is reported as
/// the payout fraction.
pub fn resolve_identities(
    feed: &mut dyn HolderFeed,
    seed: u64,
    round: u64,
    fallback_fraction: f64,
) -> ResolvedIdentities {
    match fetch_validated(feed) {
        Ok((identities, batch)) => {
            info!(round, pool = batch.pool_amount, "holder feed supplied identities");
            ResolvedIdentities {
                identities,
                pool_amount: batch.pool_amount,
                payout_fraction: batch.payout_fraction,
                source: IdentitySource::Feed,
            }
        }
        Err(error) => {
            warn!(round, %error, "falling back to placeholder identities");
            ResolvedIdentities {
                identities: placeholder_identities(seed, round),
                pool_amount: 0.0,
                payout_fraction: fallback_fraction,
                source: IdentitySource::Placeholder,
            }
        }
    }
}

fn fetch_validated(
    feed: &mut dyn HolderFeed,
) -> Result<([WalletIdentity; ROSTER_SIZE], HolderBatch), FeedError> {
    let batch = feed.fetch()?;
    if !(0.0..=1.0).contains(&batch.payout_fraction) {
        return Err(FeedError::InvalidPayoutFraction(batch.payout_fraction));
    }

    let actual = batch.identities.len();
    let identities: Vec<WalletIdentity> = batch
        .identities
        .iter()
        .map(|identity| WalletIdentity::new(identity.as_str()))
        .collect();
    let identities = <[WalletIdentity; ROSTER_SIZE]>::try_from(identities).map_err(|_| {
        FeedError::WrongIdentityCount {
            expected: ROSTER_SIZE,
            actual,
        }
    })?;
    Ok((identities, batch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(count: usize) -> HolderBatch {
        HolderBatch {
            identities: (0..count).map(|index| format!("Holder{index:02}xxxxyyyy")).collect(),
            pool_amount: 12.5,
            payout_fraction: 0.4,
        }
    }

    #[test]
    fn valid_batch_is_used_verbatim() {
        let mut feed = StaticFeed::new(batch(ROSTER_SIZE));
        let resolved = resolve_identities(&mut feed, 0, 1, 0.5);
        assert_eq!(resolved.source, IdentitySource::Feed);
        assert_eq!(resolved.identities[19].full(), "Holder19xxxxyyyy");
        assert!((resolved.pool_amount - 12.5).abs() < f64::EPSILON);
        assert!((resolved.payout_fraction - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn wrong_count_falls_back_to_placeholders() {
        let mut feed = StaticFeed::new(batch(19));
        let resolved = resolve_identities(&mut feed, 3, 7, 0.5);
        assert_eq!(resolved.source, IdentitySource::Placeholder);
        assert_eq!(resolved.identities, placeholder_identities(3, 7));
        assert_eq!(resolved.pool_amount, 0.0);
    }

    #[test]
    fn offline_feed_falls_back_to_placeholders() {
        let resolved = resolve_identities(&mut OfflineFeed, 3, 7, 0.25);
        assert_eq!(resolved.source, IdentitySource::Placeholder);
        assert!((resolved.payout_fraction - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let mut bad = batch(ROSTER_SIZE);
        bad.payout_fraction = 1.5;
        let mut feed = StaticFeed::new(bad);
        assert_eq!(
            fetch_validated(&mut feed).map(|_| ()),
            Err(FeedError::InvalidPayoutFraction(1.5))
        );
    }

    #[test]
    fn placeholders_are_deterministic_and_distinct() {
        let first = placeholder_identities(11, 2);
        assert_eq!(first, placeholder_identities(11, 2));
        assert_ne!(first, placeholder_identities(11, 3));
        assert_eq!(first[0].full().len(), 32);
        for (index, identity) in first.iter().enumerate() {
            for other in &first[index + 1..] {
                assert_ne!(identity, other);
            }
        }
    }
}
