//! Anchor discovery and round scheduling.

use arena_rounds_core::{AnchorKind, AnchorTriad, ArenaWorld, ThingSnapshot};
use thiserror::Error;

/// Reasons the arena refuses to start.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SetupError {
    /// An anchor structure has not been placed.
    #[error("arena anchor {kind:?} is missing")]
    MissingAnchor {
        /// Anchor that could not be found.
        kind: AnchorKind,
    },
    /// More than one structure claims to be the same anchor.
    #[error("arena anchor {kind:?} is placed {count} times")]
    DuplicateAnchor {
        /// Anchor that is duplicated.
        kind: AnchorKind,
        /// Number of candidates found.
        count: usize,
    },
    /// The anchors do not produce a usable arena rectangle.
    #[error("arena anchors do not produce a usable region")]
    NoRegion,
}

/// Finds the three anchors on the map.
///
/// Things carrying an anchor marker are authoritative. Only when no marked
/// thing exists for a kind are things matched by their definition name.
pub fn locate_anchors<W>(world: &W) -> Result<AnchorTriad, SetupError>
where
    W: ArenaWorld + ?Sized,
{
    let mut triad = AnchorTriad::default();
    for kind in AnchorKind::ALL {
        let mut found = world.find_things(&|thing: &ThingSnapshot| thing.anchor == Some(kind));
        if found.is_empty() {
            found = world.find_things(&|thing: &ThingSnapshot| {
                thing.anchor.is_none() && thing.def.as_str() == kind.def_name()
            });
        }

        match found.as_slice() {
            [] => return Err(SetupError::MissingAnchor { kind }),
            [anchor] => triad.set(kind, anchor.cell),
            many => {
                return Err(SetupError::DuplicateAnchor {
                    kind,
                    count: many.len(),
                })
            }
        }
    }
    Ok(triad)
}

/// Tick at which the next preview should begin.
///
/// Combat starts on multiples of `cadence_ticks`; the preview begins
/// `preview_ticks` earlier. The returned tick is always after `now`.
#[must_use]
pub fn next_round_tick(now: u64, cadence_ticks: u64, preview_ticks: u64) -> u64 {
    let cadence = cadence_ticks.max(1);
    let lead = preview_ticks.min(cadence - 1);
    let mut boundary = (now / cadence + 1).saturating_mul(cadence);
    while boundary - lead <= now {
        boundary = boundary.saturating_add(cadence);
    }
    boundary - lead
}
