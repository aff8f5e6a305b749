#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure geometry system that derives the arena rectangle from its anchors.

use arena_rounds_core::{AnchorTriad, ArenaBounds, MapSize};
use serde::{Deserialize, Serialize};

/// Cells added on every side of the anchors' bounding box.
pub const DEFAULT_PADDING: u32 = 10;

/// Smallest edge-to-edge extent the arena may have along either axis.
pub const DEFAULT_MIN_SIZE: u32 = 20;

/// Tuning parameters for the bounds calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    /// Cells added on every side of the anchors' bounding box.
    pub padding: u32,
    /// Smallest edge-to-edge extent along either axis.
    pub min_size: u32,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

/// Computes the arena rectangle for the provided anchors.
///
/// Returns `None` when any anchor is missing or the map has no cells. The
/// anchors' bounding box is padded on every side, grown symmetrically along
/// any axis shorter than the minimum size, and finally kept inside
/// `[0, map_size)`. A rectangle that crosses a map edge is slid back inside
/// rather than cut, so it only shrinks below the minimum size when the map
/// itself is smaller.
#[must_use]
pub fn compute_bounds(
    anchors: &AnchorTriad,
    map_size: MapSize,
    config: &BoundsConfig,
) -> Option<ArenaBounds> {
    let positions = anchors.complete()?;
    if map_size.width() == 0 || map_size.depth() == 0 {
        return None;
    }

    let padding = i64::from(config.padding);
    let min_size = i64::from(config.min_size);

    let mut min_x = positions.iter().map(|cell| i64::from(cell.x())).min()? - padding;
    let mut max_x = positions.iter().map(|cell| i64::from(cell.x())).max()? + padding;
    let mut min_z = positions.iter().map(|cell| i64::from(cell.z())).min()? - padding;
    let mut max_z = positions.iter().map(|cell| i64::from(cell.z())).max()? + padding;

    expand_axis(&mut min_x, &mut max_x, min_size);
    expand_axis(&mut min_z, &mut max_z, min_size);
    clamp_axis(&mut min_x, &mut max_x, i64::from(map_size.width()));
    clamp_axis(&mut min_z, &mut max_z, i64::from(map_size.depth()));

    Some(ArenaBounds::from_limits(
        narrow(min_x),
        narrow(min_z),
        narrow(max_x),
        narrow(max_z),
    ))
}

fn expand_axis(min: &mut i64, max: &mut i64, min_size: i64) {
    let span = *max - *min;
    if span >= min_size {
        return;
    }
    let shortfall = min_size - span;
    let lower = shortfall / 2;
    *min -= lower;
    *max += shortfall - lower;
}

fn clamp_axis(min: &mut i64, max: &mut i64, extent: i64) {
    let limit = extent - 1;
    if *max - *min >= limit {
        *min = 0;
        *max = limit;
        return;
    }
    if *min < 0 {
        *max -= *min;
        *min = 0;
    }
    if *max > limit {
        *min -= *max - limit;
        *max = limit;
    }
}

fn narrow(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Memoizes the most recent bounds calculation.
#[derive(Clone, Debug, Default)]
pub struct BoundsCache {
    last: Option<CachedBounds>,
}

#[derive(Clone, Copy, Debug)]
struct CachedBounds {
    anchors: AnchorTriad,
    map_size: MapSize,
    config: BoundsConfig,
    bounds: Option<ArenaBounds>,
}

impl BoundsCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cached bounds for identical inputs, recomputing otherwise.
    pub fn resolve(
        &mut self,
        anchors: &AnchorTriad,
        map_size: MapSize,
        config: &BoundsConfig,
    ) -> Option<ArenaBounds> {
        if let Some(cached) = &self.last {
            if cached.anchors == *anchors && cached.map_size == map_size && cached.config == *config
            {
                return cached.bounds;
            }
        }

        let bounds = compute_bounds(anchors, map_size, config);
        self.last = Some(CachedBounds {
            anchors: *anchors,
            map_size,
            config: *config,
            bounds,
        });
        bounds
    }

    /// Most recently resolved bounds, if any.
    #[must_use]
    pub fn current(&self) -> Option<ArenaBounds> {
        self.last.and_then(|cached| cached.bounds)
    }

    /// Forgets the memoized result.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
