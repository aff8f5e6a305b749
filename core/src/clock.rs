//! Time sources consumed by the round orchestrator.
//!
//! The arena runs against two independent clocks. The tick clock counts host
//! simulation ticks and stops while the host is paused; the wall clock keeps
//! advancing regardless. Manual implementations share their counter between
//! clones so a driver can advance the same clock the orchestrator reads.

use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

/// Discrete, pausable simulation time source.
pub trait TickClock {
    /// Number of simulation ticks elapsed since the host started.
    fn ticks(&self) -> u64;
}

/// Monotonic real-time source that ignores the host's pause state.
pub trait WallClock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct SystemWallClock {
    origin: Instant,
}

impl SystemWallClock {
    /// Creates a wall clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemWallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemWallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Tick clock advanced explicitly by its owner.
#[derive(Clone, Debug, Default)]
pub struct ManualTickClock {
    ticks: Rc<Cell<u64>>,
}

impl ManualTickClock {
    /// Creates a tick clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.ticks.set(self.ticks.get().saturating_add(ticks));
    }

    /// Moves the clock to an absolute tick.
    pub fn set(&self, ticks: u64) {
        self.ticks.set(ticks);
    }
}

impl TickClock for ManualTickClock {
    fn ticks(&self) -> u64 {
        self.ticks.get()
    }
}

/// Wall clock advanced explicitly by its owner.
#[derive(Clone, Debug, Default)]
pub struct ManualWallClock {
    now: Rc<Cell<Duration>>,
}

impl ManualWallClock {
    /// Creates a wall clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `elapsed`.
    pub fn advance(&self, elapsed: Duration) {
        self.now.set(self.now.get().saturating_add(elapsed));
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clocks_share_state_between_clones() {
        let ticks = ManualTickClock::new();
        let reader = ticks.clone();
        ticks.advance(15);
        assert_eq!(reader.ticks(), 15);
        ticks.set(3);
        assert_eq!(reader.ticks(), 3);

        let wall = ManualWallClock::new();
        let wall_reader = wall.clone();
        wall.advance(Duration::from_millis(1_500));
        assert_eq!(wall_reader.now(), Duration::from_millis(1_500));
    }

    #[test]
    fn system_wall_clock_is_monotonic() {
        let clock = SystemWallClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
