//! Tunable parameters of the round orchestrator.

use std::time::Duration;

use arena_rounds_system_bounds::BoundsConfig;
use arena_rounds_system_restorer::ProtectionPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration of the round lifecycle.
///
/// Durations are expressed in seconds. Cadence and enforcement intervals are
/// measured in simulation time; every other duration is measured on the wall
/// clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Host simulation ticks per simulated second.
    pub ticks_per_second: u32,
    /// Simulation seconds between consecutive combat starts.
    pub cadence_secs: f64,
    /// Wall seconds fighters are shown before combat.
    pub preview_secs: f64,
    /// Wall seconds combat may last before a winner is forced.
    pub combat_secs: f64,
    /// Wall seconds the result stays on screen before cleanup.
    pub ended_delay_secs: f64,
    /// Wall seconds between cleanup and returning to idle.
    pub resetting_delay_secs: f64,
    /// Simulation seconds between combat enforcement passes.
    pub enforce_interval_secs: f64,
    /// Payout fraction reported when the holder feed is unavailable.
    pub fallback_payout_fraction: f64,
    /// Arena rectangle parameters.
    pub bounds: BoundsConfig,
    /// Rules shielding arena anchors from cleanup.
    pub protection: ProtectionPolicy,
    /// Seed for match identifiers, coin flips and placeholder identities.
    ///
    /// Unset seeds are drawn from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            cadence_secs: 300.0,
            preview_secs: 30.0,
            combat_secs: 240.0,
            ended_delay_secs: 3.0,
            resetting_delay_secs: 2.0,
            enforce_interval_secs: 0.25,
            fallback_payout_fraction: 0.5,
            bounds: BoundsConfig::default(),
            protection: ProtectionPolicy::default(),
            seed: None,
        }
    }
}

/// Reasons a configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The simulation rate is zero.
    #[error("ticks_per_second must be positive")]
    ZeroTickRate,
    /// A duration is negative, infinite or not a number.
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// The cadence leaves no room for the preview phase.
    #[error("cadence of {cadence}s must exceed the preview of {preview}s")]
    CadenceTooShort {
        /// Configured cadence.
        cadence: f64,
        /// Configured preview.
        preview: f64,
    },
    /// The fallback payout fraction lies outside `[0, 1]`.
    #[error("fallback payout fraction {0} is outside [0, 1]")]
    InvalidPayoutFraction(f64),
}

impl RoundConfig {
    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        for (field, value) in [
            ("cadence_secs", self.cadence_secs),
            ("preview_secs", self.preview_secs),
            ("combat_secs", self.combat_secs),
            ("ended_delay_secs", self.ended_delay_secs),
            ("resetting_delay_secs", self.resetting_delay_secs),
            ("enforce_interval_secs", self.enforce_interval_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }
        if self.cadence_secs <= self.preview_secs {
            return Err(ConfigError::CadenceTooShort {
                cadence: self.cadence_secs,
                preview: self.preview_secs,
            });
        }
        if !(0.0..=1.0).contains(&self.fallback_payout_fraction) {
            return Err(ConfigError::InvalidPayoutFraction(
                self.fallback_payout_fraction,
            ));
        }
        Ok(())
    }

    /// Wall time fighters are shown before combat.
    #[must_use]
    pub fn preview_duration(&self) -> Duration {
        seconds(self.preview_secs)
    }

    /// Wall time combat may last.
    #[must_use]
    pub fn combat_duration(&self) -> Duration {
        seconds(self.combat_secs)
    }

    /// Wall time between the result and cleanup.
    #[must_use]
    pub fn ended_delay(&self) -> Duration {
        seconds(self.ended_delay_secs)
    }

    /// Wall time between cleanup and idle.
    #[must_use]
    pub fn resetting_delay(&self) -> Duration {
        seconds(self.resetting_delay_secs)
    }

    /// Cadence interval in simulation ticks.
    #[must_use]
    pub fn cadence_ticks(&self) -> u64 {
        self.to_ticks(self.cadence_secs).max(1)
    }

    /// Preview duration in simulation ticks.
    #[must_use]
    pub fn preview_ticks(&self) -> u64 {
        self.to_ticks(self.preview_secs)
    }

    /// Enforcement interval in simulation ticks; never zero.
    #[must_use]
    pub fn enforce_interval_ticks(&self) -> u64 {
        self.to_ticks(self.enforce_interval_secs).max(1)
    }

    fn to_ticks(&self, secs: f64) -> u64 {
        let ticks = (secs * f64::from(self.ticks_per_second)).round();
        if ticks.is_finite() && ticks > 0.0 {
            ticks as u64
        } else {
            0
        }
    }
}

fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_convert_to_ticks() {
        let config = RoundConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.cadence_ticks(), 18_000);
        assert_eq!(config.preview_ticks(), 1_800);
        assert_eq!(config.enforce_interval_ticks(), 15);
        assert_eq!(config.preview_duration(), Duration::from_secs(30));
        assert_eq!(config.combat_duration(), Duration::from_secs(240));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RoundConfig =
            serde_json::from_str(r#"{ "preview_secs": 5.0, "bounds": { "padding": 4 } }"#)
                .expect("valid config");
        assert!((config.preview_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.bounds.padding, 4);
        assert_eq!(config.bounds.min_size, 20);
        assert_eq!(config.ticks_per_second, 60);
        assert_eq!(config.protection, ProtectionPolicy::default());
        assert_eq!(config.seed, None);

        let config: RoundConfig =
            serde_json::from_str(r#"{ "seed": 42 }"#).expect("valid config");
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = RoundConfig {
            ticks_per_second: 0,
            ..RoundConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickRate));

        let config = RoundConfig {
            combat_secs: -1.0,
            ..RoundConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration {
                field: "combat_secs",
                ..
            })
        ));

        let config = RoundConfig {
            cadence_secs: 10.0,
            preview_secs: 10.0,
            ..RoundConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CadenceTooShort { .. })
        ));
    }
}
