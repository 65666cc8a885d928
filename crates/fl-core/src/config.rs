//! Fleet timing and routing configuration.
//!
//! All durations are stored as integer milliseconds so the struct
//! round-trips cleanly through TOML/JSON when the `serde` feature is on;
//! the `*_delay()` style accessors convert to `Duration` at the call site.

use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Top-level fleet configuration.
///
/// Typically loaded from a TOML/JSON file by the application crate and passed
/// to the fleet controller builder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FleetConfig {
    /// Pause between consecutive interpolated movement points.
    pub step_delay_ms: u64,

    /// Pause after a `Blocked` or `Waiting` outcome before retrying.
    pub backoff_ms: u64,

    /// Lifetime of a waiting-queue entry.  Entries older than this are
    /// discarded instead of being promoted to lane holder.
    pub reservation_timeout_ms: u64,

    /// Accumulated reservation wait after which a worker discards its plan
    /// and re-routes with fresh congestion data.
    pub replan_after_ms: u64,

    /// Distance within which a robot counts as "at" its destination.
    pub arrival_tolerance: f64,

    /// Target spacing between interpolated points along a lane.  Every lane
    /// gets at least three points regardless of its length.
    pub interpolation_spacing: f64,

    /// A* congestion penalty: `cost = length × (1 + congestion × penalty)`.
    pub congestion_penalty: f64,

    /// Maximum number of memoized routes.  `0` disables the path cache.
    pub path_cache_capacity: usize,

    /// Default proximity threshold for collision queries.
    pub collision_threshold: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            step_delay_ms:          200,
            backoff_ms:             500,
            reservation_timeout_ms: 5_000,
            replan_after_ms:        2_000,
            arrival_tolerance:      1e-3,
            interpolation_spacing:  0.5,
            congestion_penalty:     2.0,
            path_cache_capacity:    1_024,
            collision_threshold:    2.0,
        }
    }
}

impl FleetConfig {
    #[inline]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    #[inline]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    #[inline]
    pub fn reservation_timeout(&self) -> Duration {
        Duration::from_millis(self.reservation_timeout_ms)
    }

    #[inline]
    pub fn replan_after(&self) -> Duration {
        Duration::from_millis(self.replan_after_ms)
    }

    /// A configuration with millisecond-scale delays, for tests and demos
    /// that want the whole state machine to run in well under a second.
    pub fn fast() -> Self {
        Self {
            step_delay_ms:          1,
            backoff_ms:             5,
            reservation_timeout_ms: 1_000,
            replan_after_ms:        100,
            ..Self::default()
        }
    }

    /// Reject values that would make the movement loop misbehave.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.arrival_tolerance.is_finite() && self.arrival_tolerance >= 0.0) {
            return Err(CoreError::Config(format!(
                "arrival_tolerance must be finite and >= 0, got {}",
                self.arrival_tolerance
            )));
        }
        if !(self.interpolation_spacing.is_finite() && self.interpolation_spacing > 0.0) {
            return Err(CoreError::Config(format!(
                "interpolation_spacing must be finite and > 0, got {}",
                self.interpolation_spacing
            )));
        }
        if !(self.congestion_penalty.is_finite() && self.congestion_penalty >= 0.0) {
            // A negative penalty would make the A* heuristic inadmissible.
            return Err(CoreError::Config(format!(
                "congestion_penalty must be finite and >= 0, got {}",
                self.congestion_penalty
            )));
        }
        if !self.collision_threshold.is_finite() {
            return Err(CoreError::Config("collision_threshold must be finite".into()));
        }
        if self.backoff_ms == 0 {
            return Err(CoreError::Config("backoff_ms must be > 0".into()));
        }
        Ok(())
    }
}
