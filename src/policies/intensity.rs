//! # Restart-storm throttle.
//!
//! [`RestartIntensity`] counts restarts whose gap to the previous restart is shorter
//! than a window. Once the count exceeds `max_restarts` the supervisor gives up.
//!
//! This is a sliding-*start* throttle, not a true sliding window: only consecutive
//! gaps are compared. A trickle of failures each just inside the window accumulates
//! without bound; a single quiet gap of at least `window` resets the count to 1.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use treevisor::RestartIntensity;
//!
//! let mut intensity = RestartIntensity::new(2, Duration::from_secs(10));
//! let t0 = Instant::now();
//! assert!(!intensity.record(t0));                           // count = 1
//! assert!(!intensity.record(t0 + Duration::from_secs(1)));  // count = 2
//! assert!(intensity.record(t0 + Duration::from_secs(2)));   // count = 3 > 2 → storm
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// Snapshot of the restart counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartStats {
    /// Restarts counted in the current window.
    pub restart_count: u32,
    /// When the last restart was recorded (`None` before the first one).
    pub last_restart: Option<Instant>,
}

/// Restart-storm detector.
#[derive(Clone, Debug)]
pub struct RestartIntensity {
    max_restarts: u32,
    window: Duration,
    restart_count: u32,
    last_restart: Option<Instant>,
}

impl RestartIntensity {
    /// Creates a detector tolerating `max_restarts` restarts with gaps under `window`.
    pub fn new(max_restarts: u32, window: Duration) -> Self {
        Self {
            max_restarts,
            window,
            restart_count: 0,
            last_restart: None,
        }
    }

    /// Records a restart at `now` and returns `true` if the storm threshold was exceeded.
    ///
    /// ### Rules
    /// - `elapsed = now - last_restart` (unbounded before the first restart)
    /// - `elapsed < window` → `restart_count += 1`; storm iff `restart_count > max_restarts`
    /// - otherwise → `restart_count = 1`
    pub fn record(&mut self, now: Instant) -> bool {
        let elapsed = self
            .last_restart
            .map(|last| now.saturating_duration_since(last));
        self.last_restart = Some(now);

        match elapsed {
            Some(gap) if gap < self.window => {
                self.restart_count = self.restart_count.saturating_add(1);
                self.restart_count > self.max_restarts
            }
            _ => {
                self.restart_count = 1;
                false
            }
        }
    }

    /// Returns the current counters.
    pub fn stats(&self) -> RestartStats {
        RestartStats {
            restart_count: self.restart_count,
            last_restart: self.last_restart,
        }
    }
}
