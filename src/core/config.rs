//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for one supervisor instance.
//! Every field has a default matching the classic OTP-style supervisor tuning:
//! five second stop joins, at most ten restarts with gaps under ten seconds.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `restart_window = 0s` → every restart starts a fresh window (storms never trip)

use std::time::Duration;

/// Configuration for a supervisor.
///
/// ## Field semantics
/// - `join_timeout`: bound on each cooperative-stop join during ONE_FOR_ALL / REST_FOR_ONE
/// - `restart_window`: a restart closer than this to the previous one counts towards a storm
/// - `max_restarts`: storm threshold (the supervisor gives up once the count exceeds it)
/// - `grace`: how long [`shutdown`](crate::Supervisor::shutdown) waits for non-daemon children
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
///
/// ## Notes
/// All fields are public. Use the helper accessors to avoid sprinkling sentinel checks.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum wait for one child to honor a stop request during a restart pass.
    ///
    /// A child still running after this bound is orphaned (detached, never killed)
    /// and a `ChildStopTimeout` event is published.
    pub join_timeout: Duration,

    /// Gap below which two consecutive restarts count as part of the same storm.
    pub restart_window: Duration,

    /// Number of restarts tolerated inside a storm before self-shutdown.
    pub max_restarts: u32,

    /// Maximum time [`shutdown`](crate::Supervisor::shutdown) waits for non-daemon children.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a copy with a different join timeout.
    pub fn with_join_timeout(mut self, join_timeout: Duration) -> Self {
        self.join_timeout = join_timeout;
        self
    }

    /// Returns a copy with a different restart intensity (`max_restarts` within `window`).
    pub fn with_restart_intensity(mut self, max_restarts: u32, window: Duration) -> Self {
        self.max_restarts = max_restarts;
        self.restart_window = window;
        self
    }

    /// Returns a copy with a different shutdown grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `join_timeout = 5s`
    /// - `restart_window = 10s`
    /// - `max_restarts = 10`
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(5),
            restart_window: Duration::from_secs(10),
            max_restarts: 10,
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}
