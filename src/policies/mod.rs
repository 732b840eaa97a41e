//! Restart policies.
//!
//! This module groups the knobs that control **which** children are restarted
//! together and **when** a supervisor stops trying.
//!
//! ## Contents
//! - [`RestartStrategy`] which siblings follow a failed child (one-for-one / one-for-all / rest-for-one)
//! - [`RestartIntensity`] restart-storm throttle (max restarts with short gaps)
//!
//! ## Quick wiring
//! ```text
//! Supervisor { strategy: RestartStrategy, intensity: RestartIntensity }
//!      └─► on child failure:
//!           - strategy.affected(failed, len) picks the restart range
//!           - intensity.record(now) decides whether to give up
//! ```

mod intensity;
mod strategy;

pub use intensity::{RestartIntensity, RestartStats};
pub use strategy::RestartStrategy;
