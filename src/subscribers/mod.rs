//! # Event subscribers for the treevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Supervisor task ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet::emit
//!                                                                      │
//!                                                            ┌─────────┼─────────┐
//!                                                            ▼         ▼         ▼
//!                                                        LogWriter  Metrics   Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
