//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by supervisors and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the supervisor task (child lifecycle, storms, shutdown),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's fan-out listener (feeds the `SubscriberSet`),
//!   and any receiver obtained from `Supervisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
