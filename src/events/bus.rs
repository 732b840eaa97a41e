//! Broadcast channel carrying one supervisor's [`Event`]s.
//!
//! The supervision task and the subscriber drains publish; the fan-out listener and any
//! receiver handed out by [`Supervisor::subscribe`](crate::Supervisor::subscribe) read.
//!
//! ```text
//! supervision task ─┐                     ┌─► fan-out listener ─► SubscriberSet
//! subscriber drains ─┴─► Bus (ring of N) ─┤
//!                                         └─► Supervisor::subscribe()
//! ```
//!
//! Publishing never waits. A receiver that falls more than N events behind gets
//! `RecvError::Lagged` and resumes at the oldest retained event. Events published while
//! nobody is subscribed are discarded.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publishing handle shared by a supervisor and its fan-out.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// `capacity` is the ring size per receiver, raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        // Err only means there are no receivers right now.
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
