//! The [`Subscribe`] trait: observers of supervisor events.
//!
//! Subscribers are passed to [`SupervisorBuilder::with_subscribers`](crate::SupervisorBuilder::with_subscribers).
//! Each one gets a private bounded queue inside the supervisor's
//! [`SubscriberSet`](crate::SubscriberSet), so a subscriber doing slow I/O only delays
//! itself. When its queue is full further events are lost for it and a
//! `SubscriberOverflow` event says so.
//!
//! ## Example
//! ```rust
//! use treevisor::{Event, EventKind, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ChildFailed {
//!             // write audit record...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//!     fn queue_capacity(&self) -> usize { 512 }
//! }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// Receives every event its supervisor publishes.
///
/// `on_event` runs on the subscriber's own task; blocking calls there stall a runtime
/// worker thread, so keep them off it.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events start being dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
