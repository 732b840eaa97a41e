//! Lifecycle events published on a supervisor's [`Bus`](crate::Bus).
//!
//! | Group      | Kinds                                                                   | Fields set                                   |
//! |------------|-------------------------------------------------------------------------|----------------------------------------------|
//! | child      | `ChildStarted`, `ChildFailed`, `ChildStopRequested`, `ChildStopTimeout` | `supervisor`, `child`, `worker_id`           |
//! | child      | `ChildConstructionFailed`                                               | `supervisor`, `child`, `reason`              |
//! | supervisor | `SupervisorStarted`, `ShutdownRequested`, `AllStoppedWithin`            | `supervisor`                                 |
//! | supervisor | `RestartStormDetected`                                                  | `supervisor`, `restart_count`                |
//! | supervisor | `GraceExceeded`                                                         | `supervisor`, `timeout_ms`, `reason` (stuck) |
//! | supervisor | `SupervisorStopped`                                                     | `supervisor`, `reason` (exit label)          |
//! | subscriber | `SubscriberOverflow`, `SubscriberPanicked`                              | `child` (subscriber name), `reason`          |
//!
//! `ChildFailed` also carries the termination cause in `reason`, `ChildStopTimeout` the
//! join timeout in `timeout_ms`.
//!
//! Subscribers run on their own queues, so delivery order across subscribers is not
//! preserved. Every event takes a number from one process-wide counter; sort by
//! [`Event::seq`] to recover publication order.
//!
//! ```rust
//! use treevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ChildFailed)
//!     .with_supervisor("root")
//!     .with_child("db")
//!     .with_worker_id(7)
//!     .with_reason("connection refused");
//!
//! assert!(ev.kind.concerns_child());
//! assert_eq!(ev.child.as_deref(), Some("db"));
//! assert_eq!(ev.worker_id, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened. See the module table for the fields each kind fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A child incarnation was started.
    ChildStarted,
    /// A child terminated abnormally and reported to its supervisor.
    ChildFailed,
    /// A child was unregistered and asked to stop.
    ChildStopRequested,
    /// A child outlived its join timeout and was orphaned.
    ChildStopTimeout,
    /// A child factory failed during a restart.
    ChildConstructionFailed,

    /// Every child was constructed and started.
    SupervisorStarted,
    /// Restart intensity was exceeded; the supervisor stops itself.
    RestartStormDetected,
    /// The supervision task ended.
    SupervisorStopped,
    /// Graceful shutdown was requested by API call or OS signal.
    ShutdownRequested,
    /// Non-daemon children all stopped inside the grace period.
    AllStoppedWithin,
    /// Some non-daemon children were still running when grace ran out.
    GraceExceeded,

    /// A subscriber queue rejected an event.
    SubscriberOverflow,
    /// A subscriber panicked while handling an event.
    SubscriberPanicked,
}

impl EventKind {
    /// `true` for kinds that describe a single child.
    pub fn concerns_child(self) -> bool {
        matches!(
            self,
            Self::ChildStarted
                | Self::ChildFailed
                | Self::ChildStopRequested
                | Self::ChildStopTimeout
                | Self::ChildConstructionFailed
        )
    }

    /// `true` for kinds produced by the subscriber fan-out itself.
    pub fn is_subscriber_fault(self) -> bool {
        matches!(self, Self::SubscriberOverflow | Self::SubscriberPanicked)
    }
}

/// One published event.
///
/// Only `seq`, `at` and `kind` are always present.
#[derive(Clone, Debug)]
pub struct Event {
    /// Publication order, unique within the process.
    pub seq: u64,
    /// Wall-clock creation time.
    pub at: SystemTime,
    pub kind: EventKind,

    pub supervisor: Option<Arc<str>>,
    /// Child name, or the subscriber name for subscriber faults.
    pub child: Option<Arc<str>>,
    /// [`WorkerId`](crate::WorkerId) of the incarnation involved.
    pub worker_id: Option<u64>,
    pub reason: Option<Arc<str>>,
    pub restart_count: Option<u32>,
    /// Join timeout or grace period, in milliseconds.
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Stamps a fresh event of `kind` with the next sequence number and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            supervisor: None,
            child: None,
            worker_id: None,
            reason: None,
            restart_count: None,
            timeout_ms: None,
        }
    }

    pub fn with_supervisor(mut self, name: impl Into<Arc<str>>) -> Self {
        self.supervisor = Some(name.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<Arc<str>>) -> Self {
        self.child = Some(name.into());
        self
    }

    pub fn with_worker_id(mut self, id: u64) -> Self {
        self.worker_id = Some(id);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_restart_count(mut self, count: u32) -> Self {
        self.restart_count = Some(count);
        self
    }

    /// Durations above `u32::MAX` milliseconds saturate.
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(u32::try_from(d.as_millis()).unwrap_or(u32::MAX));
        self
    }

    /// `subscriber` lost an event because its queue was `cause` (`full` or `closed`).
    ///
    /// The supervisor of the lost event is carried over so a log line can say whose
    /// events are going missing. `dropped` counts every loss on that queue so far.
    pub fn subscriber_overflow(
        subscriber: &'static str,
        cause: &'static str,
        lost: &Event,
        dropped: u64,
    ) -> Self {
        let ev = Event::new(EventKind::SubscriberOverflow)
            .with_child(subscriber)
            .with_reason(format!("queue {cause}, {dropped} dropped so far"));
        match &lost.supervisor {
            Some(sup) => ev.with_supervisor(Arc::clone(sup)),
            None => ev,
        }
    }

    pub fn subscriber_panicked(subscriber: &'static str, message: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_child(subscriber)
            .with_reason(message)
    }
}
