//! Per-subscriber delivery queues.
//!
//! A [`SubscriberSet`] gives every subscriber its own bounded queue and a task draining
//! it, so one slow subscriber never holds up the supervision task or its peers.
//!
//! ```text
//! emit(ev) ─┬─ try_send ─► lane "LogWriter" ─► drain ─► on_event
//!           └─ try_send ─► lane "audit"     ─► drain ─► on_event
//!                │                                        │
//!                └ full/closed: SubscriberOverflow        └ panic: SubscriberPanicked
//! ```
//!
//! Each subscriber sees events in publication order. A rejected event is lost for that
//! subscriber only. Faults are reported on the [`Bus`], and a panic does not end the
//! drain task.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending side of one subscriber's queue.
struct Lane {
    subscriber: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
}

/// Fan-out of supervisor events to a fixed list of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    drains: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one lane per subscriber, sized by [`Subscribe::queue_capacity`] (at least 1).
    ///
    /// Spawns the drain tasks, so it needs a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (lanes, drains): (Vec<_>, Vec<_>) = subs
            .into_iter()
            .map(|sub| {
                let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let lane = Lane {
                    subscriber: sub.name(),
                    queue,
                    dropped: AtomicU64::new(0),
                };
                (lane, tokio::spawn(drain(sub, rx, bus.clone())))
            })
            .unzip();
        Self { lanes, drains, bus }
    }

    /// Events lost across all lanes since the set was created.
    pub fn dropped(&self) -> u64 {
        self.lanes
            .iter()
            .map(|lane| lane.dropped.load(Ordering::Relaxed))
            .sum()
    }

    /// Offers `event` to every lane without waiting.
    ///
    /// A lane that rejects it counts the loss and a `SubscriberOverflow` is published,
    /// unless the rejected event was itself an overflow report.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        for lane in &self.lanes {
            let cause = match lane.queue.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            let dropped = lane.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if event.kind != EventKind::SubscriberOverflow {
                self.bus.publish(Event::subscriber_overflow(
                    lane.subscriber,
                    cause,
                    &event,
                    dropped,
                ));
            }
        }
    }

    /// Closes every lane and waits until each subscriber has handled what was queued.
    pub async fn shutdown(self) {
        let Self { lanes, drains, .. } = self;
        drop(lanes);
        for task in drains {
            let _ = task.await;
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        if let Err(payload) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await {
            bus.publish(Event::subscriber_panicked(
                sub.name(),
                crate::panic_message(&*payload),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber exploded");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_flushes_on_shutdown() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], bus);

        set.emit(Event::new(EventKind::ChildStarted));
        set.emit(Event::new(EventKind::ChildFailed));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![EventKind::ChildStarted, EventKind::ChildFailed]
        );
    }

    #[tokio::test]
    async fn panics_are_reported_on_the_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicky)], bus);

        set.emit(Event::new(EventKind::ChildStarted));
        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.child.as_deref(), Some("panicky"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
        set.shutdown().await;
    }

    struct Tiny;

    #[async_trait]
    impl Subscribe for Tiny {
        async fn on_event(&self, _event: &Event) {}
        fn name(&self) -> &'static str {
            "tiny"
        }
        fn queue_capacity(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn full_lane_drops_and_reports_with_a_running_count() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Tiny)], bus);

        // Nothing drains until this task yields, so only the first event fits.
        for _ in 0..3 {
            set.emit(Event::new(EventKind::ChildStarted).with_supervisor("root"));
        }
        assert_eq!(set.dropped(), 2);

        let first = rx.recv().await.expect("overflow event");
        assert_eq!(first.kind, EventKind::SubscriberOverflow);
        assert_eq!(first.supervisor.as_deref(), Some("root"));
        let second = rx.recv().await.expect("overflow event");
        assert_eq!(second.reason.as_deref(), Some("queue full, 2 dropped so far"));
        set.shutdown().await;
    }
}
