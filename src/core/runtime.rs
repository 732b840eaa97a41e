//! # Supervision task: the single owner of a supervisor's children.
//!
//! [`SupervisorTask`] consumes two streams, one message at a time:
//! - control commands from [`Supervisor`](crate::Supervisor) handles
//! - failure reports merged from every child incarnation
//!
//! ## Failure handling
//! ```text
//! ChildFailure { name, id, cause }
//!   ├─ id != current incarnation? → ignore (stale: replaced or orphaned)
//!   ├─ publish ChildFailed
//!   ├─ strategy.affected(idx) → range
//!   │    ONE_FOR_ONE : drop the dead handle
//!   │    otherwise   : for each in range, in order:
//!   │                    unregister → request stop → join(join_timeout)
//!   │                    └─ timeout → ChildStopTimeout, orphan (never killed)
//!   ├─ restart range in order (construct+register all, then start all)
//!   │    └─ factory error → ChildConstructionFailed, exit RestartFailed
//!   └─ intensity.record(now)
//!        └─ storm → RestartStormDetected, stop_all, exit RestartStorm
//! ```
//!
//! ## Rules
//! - Restarts always run in declared order.
//! - `stop_all` never joins; shutdown waits (bounded by grace) only for non-daemon children.
//! - On exit the supervisor unregisters its own name, publishes `SupervisorStopped`,
//!   flushes subscribers, then publishes the exit reason to handles.

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::core::child::{ChildFailure, ChildHandle, FailureSender};
use crate::core::config::SupervisorConfig;
use crate::core::registry::{Registry, RegistryEntry};
use crate::core::supervisor::{ChildInfo, Control, SupervisorExit, SupervisorIdentity};
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RestartIntensity, RestartStrategy};
use crate::subscribers::SubscriberSet;
use crate::workers::ChildSpec;

/// State owned by one supervision task.
pub(crate) struct SupervisorTask {
    pub(crate) name: Arc<str>,
    /// The handle registered under `name` at startup.
    pub(crate) identity: SupervisorIdentity,
    pub(crate) strategy: RestartStrategy,
    pub(crate) cfg: SupervisorConfig,
    pub(crate) specs: Vec<ChildSpec>,
    /// Current incarnation per spec, same indices as `specs`.
    pub(crate) children: Vec<Option<ChildHandle>>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) bus: Bus,
    pub(crate) intensity: RestartIntensity,
    pub(crate) control_rx: mpsc::UnboundedReceiver<Control>,
    pub(crate) failure_tx: FailureSender,
    pub(crate) failure_rx: mpsc::UnboundedReceiver<ChildFailure>,
    pub(crate) exit_tx: watch::Sender<Option<SupervisorExit>>,
    pub(crate) fan_out: Option<FanOut>,
}

impl SupervisorTask {
    /// Main loop. Returns once the supervisor has stopped.
    pub(crate) async fn run(mut self) {
        let mut control_open = true;
        loop {
            tokio::select! {
                biased;

                cmd = self.control_rx.recv(), if control_open => match cmd {
                    Some(cmd) => {
                        if let Some(exit) = self.handle_control(cmd).await {
                            return self.finish(exit).await;
                        }
                    }
                    None => control_open = false,
                },
                Some(failure) = self.failure_rx.recv() => {
                    if let Err(exit) = self.handle_failure(failure).await {
                        self.stop_all();
                        return self.finish(exit).await;
                    }
                }
            }
        }
    }

    async fn handle_control(&mut self, cmd: Control) -> Option<SupervisorExit> {
        match cmd {
            Control::StopAll => {
                self.stop_all();
                Some(SupervisorExit::Stopped)
            }
            Control::Shutdown { respond_to } => {
                let res = self.shutdown().await;
                let _ = respond_to.send(res);
                Some(SupervisorExit::Stopped)
            }
            Control::WhichChildren { respond_to } => {
                let _ = respond_to.send(self.which_children());
                None
            }
            Control::RestartStats { respond_to } => {
                let _ = respond_to.send(self.intensity.stats());
                None
            }
        }
    }

    async fn handle_failure(&mut self, failure: ChildFailure) -> Result<(), SupervisorExit> {
        let Some(idx) = self.position(&failure) else {
            debug!(
                target: "treevisor",
                supervisor = %self.name,
                child = %failure.name,
                worker_id = failure.id.get(),
                "stale failure report ignored"
            );
            return Ok(());
        };

        error!(
            target: "treevisor",
            supervisor = %self.name,
            child = %failure.name,
            worker_id = failure.id.get(),
            cause = %failure.cause,
            "child terminated abnormally"
        );
        self.bus.publish(
            Event::new(EventKind::ChildFailed)
                .with_supervisor(Arc::clone(&self.name))
                .with_child(Arc::clone(&failure.name))
                .with_worker_id(failure.id.get())
                .with_reason(failure.cause),
        );

        let range = self.strategy.affected(idx, self.specs.len());
        match self.strategy {
            RestartStrategy::OneForOne => {
                if let Some(dead) = self.children[idx].take() {
                    self.unregister(&dead);
                }
            }
            RestartStrategy::OneForAll | RestartStrategy::RestForOne => {
                self.stop_range(range.clone()).await;
            }
        }
        self.restart_range(range)?;

        if self.intensity.record(Instant::now()) {
            let restart_count = self.intensity.stats().restart_count;
            self.bus.publish(
                Event::new(EventKind::RestartStormDetected)
                    .with_supervisor(Arc::clone(&self.name))
                    .with_restart_count(restart_count)
                    .with_timeout(self.cfg.restart_window),
            );
            return Err(SupervisorExit::RestartStorm { restart_count });
        }
        Ok(())
    }

    /// Index of the reporting child if the report comes from its current incarnation.
    fn position(&self, failure: &ChildFailure) -> Option<usize> {
        let idx = self
            .specs
            .iter()
            .position(|s| s.name() == &*failure.name)?;
        let current = self.children[idx].as_ref()?;
        (current.id() == failure.id).then_some(idx)
    }

    /// Stops each child in `range`, in order, joining each for at most `join_timeout`.
    async fn stop_range(&mut self, range: Range<usize>) {
        for idx in range {
            let Some(mut child) = self.children[idx].take() else {
                continue;
            };
            self.unregister(&child);
            child.request_normal_stop();
            self.publish_child(EventKind::ChildStopRequested, &child);

            if !child.join(self.cfg.join_timeout).await {
                warn!(
                    target: "treevisor",
                    supervisor = %self.name,
                    child = %child.name(),
                    worker_id = child.id().get(),
                    timeout = ?self.cfg.join_timeout,
                    "child did not stop in time, orphaning it"
                );
                self.bus.publish(
                    Event::new(EventKind::ChildStopTimeout)
                        .with_supervisor(Arc::clone(&self.name))
                        .with_child(Arc::clone(child.name()))
                        .with_worker_id(child.id().get())
                        .with_timeout(self.cfg.join_timeout),
                );
                child.orphan();
            }
        }
    }

    /// Rebuilds every child in `range`: construct and register all, then start all.
    ///
    /// Nothing is started unless every construction succeeded.
    fn restart_range(&mut self, range: Range<usize>) -> Result<(), SupervisorExit> {
        let mut fresh: Vec<(usize, ChildHandle)> = Vec::with_capacity(range.len());
        for idx in range {
            match self.construct(idx) {
                Ok(child) => fresh.push((idx, child)),
                Err(error) => {
                    for (_, child) in &fresh {
                        self.unregister(child);
                    }
                    let child = self.specs[idx].name().to_string();
                    self.bus.publish(
                        Event::new(EventKind::ChildConstructionFailed)
                            .with_supervisor(Arc::clone(&self.name))
                            .with_child(child.as_str())
                            .with_reason(error.as_str()),
                    );
                    return Err(SupervisorExit::RestartFailed { child, error });
                }
            }
        }

        for (idx, mut child) in fresh {
            child.start();
            self.publish_child(EventKind::ChildStarted, &child);
            self.children[idx] = Some(child);
        }
        Ok(())
    }

    fn construct(&self, idx: usize) -> Result<ChildHandle, String> {
        let spec = &self.specs[idx];
        let child =
            ChildHandle::construct(spec, self.failure_tx.clone()).map_err(|e| e.to_string())?;
        if let Some(actor) = child.actor() {
            self.registry
                .put(spec.name(), RegistryEntry::Actor(actor.clone()))
                .map_err(|e| e.to_string())?;
        }
        Ok(child)
    }

    /// Cooperative stop of every child in declared order. Never joins.
    ///
    /// Returns the detached handles so a caller may still wait on them.
    fn stop_all(&mut self) -> Vec<ChildHandle> {
        let mut stopped = Vec::with_capacity(self.children.len());
        for idx in 0..self.children.len() {
            let Some(child) = self.children[idx].take() else {
                continue;
            };
            child.request_normal_stop();
            self.unregister(&child);
            self.publish_child(EventKind::ChildStopRequested, &child);
            stopped.push(child);
        }
        stopped
    }

    async fn shutdown(&mut self) -> Result<(), SupervisorError> {
        self.bus.publish(
            Event::new(EventKind::ShutdownRequested).with_supervisor(Arc::clone(&self.name)),
        );

        let mut pending: Vec<ChildHandle> = self
            .stop_all()
            .into_iter()
            .filter(|c| !c.is_daemon())
            .collect();

        let grace = self.cfg.grace;
        let all_stopped = time::timeout(grace, async {
            for child in pending.iter_mut() {
                child.wait().await;
            }
        })
        .await
        .is_ok();

        if all_stopped {
            self.bus.publish(
                Event::new(EventKind::AllStoppedWithin).with_supervisor(Arc::clone(&self.name)),
            );
            return Ok(());
        }

        let stuck: Vec<String> = pending
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| c.name().to_string())
            .collect();
        self.bus.publish(
            Event::new(EventKind::GraceExceeded)
                .with_supervisor(Arc::clone(&self.name))
                .with_timeout(grace)
                .with_reason(stuck.join(", ")),
        );
        Err(SupervisorError::GraceExceeded { grace, stuck })
    }

    fn which_children(&self) -> Vec<ChildInfo> {
        self.children
            .iter()
            .flatten()
            .map(|c| ChildInfo {
                name: c.name().to_string(),
                id: c.id(),
                kind: c.kind(),
                daemon: c.is_daemon(),
                alive: c.is_alive(),
            })
            .collect()
    }

    fn unregister(&self, child: &ChildHandle) {
        if child.actor().is_some() {
            self.registry.remove_actor(child.name(), child.id());
        }
    }

    fn publish_child(&self, kind: EventKind, child: &ChildHandle) {
        self.bus.publish(
            Event::new(kind)
                .with_supervisor(Arc::clone(&self.name))
                .with_child(Arc::clone(child.name()))
                .with_worker_id(child.id().get()),
        );
    }

    async fn finish(mut self, exit: SupervisorExit) {
        self.registry.remove_supervisor(&self.name, &self.identity);
        self.bus.publish(
            Event::new(EventKind::SupervisorStopped)
                .with_supervisor(Arc::clone(&self.name))
                .with_reason(exit.to_string()),
        );
        if let Some(fan_out) = self.fan_out.take() {
            fan_out.close().await;
        }
        self.exit_tx.send_replace(Some(exit));
    }
}

/// Background listener forwarding bus events to a [`SubscriberSet`].
pub(crate) struct FanOut {
    done: CancellationToken,
    join: JoinHandle<()>,
}

impl FanOut {
    /// Spawns the listener. `rx` must be subscribed before the first publish.
    pub(crate) fn spawn(mut rx: broadcast::Receiver<Event>, set: SubscriberSet) -> Self {
        let done = CancellationToken::new();
        let stop = done.clone();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });
        Self { done, join }
    }

    /// Delivers everything already published, then waits for subscribers to finish.
    pub(crate) async fn close(self) {
        self.done.cancel();
        let _ = self.join.await;
    }

    /// Stops the listener without waiting.
    pub(crate) fn abandon(self) {
        self.done.cancel();
    }
}
