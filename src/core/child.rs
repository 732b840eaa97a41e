//! # ChildHandle: one running incarnation of a child spec.
//!
//! A handle is created in two phases so that registration can happen before anything runs:
//! ```text
//! construct(spec, watcher) ─► factory call, new WorkerId, ActorRef (if actor)
//! start()                  ─► tokio::spawn(run(ctx))
//!                               └─ on abnormal exit: watcher.send(ChildFailure) exactly once
//! ```
//!
//! ## Rules
//! - Every construction gets a fresh [`WorkerId`]: identity changes on every restart.
//! - Stop is cooperative only (cancel the token); the task is **never aborted**.
//! - A handle whose task outlives a bounded join is orphaned: the join handle is dropped
//!   (detached) and any report it sends later carries a stale id.
//! - Terminations after a stop request are normal and never reported.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::registry::ActorRef;
use crate::error::WorkerError;
use crate::workers::{ChildSpec, WorkerKind, WorkerRef};

/// Global counter for worker identities.
static WORKER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one worker incarnation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn next() -> Self {
        Self(WORKER_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Abnormal termination report sent by a child to its watcher.
#[derive(Debug)]
pub(crate) struct ChildFailure {
    pub(crate) name: Arc<str>,
    pub(crate) id: WorkerId,
    pub(crate) cause: String,
}

pub(crate) type FailureSender = mpsc::UnboundedSender<ChildFailure>;

/// Runtime handle of one child incarnation.
pub(crate) struct ChildHandle {
    id: WorkerId,
    name: Arc<str>,
    kind: WorkerKind,
    daemon: bool,
    worker: WorkerRef,
    actor: Option<ActorRef>,
    token: CancellationToken,
    watcher: FailureSender,
    join: Option<JoinHandle<()>>,
}

impl ChildHandle {
    /// Builds a new incarnation from `spec` and binds it to `watcher`. Does not start it.
    pub(crate) fn construct(spec: &ChildSpec, watcher: FailureSender) -> Result<Self, WorkerError> {
        let built = spec.build()?;
        let id = WorkerId::next();
        let token = CancellationToken::new();
        let actor = (spec.kind() == WorkerKind::Actor).then(|| {
            ActorRef::new(
                Arc::clone(spec.name_arc()),
                id,
                token.clone(),
                built.instance,
            )
        });

        Ok(Self {
            id,
            name: Arc::clone(spec.name_arc()),
            kind: spec.kind(),
            daemon: spec.is_daemon(),
            worker: built.worker,
            actor,
            token,
            watcher,
            join: None,
        })
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.id
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub(crate) fn is_daemon(&self) -> bool {
        self.daemon
    }

    /// Registry handle, present only for actor-capable children.
    pub(crate) fn actor(&self) -> Option<&ActorRef> {
        self.actor.as_ref()
    }

    /// Spawns the worker. Calling `start` twice is a no-op.
    pub(crate) fn start(&mut self) {
        if self.join.is_some() {
            return;
        }
        let worker = Arc::clone(&self.worker);
        let token = self.token.clone();
        let watcher = self.watcher.clone();
        let name = Arc::clone(&self.name);
        let id = self.id;

        self.join = Some(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(worker.run(token.clone()))
                .catch_unwind()
                .await;
            let cause = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) if e.is_abnormal() => Some(e.to_string()),
                Ok(Err(_)) => None,
                Err(panic) => Some(format!("panicked: {}", crate::panic_message(&*panic))),
            };
            if token.is_cancelled() {
                return;
            }
            if let Some(cause) = cause {
                let _ = watcher.send(ChildFailure { name, id, cause });
            }
        }));
    }

    /// Cooperative, non-blocking stop request.
    pub(crate) fn request_normal_stop(&self) {
        self.token.cancel();
    }

    /// Returns `true` while the worker task is running.
    pub(crate) fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Waits up to `timeout` for the worker task to finish. Returns `true` if it did.
    pub(crate) async fn join(&mut self, timeout: Duration) -> bool {
        let Some(join) = self.join.as_mut() else {
            return true;
        };
        match time::timeout(timeout, join).await {
            Ok(_) => {
                self.join = None;
                true
            }
            Err(_elapsed) => false,
        }
    }

    /// Waits for the worker task to finish, however long it takes.
    ///
    /// Cancel-safe: if the wait is dropped the handle still tracks the task.
    pub(crate) async fn wait(&mut self) {
        if let Some(join) = self.join.as_mut() {
            let _ = join.await;
            self.join = None;
        }
    }

    /// Detaches the worker task without killing it.
    pub(crate) fn orphan(mut self) {
        drop(self.join.take());
    }
}
