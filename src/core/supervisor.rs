//! # Supervisor: handle to a running supervision task.
//!
//! A [`Supervisor`] is a cheap, cloneable handle. The state it refers to (child handles,
//! restart counters) is owned by a single background task and only ever touched there;
//! the handle talks to it through a control channel.
//!
//! ## High-level architecture
//! ```text
//! SupervisorBuilder::start()
//!   ├─ register self in Registry
//!   ├─ construct every child in order (actors registered)      ← phase 1
//!   ├─ start every child in order                               ← phase 2
//!   └─ spawn supervision task
//!
//! supervision task (single consumer, one message at a time):
//!   ├─ control_rx: StopAll | Shutdown | WhichChildren | RestartStats
//!   └─ failure_rx: ChildFailure { name, id, cause }  (merged from every child)
//!         └─► strategy dispatch ─► restart ─► RestartIntensity::record
//!                                               └─ storm → self-shutdown
//! ```
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use treevisor::{ChildSpec, RestartStrategy, Supervisor, SupervisorExit, WorkerError, WorkerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ticker = ChildSpec::worker("ticker", (), |_name: &str, _: &()| {
//!         Ok(WorkerFn::new(|ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Ok::<_, WorkerError>(())
//!         }))
//!     });
//!
//!     let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
//!         .with_child(ticker)
//!         .start()?;
//!
//!     assert_eq!(sup.which_children().await?.len(), 1);
//!     sup.shutdown().await?;
//!     assert_eq!(sup.wait().await, SupervisorExit::Stopped);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::core::builder::SupervisorBuilder;
use crate::core::child::WorkerId;
use crate::core::shutdown;
use crate::error::SupervisorError;
use crate::events::{Bus, Event};
use crate::policies::{RestartStats, RestartStrategy};
use crate::workers::WorkerKind;

/// Why a supervision task terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorExit {
    /// Stopped on request (`stop_all`, `shutdown`, registry `stop`).
    Stopped,
    /// Gave up after too many restarts with short gaps.
    RestartStorm {
        /// Count that exceeded the threshold.
        restart_count: u32,
    },
    /// A child factory failed while restarting.
    RestartFailed {
        /// The child that could not be rebuilt.
        child: String,
        /// Factory or registration error.
        error: String,
    },
}

impl SupervisorExit {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorExit::Stopped => "stopped",
            SupervisorExit::RestartStorm { .. } => "restart_storm",
            SupervisorExit::RestartFailed { .. } => "restart_failed",
        }
    }

    /// Returns `true` for exits that escalate to a parent supervisor.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, SupervisorExit::Stopped)
    }
}

impl fmt::Display for SupervisorExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorExit::Stopped => f.write_str("stopped"),
            SupervisorExit::RestartStorm { restart_count } => {
                write!(f, "restart storm ({restart_count} restarts)")
            }
            SupervisorExit::RestartFailed { child, error } => {
                write!(f, "restart of '{child}' failed: {error}")
            }
        }
    }
}

/// Snapshot of one child, in declared order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildInfo {
    /// Child name.
    pub name: String,
    /// Identity of the current incarnation.
    pub id: WorkerId,
    /// Worker flavor.
    pub kind: WorkerKind,
    /// Daemon flag.
    pub daemon: bool,
    /// Whether the worker task is still running.
    pub alive: bool,
}

/// Commands processed by the supervision task.
pub(crate) enum Control {
    StopAll,
    Shutdown {
        respond_to: oneshot::Sender<Result<(), SupervisorError>>,
    },
    WhichChildren {
        respond_to: oneshot::Sender<Vec<ChildInfo>>,
    },
    RestartStats {
        respond_to: oneshot::Sender<RestartStats>,
    },
}

struct Inner {
    name: Arc<str>,
    strategy: RestartStrategy,
    control: mpsc::UnboundedSender<Control>,
    exit: watch::Receiver<Option<SupervisorExit>>,
    bus: Bus,
}

/// Names one supervisor incarnation without keeping its control channel open.
pub(crate) struct SupervisorIdentity(Weak<Inner>);

impl SupervisorIdentity {
    /// `true` if `sup` is a handle to this same incarnation.
    pub(crate) fn is(&self, sup: &Supervisor) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&sup.inner))
    }
}

/// Handle to a running supervisor.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Starts describing a supervisor named `name` using `strategy`.
    pub fn builder(name: impl Into<Arc<str>>, strategy: RestartStrategy) -> SupervisorBuilder {
        SupervisorBuilder::new(name, strategy)
    }

    pub(crate) fn new(
        name: Arc<str>,
        strategy: RestartStrategy,
        control: mpsc::UnboundedSender<Control>,
        exit: watch::Receiver<Option<SupervisorExit>>,
        bus: Bus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                strategy,
                control,
                exit,
                bus,
            }),
        }
    }

    pub(crate) fn identity(&self) -> SupervisorIdentity {
        SupervisorIdentity(Arc::downgrade(&self.inner))
    }

    /// Returns the supervisor name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the configured restart strategy.
    pub fn strategy(&self) -> RestartStrategy {
        self.inner.strategy
    }

    /// Requests a cooperative stop of every child, in declared order, and of the supervisor.
    ///
    /// Never blocks and never joins children: each child gets a stop request and its
    /// name is unregistered. Calling it on a stopped supervisor is a no-op.
    pub fn stop_all(&self) {
        let _ = self.inner.control.send(Control::StopAll);
    }

    /// Stops every child and waits up to the configured grace for non-daemon children.
    ///
    /// Daemon children are never awaited. Returns [`SupervisorError::GraceExceeded`]
    /// with the names of stuck children on timeout. Returns `Ok(())` if the supervisor
    /// had already stopped.
    pub async fn shutdown(&self) -> Result<(), SupervisorError> {
        let (tx, rx) = oneshot::channel();
        if self
            .inner
            .control
            .send(Control::Shutdown { respond_to: tx })
            .is_err()
        {
            return Ok(());
        }
        rx.await.unwrap_or(Ok(()))
    }

    /// Runs until a termination signal (then [`shutdown`](Self::shutdown)) or until the
    /// supervisor exits on its own.
    pub async fn run_until_signal(&self) -> Result<(), SupervisorError> {
        tokio::select! {
            signal = shutdown::wait_for_shutdown_signal() => match signal {
                Ok(()) => self.shutdown().await,
                Err(_) => {
                    self.wait().await;
                    Ok(())
                }
            },
            _ = self.wait() => Ok(()),
        }
    }

    /// Returns the children in declared order with their current incarnation.
    pub async fn which_children(&self) -> Result<Vec<ChildInfo>, SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.request(Control::WhichChildren { respond_to: tx }, rx)
            .await
    }

    /// Returns the restart-storm counters.
    pub async fn restart_stats(&self) -> Result<RestartStats, SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.request(Control::RestartStats { respond_to: tx }, rx)
            .await
    }

    /// Waits until the supervision task terminates and returns why.
    pub async fn wait(&self) -> SupervisorExit {
        let mut rx = self.inner.exit.clone();
        if let Ok(exit) = rx.wait_for(Option::is_some).await {
            if let Some(exit) = exit.clone() {
                return exit;
            }
        }
        rx.borrow().clone().unwrap_or(SupervisorExit::Stopped)
    }

    /// Returns the exit reason once the supervision task has terminated.
    pub fn exit(&self) -> Option<SupervisorExit> {
        self.inner.exit.borrow().clone()
    }

    /// Returns `true` while the supervision task is running.
    pub fn is_running(&self) -> bool {
        self.exit().is_none()
    }

    /// Creates a receiver for subsequent runtime events of this supervisor.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    async fn request<T>(
        &self,
        cmd: Control,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, SupervisorError> {
        let stopped = || SupervisorError::Stopped {
            supervisor: self.name().to_string(),
        };
        self.inner.control.send(cmd).map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.inner.name)
            .field("strategy", &self.inner.strategy)
            .field("exit", &self.exit())
            .finish()
    }
}
