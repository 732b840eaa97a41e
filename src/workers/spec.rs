//! # Child specification.
//!
//! [`ChildSpec`] is the immutable descriptor of one supervised unit:
//! - `name`: unique within the supervisor; also the registry key for actors
//! - factory: builds a fresh worker from the name and the typed init argument
//! - `init_arg`: handed to the factory again on every restart
//! - `max_queue_len`: mailbox bound for actor-capable workers (default 10, `0` = unchecked)
//! - `daemon`: whether [`shutdown`](crate::Supervisor::shutdown) may return while the unit still runs
//!
//! ## Variants
//! ```text
//! ChildSpec::worker(name, arg, |name, &arg| ...)             plain, never registered
//! ChildSpec::actor(name, arg, |name, max_queue_len, &arg| ...)  registered as ActorRef
//! ChildSpec::supervisor(builder)                              nested supervisor (plain)
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::WorkerError;
use crate::workers::worker::{Worker, WorkerRef};

/// Default mailbox bound for actor-capable workers.
pub const DEFAULT_MAX_QUEUE_LEN: usize = 10;

/// Which flavor of worker a spec produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Plain worker, not registered.
    Plain,
    /// Actor-capable worker, registered by name while running.
    Actor,
    /// Nested supervisor.
    Supervisor,
}

/// Output of a factory call: the runnable worker plus its concrete instance for downcasting.
pub(crate) struct Built {
    pub(crate) worker: WorkerRef,
    pub(crate) instance: Arc<dyn Any + Send + Sync>,
}

impl Built {
    fn new<W: Worker>(worker: W) -> Self {
        let worker = Arc::new(worker);
        Self {
            worker: worker.clone(),
            instance: worker,
        }
    }
}

type Factory = dyn Fn(&str, usize) -> Result<Built, WorkerError> + Send + Sync;

/// Immutable descriptor of one supervised unit.
///
/// Cheap to clone: the factory and the init argument are shared.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use treevisor::{ChildSpec, WorkerError, WorkerFn, WorkerKind};
///
/// let spec = ChildSpec::actor("cache", String::from("redis://localhost"), |_name: &str, _max_queue: usize, url: &String| {
///     let url = url.clone();
///     Ok(WorkerFn::new(move |ctx: CancellationToken| {
///         let _url = url.clone();
///         async move {
///             ctx.cancelled().await;
///             Ok::<_, WorkerError>(())
///         }
///     }))
/// })
/// .with_max_queue_len(64)
/// .with_daemon(true);
///
/// assert_eq!(spec.kind(), WorkerKind::Actor);
/// assert_eq!(spec.max_queue_len(), 64);
/// assert!(spec.is_daemon());
/// assert_eq!(spec.init_arg::<String>().map(String::as_str), Some("redis://localhost"));
/// ```
#[derive(Clone)]
pub struct ChildSpec {
    name: Arc<str>,
    kind: WorkerKind,
    factory: Arc<Factory>,
    init_arg: Arc<dyn Any + Send + Sync>,
    max_queue_len: usize,
    daemon: bool,
}

impl ChildSpec {
    /// Describes a plain worker built by `factory(name, &arg)`.
    pub fn worker<A, W, F>(name: impl Into<Arc<str>>, arg: A, factory: F) -> Self
    where
        A: Send + Sync + 'static,
        W: Worker,
        F: Fn(&str, &A) -> Result<W, WorkerError> + Send + Sync + 'static,
    {
        let arg = Arc::new(arg);
        let captured = Arc::clone(&arg);
        Self::from_parts(
            name.into(),
            WorkerKind::Plain,
            Arc::new(move |name: &str, _max_queue_len: usize| {
                factory(name, &captured).map(Built::new)
            }),
            arg,
        )
    }

    /// Describes an actor-capable worker built by `factory(name, max_queue_len, &arg)`.
    ///
    /// The instance is registered in the supervisor's registry before it starts and
    /// unregistered when it is stopped or replaced.
    pub fn actor<A, W, F>(name: impl Into<Arc<str>>, arg: A, factory: F) -> Self
    where
        A: Send + Sync + 'static,
        W: Worker,
        F: Fn(&str, usize, &A) -> Result<W, WorkerError> + Send + Sync + 'static,
    {
        let arg = Arc::new(arg);
        let captured = Arc::clone(&arg);
        Self::from_parts(
            name.into(),
            WorkerKind::Actor,
            Arc::new(move |name: &str, max_queue_len: usize| {
                factory(name, max_queue_len, &captured).map(Built::new)
            }),
            arg,
        )
    }

    pub(crate) fn nested<A, W, F>(name: Arc<str>, arg: A, factory: F) -> Self
    where
        A: Send + Sync + 'static,
        W: Worker,
        F: Fn(&A) -> W + Send + Sync + 'static,
    {
        let arg = Arc::new(arg);
        let captured = Arc::clone(&arg);
        Self::from_parts(
            name,
            WorkerKind::Supervisor,
            Arc::new(move |_name: &str, _max_queue_len: usize| Ok(Built::new(factory(&captured)))),
            arg,
        )
    }

    fn from_parts(
        name: Arc<str>,
        kind: WorkerKind,
        factory: Arc<Factory>,
        init_arg: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            name,
            kind,
            factory,
            init_arg,
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
            daemon: false,
        }
    }

    /// Returns a copy with a different mailbox bound.
    ///
    /// `0` disables queue-length checking in actors that honor it. This is dangerous:
    /// an unbounded mailbox can grow until the process runs out of memory.
    pub fn with_max_queue_len(mut self, max_queue_len: usize) -> Self {
        self.max_queue_len = max_queue_len;
        self
    }

    /// Returns a copy with a different daemon flag.
    pub fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Returns the child name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Returns the worker flavor.
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Returns the init argument if it has type `A`.
    pub fn init_arg<A: 'static>(&self) -> Option<&A> {
        self.init_arg.downcast_ref::<A>()
    }

    /// Returns the mailbox bound handed to actor factories.
    pub fn max_queue_len(&self) -> usize {
        self.max_queue_len
    }

    /// Returns `true` if the unit may outlive a graceful shutdown.
    pub fn is_daemon(&self) -> bool {
        self.daemon
    }

    /// Runs the factory once. A panicking factory counts as a failed construction.
    pub(crate) fn build(&self) -> Result<Built, WorkerError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            (self.factory)(&self.name, self.max_queue_len)
        }))
        .unwrap_or_else(|payload| {
            Err(WorkerError::fail(format!(
                "factory panicked: {}",
                crate::panic_message(&*payload)
            )))
        })
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("max_queue_len", &self.max_queue_len)
            .field("daemon", &self.daemon)
            .finish_non_exhaustive()
    }
}
