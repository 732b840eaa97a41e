//! # treevisor
//!
//! **Treevisor** builds supervision trees out of tokio workers.
//!
//! A supervisor owns an ordered list of [`ChildSpec`]s. It constructs and starts them in
//! declared order, watches every child for abnormal termination and restarts the affected
//! children according to its [`RestartStrategy`]. If restarts pile up too fast it gives up,
//! stops all children and, when nested, escalates to its parent.
//!
//! ## Architecture
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │ Registry (injected, shared)  │◄── get_actor("db") / stop("api")
//!                 └──────▲───────────────▲───────┘
//!                        │ put/remove    │ put/remove
//! ┌──────────────────────┴───────────────┴──────────────────────────┐
//! │ Supervisor "root" (ONE_FOR_ALL)                                 │
//! │   specs: [db, cache, api]          intensity: 10 restarts / 10s │
//! └─────┬──────────────┬──────────────┬─────────────────────────────┘
//!       ▼              ▼              ▼
//!   ChildHandle    ChildHandle    SupervisedTree ──► Supervisor "api" (ONE_FOR_ONE)
//!   (actor db)     (actor cache)  (nested)             ├─ http
//!       │              │              │                └─ metrics
//!       └─ ChildFailure{name, id, cause} ─► failure channel ─► supervision task
//!
//! supervision task ── publish(Event) ──► Bus ──► fan-out ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ## Restart strategies
//! ```text
//! specs [A, B, C, D], B fails:
//!   ONE_FOR_ONE  → restart B
//!   ONE_FOR_ALL  → stop A, B, C, D (in order), restart A, B, C, D
//!   REST_FOR_ONE → stop B, C, D (in order), restart B, C, D; A untouched
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Workers**       | Async cancelable units, plain or actor-capable.              | [`Worker`], [`WorkerFn`], [`ChildSpec`]     |
//! | **Supervision**   | Ordered startup, strategies, storms, nesting, shutdown.      | [`Supervisor`], [`SupervisorBuilder`]       |
//! | **Registry**      | Name → actor / supervisor lookups.                           | [`Registry`], [`ActorRef`]                  |
//! | **Policies**      | Which siblings restart together, when to give up.            | [`RestartStrategy`], [`RestartIntensity`]   |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).       | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for startup, registry and workers.              | [`SupervisorError`], [`WorkerError`]        |
//! | **Configuration** | Join timeout, restart intensity, grace, bus capacity.        | [`SupervisorConfig`]                        |
//!
//! ## Optional features
//! - `logging` (default): exports the [`tracing`]-based `LogWriter` subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use treevisor::{ChildSpec, Registry, RestartStrategy, Supervisor, WorkerError, WorkerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new();
//!
//!     let pinger = ChildSpec::actor("pinger", 3u32, |_name: &str, _max_queue: usize, _n: &u32| {
//!         Ok(WorkerFn::new(|ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Ok::<_, WorkerError>(())
//!         }))
//!     });
//!
//!     let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
//!         .with_registry(Arc::clone(&registry))
//!         .with_child(pinger)
//!         .start()?;
//!
//!     assert!(registry.get_actor("pinger").is_ok());
//!     assert!(registry.get_supervisor("root").is_ok());
//!
//!     sup.shutdown().await?;
//!     assert!(registry.get_actor("pinger").is_err());
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use crate::core::{
    ActorRef, ChildInfo, Registry, RegistryEntry, Supervisor, SupervisorBuilder, SupervisorConfig,
    SupervisorExit, WorkerId,
};
pub use error::{RegistryError, SupervisorError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{RestartIntensity, RestartStats, RestartStrategy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{ChildSpec, DEFAULT_MAX_QUEUE_LEN, Worker, WorkerFn, WorkerKind, WorkerRef};

// Built-in tracing subscriber.
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

/// Renders a panic payload for failure reports and events.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
