//! # Worker contract.
//!
//! A [`Worker`] is one supervised unit of concurrent execution. The supervisor runs each
//! worker in its own tokio task and hands it a [`CancellationToken`]: cancellation is the
//! cooperative stop request, and the worker should exit promptly once it observes it.
//!
//! ## Termination
//! ```text
//! run(ctx) ─► Ok(())                  normal, not restarted
//!          ─► Err(Canceled)           normal (stop honored)
//!          ─► Err(Fail | Escalated)   abnormal → reported to the supervisor once
//!          ─► panic                   abnormal → reported to the supervisor once
//! ```
//! Anything returned after a stop was requested is treated as normal termination.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// # Asynchronous, cancelable supervised unit.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use treevisor::{Worker, WorkerError};
///
/// struct Ticker { name: String }
///
/// #[async_trait]
/// impl Worker for Ticker {
///     async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
///         loop {
///             tokio::select! {
///                 _ = ctx.cancelled() => return Ok(()),
///                 _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
///                     // tick for self.name...
///                 }
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Executes the worker until completion, failure or cancellation.
    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError>;
}

/// Shared reference to a worker instance.
pub type WorkerRef = Arc<dyn Worker>;
