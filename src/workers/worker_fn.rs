//! # Function-backed worker (`WorkerFn`)
//!
//! [`WorkerFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per run. Each restart builds a new `WorkerFn` through the child's factory,
//! so no state leaks between incarnations unless the closure captures an `Arc` on purpose.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use treevisor::{ChildSpec, WorkerError, WorkerFn};
//!
//! let spec = ChildSpec::worker("echo", 3u32, |_name: &str, retries: &u32| {
//!     let retries = *retries;
//!     Ok(WorkerFn::new(move |ctx: CancellationToken| async move {
//!         let _ = retries;
//!         ctx.cancelled().await;
//!         Ok::<_, WorkerError>(())
//!     }))
//! });
//! assert_eq!(spec.name(), "echo");
//! ```

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::workers::worker::Worker;

/// Function-backed worker implementation.
#[derive(Debug)]
pub struct WorkerFn<F> {
    f: F,
}

impl<F> WorkerFn<F> {
    /// Creates a new function-backed worker.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        (self.f)(ctx).await
    }
}
