//! # Worker abstractions and child specifications.
//!
//! This module provides the worker-related types:
//! - [`Worker`] - trait for implementing async cancelable units
//! - [`WorkerFn`] - function-backed worker implementation
//! - [`WorkerRef`] - shared reference to a worker (`Arc<dyn Worker>`)
//! - [`ChildSpec`] - descriptor bundling a worker factory with its init argument

mod spec;
mod worker;
mod worker_fn;

pub use spec::{ChildSpec, DEFAULT_MAX_QUEUE_LEN, WorkerKind};
pub use worker::{Worker, WorkerRef};
pub use worker_fn::WorkerFn;
