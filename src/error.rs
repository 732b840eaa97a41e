//! Error types used by the treevisor runtime, the registry and workers.
//!
//! This module defines three enums:
//!
//! - [`SupervisorError`]: errors raised at the supervisor boundary (startup, queries, shutdown).
//! - [`RegistryError`]: lookups and registrations against a [`Registry`](crate::Registry).
//! - [`WorkerError`]: what worker bodies and worker factories return.
//!
//! A worker failing at runtime is **not** a [`SupervisorError`]: it is reported
//! asynchronously on the failure channel and turned into a restart.
//! Every enum provides `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced at the supervisor boundary.
///
/// Only construction failures and shutdown problems cross this boundary;
/// child failures are absorbed and converted into restarts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Two child specs share the same name.
    #[error("supervisor '{supervisor}': duplicate child name '{child}'")]
    DuplicateChild {
        /// Name of the supervisor being built.
        supervisor: String,
        /// The duplicated child name.
        child: String,
    },

    /// A child factory could not produce a worker.
    #[error("supervisor '{supervisor}' create child '{child}' failed: {source}")]
    ChildConstruction {
        /// Name of the supervisor being built.
        supervisor: String,
        /// Name of the offending child spec.
        child: String,
        /// The factory error.
        #[source]
        source: WorkerError,
    },

    /// Registration of the supervisor or one of its actors failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The supervisor task has already terminated.
    #[error("supervisor '{supervisor}' is not running")]
    Stopped {
        /// Name of the stopped supervisor.
        supervisor: String,
    },

    /// Shutdown grace period was exceeded; some non-daemon children were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Children that did not stop in time.
        stuck: Vec<String>,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use treevisor::SupervisorError;
    /// use std::time::Duration;
    ///
    /// let err = SupervisorError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "supervisor_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::DuplicateChild { .. } => "supervisor_duplicate_child",
            SupervisorError::ChildConstruction { .. } => "supervisor_child_construction",
            SupervisorError::Registry(e) => e.as_label(),
            SupervisorError::Stopped { .. } => "supervisor_stopped",
            SupervisorError::GraceExceeded { .. } => "supervisor_grace_exceeded",
        }
    }
}

/// # Errors produced by the [`Registry`](crate::Registry).
///
/// `NotFound` signals a programmer or configuration error; it is always surfaced
/// to the caller and never replaced by a default handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry is registered under the name.
    #[error("'{name}' not found in registry")]
    NotFound {
        /// The looked-up name.
        name: String,
    },

    /// Another entry already holds the name.
    #[error("'{name}' is already registered")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },

    /// The entry exists but is a supervisor, not an actor.
    #[error("'{name}' is not an actor")]
    NotAnActor {
        /// The looked-up name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "registry_not_found",
            RegistryError::AlreadyRegistered { .. } => "registry_already_registered",
            RegistryError::NotAnActor { .. } => "registry_not_an_actor",
        }
    }
}

/// # Errors produced by workers and worker factories.
///
/// Returning [`WorkerError::Canceled`] from [`Worker::run`](crate::Worker::run) is a
/// normal termination. Every other variant returned from `run` is an abnormal
/// termination and is reported to the supervising watcher.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum WorkerError {
    /// Execution or construction failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed its stop request and exited.
    #[error("context cancelled")]
    Canceled,

    /// A nested supervisor gave up and escalates to its parent.
    #[error("supervisor '{supervisor}' escalated: {reason}")]
    Escalated {
        /// Name of the nested supervisor.
        supervisor: String,
        /// Why it gave up.
        reason: String,
    },
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    ///
    /// # Example
    /// ```
    /// use treevisor::WorkerError;
    ///
    /// let err = WorkerError::fail("boom");
    /// assert_eq!(err.to_string(), "execution failed: boom");
    /// assert_eq!(err.as_label(), "worker_failed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
            WorkerError::Escalated { .. } => "worker_escalated",
        }
    }

    /// Indicates whether returning this error from `run` counts as abnormal termination.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, WorkerError::Canceled)
    }
}
