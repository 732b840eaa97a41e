//! [`LogWriter`]: turns supervisor events into `tracing` records.
//!
//! Every record uses target `treevisor` and carries the supervisor, child and worker id
//! as fields. Levels:
//!
//! | Level   | Events                                                                |
//! |---------|-----------------------------------------------------------------------|
//! | `error` | child failed, child construction failed, restart storm                |
//! | `warn`  | child orphaned after stop timeout, grace exceeded, subscriber faults  |
//! | `info`  | supervisor started or stopped, shutdown requested, clean shutdown     |
//! | `debug` | child started, child stop requested                                   |
//!
//! With `tracing_subscriber::fmt` installed:
//! ```text
//! ERROR treevisor: child exited abnormally supervisor="root" child="db" worker_id=4 reason="connection refused"
//! WARN  treevisor: child ignored stop request, orphaned supervisor="root" child="cache" worker_id=3 timeout_ms=5000
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber logging every event through `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let supervisor = e.supervisor.as_deref().unwrap_or("-");
        let child = e.child.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ChildStarted => {
                debug!(target: "treevisor", supervisor, child, worker_id = e.worker_id, "child started");
            }
            EventKind::ChildStopRequested => {
                debug!(target: "treevisor", supervisor, child, worker_id = e.worker_id, "child stop requested");
            }
            EventKind::ChildFailed => {
                error!(target: "treevisor", supervisor, child, worker_id = e.worker_id, reason, "child exited abnormally");
            }
            EventKind::ChildStopTimeout => {
                warn!(target: "treevisor", supervisor, child, worker_id = e.worker_id, timeout_ms = e.timeout_ms, "child ignored stop request, orphaned");
            }
            EventKind::ChildConstructionFailed => {
                error!(target: "treevisor", supervisor, child, reason, "child construction failed");
            }
            EventKind::SupervisorStarted => {
                info!(target: "treevisor", supervisor, "supervisor started all children");
            }
            EventKind::RestartStormDetected => {
                error!(target: "treevisor", supervisor, restart_count = e.restart_count, "restart storm, supervisor stopping itself");
            }
            EventKind::SupervisorStopped => {
                info!(target: "treevisor", supervisor, reason, "supervisor stopped");
            }
            EventKind::ShutdownRequested => {
                info!(target: "treevisor", supervisor, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: "treevisor", supervisor, "all children stopped within grace");
            }
            EventKind::GraceExceeded => {
                warn!(target: "treevisor", supervisor, grace_ms = e.timeout_ms, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "treevisor", supervisor, subscriber = child, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "treevisor", subscriber = child, details = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
