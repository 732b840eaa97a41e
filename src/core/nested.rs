//! # Nested supervisors.
//!
//! A supervisor becomes a child of another supervisor through [`ChildSpec::supervisor`].
//! Each incarnation starts the builder again, so a restart yields a fresh subtree.
//!
//! ```text
//! parent ──run(ctx)──► SupervisedTree
//!                        ├─ builder.start() → child Supervisor
//!                        ├─ ctx cancelled  → stop_all, wait          → Ok(())
//!                        └─ child exits on its own
//!                             ├─ Stopped                             → Ok(())
//!                             └─ RestartStorm / RestartFailed        → Err(Escalated)
//! ```
//!
//! An escalated error is an abnormal termination for the parent, which applies its
//! own strategy and restart intensity to the whole subtree.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SupervisorBuilder;
use crate::error::WorkerError;
use crate::workers::{ChildSpec, Worker};

/// Worker running one incarnation of a nested supervisor.
struct SupervisedTree {
    builder: SupervisorBuilder,
}

#[async_trait]
impl Worker for SupervisedTree {
    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        let sup = self
            .builder
            .start()
            .map_err(|e| WorkerError::fail(e.to_string()))?;

        tokio::select! {
            _ = ctx.cancelled() => {
                sup.stop_all();
                sup.wait().await;
                Ok(())
            }
            exit = sup.wait() => {
                if exit.is_abnormal() {
                    Err(WorkerError::Escalated {
                        supervisor: sup.name().to_string(),
                        reason: exit.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl ChildSpec {
    /// Describes a nested supervisor started from `builder`.
    ///
    /// The child is named after the nested supervisor. Share a registry between
    /// parent and child builders to reach the subtree's actors by name.
    pub fn supervisor(builder: SupervisorBuilder) -> Self {
        let name = builder.name().into();
        ChildSpec::nested(name, builder, |builder: &SupervisorBuilder| SupervisedTree {
            builder: builder.clone(),
        })
    }
}
