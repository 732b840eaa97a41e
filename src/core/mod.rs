//! Runtime core: supervisors, children and the registry.
//!
//! Public API from this module:
//! - [`Supervisor`] / [`SupervisorBuilder`]: build, start, query and stop a supervisor;
//! - [`SupervisorConfig`]: join timeout, restart intensity, grace, bus capacity;
//! - [`Registry`]: injected name table for actors and supervisors.
//!
//! Internal modules:
//! - [`child`]: one child incarnation (construct, start, stop, join, failure report);
//! - [`runtime`]: the supervision task (strategy dispatch, restarts, storms, shutdown);
//! - [`nested`]: supervisors as children of other supervisors;
//! - [`shutdown`]: termination signal handling.

mod builder;
mod child;
mod config;
mod nested;
mod registry;
mod runtime;
mod shutdown;
mod supervisor;

#[cfg(test)]
mod tests;

pub use builder::SupervisorBuilder;
pub use child::WorkerId;
pub use config::SupervisorConfig;
pub use registry::{ActorRef, Registry, RegistryEntry};
pub use supervisor::{ChildInfo, Supervisor, SupervisorExit};
