//! # SupervisorBuilder: describe, then start, a supervisor.
//!
//! The builder is a plain value: it can be cloned, stored, and started several times
//! (a nested supervisor is restarted by starting its builder again).
//!
//! ## Startup sequence
//! ```text
//! start()
//!   ├─ reject duplicate child names
//!   ├─ bus + subscriber fan-out (subscribed before the first publish)
//!   ├─ registry.put(name, Supervisor)
//!   ├─ construct every child in order; register actors     (nothing runs yet)
//!   │    └─ any error → unregister what was registered, fail
//!   ├─ start every child in order                          (ChildStarted)
//!   └─ spawn supervision task                              (SupervisorStarted)
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::core::child::{ChildHandle, FailureSender};
use crate::core::config::SupervisorConfig;
use crate::core::registry::{Registry, RegistryEntry};
use crate::core::runtime::{FanOut, SupervisorTask};
use crate::core::supervisor::Supervisor;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RestartIntensity, RestartStrategy};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::ChildSpec;

/// Builder for a [`Supervisor`].
#[derive(Clone)]
pub struct SupervisorBuilder {
    name: Arc<str>,
    strategy: RestartStrategy,
    cfg: SupervisorConfig,
    specs: Vec<ChildSpec>,
    registry: Arc<Registry>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a builder with default configuration and a private registry.
    pub fn new(name: impl Into<Arc<str>>, strategy: RestartStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
            cfg: SupervisorConfig::default(),
            specs: Vec::new(),
            registry: Registry::new(),
            subscribers: Vec::new(),
        }
    }

    /// Appends a child. Declaration order drives startup, restarts and stops.
    pub fn with_child(mut self, spec: ChildSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Appends several children, in iteration order.
    pub fn with_children(mut self, specs: impl IntoIterator<Item = ChildSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Injects a shared registry.
    ///
    /// Supervisors of one tree usually share a registry so that siblings and
    /// parents can look each other up by name.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive this supervisor's runtime events through dedicated
    /// workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Returns the supervisor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the child specs in declared order.
    pub fn specs(&self) -> &[ChildSpec] {
        &self.specs
    }

    /// Returns the injected registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Constructs, registers and starts every child, then spawns the supervision task.
    ///
    /// Must be called from within a tokio runtime. On error nothing keeps running and
    /// every name registered by this call is removed again.
    pub fn start(&self) -> Result<Supervisor, SupervisorError> {
        self.check_unique_names()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let fan_out = (!self.subscribers.is_empty()).then(|| {
            let rx = bus.subscribe();
            FanOut::spawn(rx, SubscriberSet::new(self.subscribers.clone(), bus.clone()))
        });

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        let sup = Supervisor::new(
            Arc::clone(&self.name),
            self.strategy,
            control_tx,
            exit_rx,
            bus.clone(),
        );

        if let Err(e) = self
            .registry
            .put(&self.name, RegistryEntry::Supervisor(sup.clone()))
        {
            if let Some(fan_out) = fan_out {
                fan_out.abandon();
            }
            return Err(e.into());
        }

        let mut children = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            match self.construct(spec, &failure_tx) {
                Ok(child) => children.push(child),
                Err(err) => {
                    bus.publish(
                        Event::new(EventKind::ChildConstructionFailed)
                            .with_supervisor(Arc::clone(&self.name))
                            .with_child(Arc::clone(spec.name_arc()))
                            .with_reason(err.to_string()),
                    );
                    for child in &children {
                        if child.actor().is_some() {
                            self.registry.remove_actor(child.name(), child.id());
                        }
                    }
                    self.registry.remove_supervisor(&self.name, &sup.identity());
                    if let Some(fan_out) = fan_out {
                        fan_out.abandon();
                    }
                    return Err(err);
                }
            }
        }

        for child in &mut children {
            child.start();
            bus.publish(
                Event::new(EventKind::ChildStarted)
                    .with_supervisor(Arc::clone(&self.name))
                    .with_child(Arc::clone(child.name()))
                    .with_worker_id(child.id().get()),
            );
        }
        bus.publish(Event::new(EventKind::SupervisorStarted).with_supervisor(Arc::clone(&self.name)));

        let task = SupervisorTask {
            name: Arc::clone(&self.name),
            identity: sup.identity(),
            strategy: self.strategy,
            intensity: RestartIntensity::new(self.cfg.max_restarts, self.cfg.restart_window),
            cfg: self.cfg.clone(),
            specs: self.specs.clone(),
            children: children.into_iter().map(Some).collect(),
            registry: Arc::clone(&self.registry),
            bus,
            control_rx,
            failure_tx,
            failure_rx,
            exit_tx,
            fan_out,
        };
        tokio::spawn(task.run());
        Ok(sup)
    }

    fn check_unique_names(&self) -> Result<(), SupervisorError> {
        let mut seen = HashSet::with_capacity(self.specs.len());
        for spec in &self.specs {
            if !seen.insert(spec.name()) {
                return Err(SupervisorError::DuplicateChild {
                    supervisor: self.name.to_string(),
                    child: spec.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn construct(
        &self,
        spec: &ChildSpec,
        failure_tx: &FailureSender,
    ) -> Result<ChildHandle, SupervisorError> {
        let child = ChildHandle::construct(spec, failure_tx.clone()).map_err(|source| {
            SupervisorError::ChildConstruction {
                supervisor: self.name.to_string(),
                child: spec.name().to_string(),
                source,
            }
        })?;
        if let Some(actor) = child.actor() {
            self.registry
                .put(spec.name(), RegistryEntry::Actor(actor.clone()))?;
        }
        Ok(child)
    }
}

impl std::fmt::Debug for SupervisorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorBuilder")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("cfg", &self.cfg)
            .field("specs", &self.specs)
            .finish_non_exhaustive()
    }
}
