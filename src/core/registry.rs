//! # Name registry for actors and supervisors.
//!
//! [`Registry`] maps a logical name to a live handle. Supervisors write the entries of
//! their own actor-capable children (and of themselves); anyone may read.
//!
//! ## Architecture
//! ```text
//! Supervisor "root" ──put("root", Supervisor)──┐
//!   ├─ construct "db"    ──put("db", Actor)────┤
//!   ├─ construct "cache" ──put("cache", Actor)─┼──► Registry (RwLock<HashMap>)
//!   └─ start db, cache                         │        ▲
//!                                              │        └── get_actor("db") from siblings
//! ```
//!
//! ## Rules
//! - The registry is **injected** into each supervisor; several trees may share one.
//! - `put` fails on a taken name; `remove` is idempotent.
//! - A supervisor only removes entries it wrote itself. Once a name was freed by
//!   [`Registry::stop`] and taken by someone else, the old owner leaves it alone.
//! - `get` of an unknown name is always `RegistryError::NotFound`.
//! - Critical sections are short and never await, so a std `RwLock` is used.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use crate::core::child::WorkerId;
use crate::core::supervisor::{Supervisor, SupervisorIdentity};
use crate::error::RegistryError;

/// Registry handle of a running actor-capable worker.
///
/// One `ActorRef` refers to exactly one incarnation; after a restart the registry holds a
/// new `ActorRef` with a different [`WorkerId`].
#[derive(Clone)]
pub struct ActorRef {
    name: Arc<str>,
    id: WorkerId,
    stop: CancellationToken,
    instance: Arc<dyn Any + Send + Sync>,
}

impl ActorRef {
    pub(crate) fn new(
        name: Arc<str>,
        id: WorkerId,
        stop: CancellationToken,
        instance: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            name,
            id,
            stop,
            instance,
        }
    }

    /// Returns the registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the identity of this incarnation.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns the concrete worker if it has type `W`.
    ///
    /// This is how siblings reach an actor's own API (mailbox sender, state, ...).
    pub fn downcast<W: Send + Sync + 'static>(&self) -> Option<Arc<W>> {
        Arc::clone(&self.instance).downcast::<W>().ok()
    }

    /// Requests a cooperative stop of this incarnation.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Returns `true` once a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// One registry entry.
#[derive(Clone, Debug)]
pub enum RegistryEntry {
    /// An actor-capable worker.
    Actor(ActorRef),
    /// A supervisor registered under its own name.
    Supervisor(Supervisor),
}

/// Thread-safe name → handle table.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl Registry {
    /// Creates a new, empty shared registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `entry` under `name`.
    ///
    /// Fails with [`RegistryError::AlreadyRegistered`] if the name is taken.
    pub fn put(&self, name: &str, entry: RegistryEntry) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        entries.insert(name.to_string(), entry);
        Ok(())
    }

    /// Unregisters `name`, returning the removed entry. Removing an absent name is a no-op.
    pub fn remove(&self, name: &str) -> Option<RegistryEntry> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Removes `name` only if `owned` accepts the current entry.
    fn remove_if(&self, name: &str, owned: impl FnOnce(&RegistryEntry) -> bool) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(name).is_some_and(owned) {
            entries.remove(name);
            return true;
        }
        false
    }

    /// Removes the actor entry of incarnation `id`, leaving any other entry in place.
    pub(crate) fn remove_actor(&self, name: &str, id: WorkerId) -> bool {
        self.remove_if(name, |entry| {
            matches!(entry, RegistryEntry::Actor(actor) if actor.id() == id)
        })
    }

    /// Removes the entry of supervisor `owner`, leaving any other entry in place.
    pub(crate) fn remove_supervisor(&self, name: &str, owner: &SupervisorIdentity) -> bool {
        self.remove_if(name, |entry| {
            matches!(entry, RegistryEntry::Supervisor(sup) if owner.is(sup))
        })
    }

    /// Looks up `name`.
    pub fn get(&self, name: &str) -> Result<RegistryEntry, RegistryError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Looks up an actor by name.
    pub fn get_actor(&self, name: &str) -> Result<ActorRef, RegistryError> {
        match self.get(name)? {
            RegistryEntry::Actor(actor) => Ok(actor),
            RegistryEntry::Supervisor(_) => Err(RegistryError::NotAnActor {
                name: name.to_string(),
            }),
        }
    }

    /// Looks up a supervisor by name.
    pub fn get_supervisor(&self, name: &str) -> Result<Supervisor, RegistryError> {
        match self.get(name)? {
            RegistryEntry::Supervisor(sup) => Ok(sup),
            RegistryEntry::Actor(_) => Err(RegistryError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Removes `name` and asks the entry to stop.
    ///
    /// - actor → cooperative stop request
    /// - supervisor → [`Supervisor::stop_all`]
    pub fn stop(&self, name: &str) -> Result<(), RegistryError> {
        match self.remove(name) {
            Some(RegistryEntry::Actor(actor)) => {
                actor.request_stop();
                Ok(())
            }
            Some(RegistryEntry::Supervisor(sup)) => {
                sup.stop_all();
                Ok(())
            }
            None => Err(RegistryError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Returns sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
