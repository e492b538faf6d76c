//! # Engine: the registry and its request dispatcher.
//!
//! The [`Engine`] owns every [`ServiceRecord`] in a single
//! reader/writer-locked map and serialises the five operator requests
//! against it: add, delete, start, stop, list — plus the one-shot
//! initial fleet admission at daemon startup.
//!
//! ## Locking rules
//! - Structural operations (admit, drop, lookup) go through the map's
//!   lock; readers share it, add/delete take it exclusively.
//! - Per-record fields (status, adjacency) use the record's own locks.
//! - Signals are delivered after the map lock is released, so a slow
//!   supervisor never stalls unrelated requests.
//!
//! ## Readiness propagation
//! Supervisors call back through a `Weak` handle when a probe passes;
//! the engine then rescans that service's children and starts the ones
//! whose parents are now all ready. A parent name that resolves to
//! nothing (deleted after admission) counts as not ready.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot, RwLock};

use crate::config::Config;
use crate::core::actor::ServiceActor;
use crate::error::EngineError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{ServiceDefinition, ServiceRecord, SignalReceivers, Status, tokenize};
use crate::subscribers::{spawn_listener, Subscribe};

/// One `(name, status)` entry of a [`Engine::list`] snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Service name.
    pub name: String,
    /// Status at snapshot time.
    pub status: Status,
}

/// The service lifecycle engine.
///
/// Construct one per daemon with [`Engine::new`], admit the declared
/// fleet with [`Engine::admit_fleet`], then serve operator requests.
/// All state is instance state: engines coexist freely in one process.
pub struct Engine {
    cfg: Config,
    bus: Bus,
    services: RwLock<HashMap<String, Arc<ServiceRecord>>>,
}

impl Engine {
    /// Creates an engine and hooks up its subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        spawn_listener(bus.clone(), subscribers);
        Arc::new(Self {
            cfg,
            bus,
            services: RwLock::new(HashMap::new()),
        })
    }

    /// Observes the engine's lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Admits the declared fleet at daemon startup.
    ///
    /// Every definition is validated, every `after` entry must resolve
    /// within the fleet or the registry, and the dependency relation
    /// must be acyclic; any violation fails the whole call and admits
    /// nothing. On success one supervisor task is spawned per service
    /// and every service whose parents are all ready — at startup, the
    /// ones with no parents — receives a start signal.
    pub async fn admit_fleet(
        self: &Arc<Self>,
        defs: HashMap<String, ServiceDefinition>,
    ) -> Result<(), EngineError> {
        let mut prepared: HashMap<String, ServiceDefinition> = HashMap::with_capacity(defs.len());
        for (name, def) in defs {
            let def = def.named(&name);
            validate_definition(&def)?;
            if def.name() != name {
                return Err(EngineError::InvalidDefinition {
                    name: def.name().to_string(),
                    reason: format!("definition name does not match map key '{name}'"),
                });
            }
            prepared.insert(name, def);
        }
        reject_cycles(&prepared)?;

        let mut admitted: Vec<(Arc<ServiceRecord>, SignalReceivers)> =
            Vec::with_capacity(prepared.len());
        {
            let mut map = self.services.write().await;
            for (name, def) in &prepared {
                if map.contains_key(name) {
                    return Err(EngineError::AlreadyTracked { name: name.clone() });
                }
                for parent in def.after() {
                    if !prepared.contains_key(parent) && !map.contains_key(parent) {
                        return Err(EngineError::MissingParent {
                            name: name.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
            }
            for (name, def) in prepared {
                let (record, receivers) = ServiceRecord::new(def);
                map.insert(name, Arc::clone(&record));
                admitted.push((record, receivers));
            }
            for (record, _) in &admitted {
                for parent in record.parents() {
                    if let Some(parent_record) = map.get(parent) {
                        parent_record.add_child(record.name()).await;
                    }
                }
            }
            // restore reverse edges from records that predate this fleet
            for (record, _) in &admitted {
                for (other_name, other) in map.iter() {
                    if other_name != record.name() && other.parents().contains(record.name()) {
                        record.add_child(other_name).await;
                    }
                }
            }
        }

        let mut names = Vec::with_capacity(admitted.len());
        for (record, receivers) in admitted {
            names.push(record.name().to_string());
            self.bus
                .publish(Event::now(EventKind::ServiceAdmitted).with_service(record.name()));
            self.spawn_actor(record, receivers);
        }
        for name in names {
            self.start_if_eligible(&name).await;
        }
        Ok(())
    }

    /// Snapshot of every tracked service and its status. Unordered.
    pub async fn list(&self) -> Vec<ServiceSnapshot> {
        let map = self.services.read().await;
        let mut snapshot = Vec::with_capacity(map.len());
        for (name, record) in map.iter() {
            snapshot.push(ServiceSnapshot {
                name: name.clone(),
                status: record.status().await,
            });
        }
        snapshot
    }

    /// Admits one service at runtime.
    ///
    /// Rejects a duplicate name and any `after` entry that is not
    /// already tracked. The new service starts immediately when its
    /// parents are all ready.
    pub async fn add(self: &Arc<Self>, def: ServiceDefinition) -> Result<(), EngineError> {
        validate_definition(&def)?;
        let name = def.name().to_string();

        let (record, receivers) = {
            let mut map = self.services.write().await;
            if map.contains_key(&name) {
                return Err(EngineError::AlreadyTracked { name });
            }
            for parent in def.after() {
                if !map.contains_key(parent) {
                    return Err(EngineError::MissingParent {
                        name,
                        parent: parent.clone(),
                    });
                }
            }
            let (record, receivers) = ServiceRecord::new(def);
            for parent in record.parents() {
                if let Some(parent_record) = map.get(parent) {
                    parent_record.add_child(&name).await;
                }
            }
            // Surviving records may still name this service as a parent
            // (edges are never pruned on delete): restore the reverse
            // edges so readiness reaches those children again.
            for (other_name, other) in map.iter() {
                if other.parents().contains(&name) {
                    record.add_child(other_name).await;
                }
            }
            map.insert(name.clone(), Arc::clone(&record));
            (record, receivers)
        };

        self.bus
            .publish(Event::now(EventKind::ServiceAdmitted).with_service(&name));
        self.spawn_actor(record, receivers);
        self.start_if_eligible(&name).await;
        Ok(())
    }

    /// Deletes a tracked service.
    ///
    /// The record leaves the map only after its supervisor acknowledged
    /// the delete, which guarantees no child owned by this name is
    /// running afterwards. Surviving records keep their adjacency sets;
    /// a child naming the deleted service stays `Pending` until the
    /// operator restores the parent or deletes the child.
    pub async fn delete(&self, name: &str) -> Result<(), EngineError> {
        let record = {
            let map = self.services.read().await;
            map.get(name)
                .cloned()
                .ok_or_else(|| EngineError::NotTracked { name: name.to_string() })?
        };

        let (ack, done) = oneshot::channel();
        if record.signal_delete(ack).await.is_ok() {
            // ignore a supervisor that died between signal and ack
            let _ = done.await;
        }

        self.services.write().await.remove(name);
        self.bus
            .publish(Event::now(EventKind::ServiceRemoved).with_service(name));
        Ok(())
    }

    /// Starts a tracked service that has not already started.
    ///
    /// Resets the status to `Pending`; the start signal is delivered
    /// only when every parent is ready, otherwise the service waits.
    pub async fn start(&self, name: &str) -> Result<(), EngineError> {
        let starter = {
            let map = self.services.read().await;
            let record = map
                .get(name)
                .ok_or_else(|| EngineError::NotTracked { name: name.to_string() })?;
            if let Err(status) = record.mark_pending().await {
                return Err(EngineError::AlreadyStarted {
                    name: name.to_string(),
                    status,
                });
            }
            self.bus.publish(
                Event::now(EventKind::ServicePending)
                    .with_service(name)
                    .with_status(Status::Pending),
            );
            if eligible(&map, record).await {
                Some(Arc::clone(record))
            } else {
                None
            }
        };
        if let Some(record) = starter {
            record.signal_start();
        }
        Ok(())
    }

    /// Stops a tracked service, killing its child if one is running.
    ///
    /// Returns once the supervisor acknowledged, i.e. the child has
    /// been signalled. Stopping a service with nothing running records
    /// `Stopped` and succeeds; repeating it is a no-op.
    pub async fn stop(&self, name: &str) -> Result<(), EngineError> {
        let record = {
            let map = self.services.read().await;
            map.get(name)
                .cloned()
                .ok_or_else(|| EngineError::NotTracked { name: name.to_string() })?
        };

        let (ack, done) = oneshot::channel();
        record
            .signal_stop(ack)
            .await
            .map_err(|_| EngineError::SupervisorGone { name: name.to_string() })?;
        done.await
            .map_err(|_| EngineError::SupervisorGone { name: name.to_string() })?;
        Ok(())
    }

    /// Called by a supervisor once its probe passed: rescans the
    /// service's children and starts those whose parents are now all
    /// ready.
    pub(crate) async fn announce_ready(&self, name: &str) {
        let starters = {
            let map = self.services.read().await;
            let Some(record) = map.get(name) else { return };
            let mut starters = Vec::new();
            for child in record.children().await {
                if let Some(child_record) = map.get(&child) {
                    if eligible(&map, child_record).await {
                        starters.push(Arc::clone(child_record));
                    }
                }
            }
            starters
        };
        for record in starters {
            record.signal_start();
        }
    }

    /// Delivers a start signal if the service is pending and unblocked.
    async fn start_if_eligible(&self, name: &str) {
        let starter = {
            let map = self.services.read().await;
            match map.get(name) {
                Some(record) => {
                    if eligible(&map, record).await {
                        Some(Arc::clone(record))
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        if let Some(record) = starter {
            record.signal_start();
        }
    }

    fn spawn_actor(self: &Arc<Self>, record: Arc<ServiceRecord>, receivers: SignalReceivers) {
        let actor = ServiceActor::new(
            record,
            receivers,
            Arc::downgrade(self),
            self.bus.clone(),
            self.cfg.clone(),
        );
        tokio::spawn(actor.run());
    }
}

/// A service may leave `Pending` only when every parent resolves to a
/// ready record. A missing parent counts as not ready.
async fn eligible(map: &HashMap<String, Arc<ServiceRecord>>, record: &Arc<ServiceRecord>) -> bool {
    if record.status().await != Status::Pending {
        return false;
    }
    for parent in record.parents() {
        match map.get(parent) {
            Some(parent_record) if parent_record.status().await.is_ready() => {}
            _ => return false,
        }
    }
    true
}

fn validate_definition(def: &ServiceDefinition) -> Result<(), EngineError> {
    if def.name().is_empty() {
        return Err(EngineError::InvalidDefinition {
            name: String::new(),
            reason: "name must not be empty".to_string(),
        });
    }
    if tokenize(def.cmd()).is_none() {
        return Err(EngineError::InvalidDefinition {
            name: def.name().to_string(),
            reason: "cmd must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Rejects a fleet whose `after` relation contains a cycle. Edges that
/// point outside the fleet are already admitted and cannot cycle back.
fn reject_cycles(defs: &HashMap<String, ServiceDefinition>) -> Result<(), EngineError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        name: &str,
        defs: &HashMap<String, ServiceDefinition>,
        marks: &mut HashMap<String, Mark>,
    ) -> Result<(), EngineError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(EngineError::DependencyCycle {
                    name: name.to_string(),
                })
            }
            None => {}
        }
        marks.insert(name.to_string(), Mark::Visiting);
        if let Some(def) = defs.get(name) {
            for parent in def.after() {
                if defs.contains_key(parent) {
                    visit(parent, defs, marks)?;
                }
            }
        }
        marks.insert(name.to_string(), Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::with_capacity(defs.len());
    for name in defs.keys() {
        visit(name, defs, &mut marks)?;
    }
    Ok(())
}
