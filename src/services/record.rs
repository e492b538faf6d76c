//! # Runtime record of an admitted service.
//!
//! One [`ServiceRecord`] exists per admitted definition. The registry is
//! the sole owner (it holds the record in its map); the service's
//! supervisor task keeps a shared handle that dies with the task.
//!
//! ## Rules
//! - The definition is immutable after admission.
//! - `status` is guarded by the record's own lock, never by the registry
//!   lock, so supervisors mutate it without blocking dispatch.
//! - `parents` is fixed at admission; `children` grows when a later
//!   service is admitted with this one in its `after` list.
//! - Signals travel over single-slot channels: at most one start, one
//!   stop, and one delete can be in flight at a time. Stop and delete
//!   carry a oneshot sender the supervisor acknowledges on.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::services::{ServiceDefinition, Status};

/// Acknowledgement endpoint carried by stop and delete signals.
pub(crate) type StopAck = oneshot::Sender<()>;

/// Receiving ends of a record's signal channels, handed to its
/// supervisor task at spawn.
pub(crate) struct SignalReceivers {
    pub start: mpsc::Receiver<()>,
    pub stop: mpsc::Receiver<StopAck>,
    pub delete: mpsc::Receiver<StopAck>,
}

impl SignalReceivers {
    /// Discards any start queued in the slot. Used when a stop is
    /// processed: a stopped service restarts only on an explicit
    /// operator start.
    pub fn drain_starts(&mut self) {
        while self.start.try_recv().is_ok() {}
    }
}

/// Runtime state of one admitted service.
pub(crate) struct ServiceRecord {
    def: ServiceDefinition,
    status: Mutex<Status>,
    /// Names this service waits for. Fixed at admission.
    parents: HashSet<String>,
    /// Names that wait for this service.
    children: Mutex<HashSet<String>>,
    start_tx: mpsc::Sender<()>,
    stop_tx: mpsc::Sender<StopAck>,
    delete_tx: mpsc::Sender<StopAck>,
}

impl ServiceRecord {
    /// Builds the record and the receiver bundle for its supervisor.
    pub fn new(def: ServiceDefinition) -> (Arc<Self>, SignalReceivers) {
        let (start_tx, start_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (delete_tx, delete_rx) = mpsc::channel(1);

        let parents = def.after().iter().cloned().collect();
        let record = Arc::new(Self {
            def,
            status: Mutex::new(Status::Pending),
            parents,
            children: Mutex::new(HashSet::new()),
            start_tx,
            stop_tx,
            delete_tx,
        });
        let receivers = SignalReceivers {
            start: start_rx,
            stop: stop_rx,
            delete: delete_rx,
        };
        (record, receivers)
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.def
    }

    pub async fn status(&self) -> Status {
        *self.status.lock().await
    }

    pub async fn set_status(&self, status: Status) {
        *self.status.lock().await = status;
    }

    /// Resets the status to `Pending` for an operator start, unless the
    /// service has already started, in which case the offending status
    /// is returned.
    pub async fn mark_pending(&self) -> Result<(), Status> {
        let mut status = self.status.lock().await;
        if status.has_started() {
            return Err(*status);
        }
        *status = Status::Pending;
        Ok(())
    }

    pub fn parents(&self) -> &HashSet<String> {
        &self.parents
    }

    pub async fn add_child(&self, name: &str) {
        self.children.lock().await.insert(name.to_string());
    }

    pub async fn children(&self) -> Vec<String> {
        self.children.lock().await.iter().cloned().collect()
    }

    /// Schedules a start. A start already in flight is left in place.
    pub fn signal_start(&self) {
        let _ = self.start_tx.try_send(());
    }

    /// Delivers a stop signal; the supervisor acknowledges on `ack`.
    ///
    /// Fails if the supervisor task is gone.
    pub async fn signal_stop(&self, ack: StopAck) -> Result<(), ()> {
        self.stop_tx.send(ack).await.map_err(|_| ())
    }

    /// Delivers a delete signal; the supervisor acknowledges on `ack`
    /// just before it terminates.
    pub async fn signal_delete(&self, ack: StopAck) -> Result<(), ()> {
        self.delete_tx.send(ack).await.map_err(|_| ())
    }
}
