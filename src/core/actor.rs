//! # Per-service supervisor task.
//!
//! One [`ServiceActor`] runs per admitted service. It consumes the
//! record's three single-slot signals and drives supervised runs:
//!
//! ```text
//! idle ──start──► supervised run (Runner::run)
//!   │                │ stop:   cancel → drain → Stopped → ack
//!   │                │ delete: cancel → drain → Stopped → ack → exit
//!   │                └ one-shot success → terminal wait (delete only)
//!   ├─stop──► Stopped (nothing was running) → ack
//!   └─delete─► ack → exit
//! ```
//!
//! ## Rules
//! - Stop and delete acknowledge only after the run has observed
//!   cancellation, so the child has been signalled by then.
//! - A finished one-shot service ignores further starts, acknowledges
//!   stop as a no-op, and terminates only on delete.
//! - The actor never touches the registry map; the dispatcher removes
//!   the record after the delete acknowledgement.

use std::sync::{Arc, Weak};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::runner::{RunExit, Runner};
use crate::core::Engine;
use crate::events::{Bus, Event, EventKind};
use crate::services::{ServiceRecord, SignalReceivers, Status};

/// How a supervised run ended, from the actor's point of view.
enum RunOutcome {
    /// One-shot success; only delete remains meaningful.
    Finished,
    /// Stopped (or the run drained for another reason); back to idle.
    Stopped,
    /// Delete arrived during the run; the actor must exit.
    Deleted,
}

/// Supervisor task for one admitted service.
pub(crate) struct ServiceActor {
    record: Arc<ServiceRecord>,
    signals: SignalReceivers,
    runner: Runner,
    bus: Bus,
}

impl ServiceActor {
    pub fn new(
        record: Arc<ServiceRecord>,
        signals: SignalReceivers,
        engine: Weak<Engine>,
        bus: Bus,
        cfg: Config,
    ) -> Self {
        let runner = Runner {
            record: Arc::clone(&record),
            engine,
            bus: bus.clone(),
            cfg,
        };
        Self {
            record,
            signals,
            runner,
            bus,
        }
    }

    /// Runs until a delete signal is acknowledged.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                sig = self.signals.delete.recv() => {
                    if let Some(ack) = sig {
                        let _ = ack.send(());
                    }
                    return;
                }
                sig = self.signals.stop.recv() => {
                    let Some(ack) = sig else { return };
                    self.mark_stopped().await;
                    self.signals.drain_starts();
                    let _ = ack.send(());
                }
                sig = self.signals.start.recv() => {
                    if sig.is_none() {
                        return;
                    }
                    // A signal that was queued before a stop was processed
                    // is stale; only a pending service runs.
                    if self.record.status().await != Status::Pending {
                        continue;
                    }
                    match self.supervise().await {
                        RunOutcome::Deleted => return,
                        RunOutcome::Finished => {
                            self.wait_for_delete().await;
                            return;
                        }
                        RunOutcome::Stopped => {}
                    }
                }
            }
        }
    }

    /// Drives one supervised run while staying responsive to stop and
    /// delete.
    async fn supervise(&mut self) -> RunOutcome {
        let token = CancellationToken::new();
        let run = self.runner.run(token.clone());
        tokio::pin!(run);

        tokio::select! {
            exit = &mut run => {
                match exit {
                    RunExit::Finished => RunOutcome::Finished,
                    RunExit::Cancelled => RunOutcome::Stopped,
                }
            }
            sig = self.signals.stop.recv() => {
                token.cancel();
                let _ = run.await;
                self.mark_stopped().await;
                self.signals.drain_starts();
                let Some(ack) = sig else { return RunOutcome::Deleted };
                let _ = ack.send(());
                RunOutcome::Stopped
            }
            sig = self.signals.delete.recv() => {
                token.cancel();
                let _ = run.await;
                self.mark_stopped().await;
                if let Some(ack) = sig {
                    let _ = ack.send(());
                }
                RunOutcome::Deleted
            }
        }
    }

    /// Terminal wait of a finished one-shot service: starts are drained
    /// and ignored, stop is acknowledged as a no-op, delete terminates.
    async fn wait_for_delete(&mut self) {
        loop {
            tokio::select! {
                sig = self.signals.delete.recv() => {
                    if let Some(ack) = sig {
                        let _ = ack.send(());
                    }
                    return;
                }
                sig = self.signals.stop.recv() => {
                    match sig {
                        Some(ack) => {
                            let _ = ack.send(());
                        }
                        None => return,
                    }
                }
                sig = self.signals.start.recv() => {
                    if sig.is_none() {
                        return;
                    }
                }
            }
        }
    }

    /// Records the stop transition, skipping the event when the service
    /// is already stopped.
    async fn mark_stopped(&self) {
        if self.record.status().await == Status::Stopped {
            return;
        }
        self.record.set_status(Status::Stopped).await;
        self.bus.publish(
            Event::now(EventKind::ServiceStopped)
                .with_service(self.record.name())
                .with_status(Status::Stopped),
        );
    }
}
