//! # Supervised execution of one service.
//!
//! [`Runner::run`] is the retrying loop a supervisor drives per start
//! signal. Each attempt spawns the child, gates readiness on the health
//! probe, waits for the exit, and classifies it; failed attempts are
//! retried after a backoff delay. The loop only returns when the run is
//! cancelled (stop or delete) or a one-shot service succeeds.
//!
//! ## Status flow per attempt
//! ```text
//! spawn ok  → Started
//! probe ok  → Running → children re-evaluated
//! exit 0    → Successful (terminal when one-shot)
//! exit != 0 → Failed
//! spawn err / probe cap / early non-zero exit → Failed
//! any retryable end → BackoffScheduled → sleep → Pending → next attempt
//! ```
//!
//! ## Rules
//! - The backoff instance resets when the run begins, not per attempt.
//! - Cancellation is observed at every await: probe, child wait, and
//!   backoff sleep all race the run's token.
//! - The child is killed and reaped before the run reports cancelled.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Weak};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::core::{probe, Engine};
use crate::events::{Bus, Event, EventKind};
use crate::services::{tokenize, ServiceRecord, Status};

/// Why the attempt loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunExit {
    /// One-shot service exited successfully; the run is over for good.
    Finished,
    /// The run's cancellation token fired.
    Cancelled,
}

/// What one attempt decided.
enum Attempt {
    Finished,
    Restart,
    Cancelled,
}

/// Drives supervised attempts for one service.
pub(crate) struct Runner {
    pub record: Arc<ServiceRecord>,
    pub engine: Weak<Engine>,
    pub bus: Bus,
    pub cfg: Config,
}

impl Runner {
    /// Runs attempts until cancellation or a terminal one-shot success.
    pub async fn run(&self, token: CancellationToken) -> RunExit {
        let mut backoff = self.cfg.backoff.instance();
        backoff.reset();
        let mut attempt_no: u64 = 0;

        loop {
            if token.is_cancelled() {
                return RunExit::Cancelled;
            }
            attempt_no += 1;

            match self.attempt(&token, attempt_no).await {
                Attempt::Finished => return RunExit::Finished,
                Attempt::Cancelled => return RunExit::Cancelled,
                Attempt::Restart => {}
            }

            let delay = backoff.next_delay().unwrap_or(self.cfg.backoff.first);
            self.bus.publish(
                Event::now(EventKind::BackoffScheduled)
                    .with_service(self.record.name())
                    .with_delay(delay)
                    .with_attempt(attempt_no),
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => return RunExit::Cancelled,
            }

            self.record.set_status(Status::Pending).await;
            self.bus.publish(
                Event::now(EventKind::ServicePending)
                    .with_service(self.record.name())
                    .with_status(Status::Pending),
            );
        }
    }

    /// One spawn-probe-wait cycle.
    async fn attempt(&self, token: &CancellationToken, attempt_no: u64) -> Attempt {
        let def = self.record.definition();
        let name = self.record.name();

        let mut cmd = match build_command(def.cmd()) {
            Some(cmd) => cmd,
            None => {
                self.fail(attempt_no, "command is empty", None).await;
                return Attempt::Restart;
            }
        };
        cmd.stdin(Stdio::null());
        if def.logs_to_stdout() {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                self.fail(attempt_no, &format!("failed to spawn process: {err}"), None)
                    .await;
                return Attempt::Restart;
            }
        };

        self.record.set_status(Status::Started).await;
        self.bus.publish(
            Event::now(EventKind::ServiceStarted)
                .with_service(name)
                .with_status(Status::Started)
                .with_attempt(attempt_no),
        );
        if def.logs_to_stdout() {
            forward_output(name, &mut child);
        }

        // Probe while also watching the child: a non-zero exit before
        // readiness fails the attempt without waiting out the probe.
        let mut early_exit: Option<ExitStatus> = None;
        let ready = {
            let probing = probe::probe(def.health_check(), token, self.cfg.backoff, self.cfg.probe_cap);
            tokio::pin!(probing);
            loop {
                tokio::select! {
                    ready = &mut probing => break ready,
                    res = child.wait(), if early_exit.is_none() => match res {
                        Ok(status) if status.success() => early_exit = Some(status),
                        Ok(status) => {
                            if token.is_cancelled() {
                                return Attempt::Cancelled;
                            }
                            self.fail(
                                attempt_no,
                                &format!("process exited before becoming ready: {status}"),
                                status.code(),
                            )
                            .await;
                            return Attempt::Restart;
                        }
                        Err(err) => {
                            self.fail(attempt_no, &format!("failed to wait on process: {err}"), None)
                                .await;
                            return Attempt::Restart;
                        }
                    },
                }
            }
        };

        if !ready {
            if early_exit.is_none() {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
            if token.is_cancelled() {
                return Attempt::Cancelled;
            }
            self.bus.publish(
                Event::now(EventKind::ProbeFailed)
                    .with_service(name)
                    .with_attempt(attempt_no),
            );
            self.fail(attempt_no, "health probe never passed", None).await;
            return Attempt::Restart;
        }

        self.record.set_status(Status::Running).await;
        self.bus.publish(
            Event::now(EventKind::ServiceReady)
                .with_service(name)
                .with_status(Status::Running),
        );
        if let Some(engine) = self.engine.upgrade() {
            engine.announce_ready(name).await;
        }

        let exited = match early_exit {
            Some(status) => Ok(status),
            None => {
                tokio::select! {
                    res = child.wait() => res,
                    _ = token.cancelled() => {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        return Attempt::Cancelled;
                    }
                }
            }
        };

        match exited {
            Ok(status) if status.success() => {
                self.record.set_status(Status::Successful).await;
                self.bus.publish(
                    Event::now(EventKind::ServiceSucceeded)
                        .with_service(name)
                        .with_status(Status::Successful)
                        .with_code(0),
                );
                if def.one_shot() {
                    Attempt::Finished
                } else {
                    Attempt::Restart
                }
            }
            Ok(status) => {
                self.fail(attempt_no, &format!("process exited with {status}"), status.code())
                    .await;
                Attempt::Restart
            }
            Err(err) => {
                self.fail(attempt_no, &format!("failed to wait on process: {err}"), None)
                    .await;
                Attempt::Restart
            }
        }
    }

    /// Records a failed attempt: status, event, error detail.
    async fn fail(&self, attempt_no: u64, reason: &str, code: Option<i32>) {
        self.record.set_status(Status::Failed).await;
        let mut event = Event::now(EventKind::ServiceFailed)
            .with_service(self.record.name())
            .with_status(Status::Failed)
            .with_error(reason)
            .with_attempt(attempt_no);
        if let Some(code) = code {
            event = event.with_code(code);
        }
        self.bus.publish(event);
    }
}

/// Builds a process command by splitting `cmd` on ASCII space.
///
/// The first token is the program, the rest are arguments; no shell is
/// involved. Returns `None` for a blank string.
pub(crate) fn build_command(cmd: &str) -> Option<Command> {
    let (program, args) = tokenize(cmd)?;
    let mut command = Command::new(program);
    command.args(args);
    command.kill_on_drop(true);
    Some(command)
}

/// Forwards the child's stdout and stderr lines into the structured log,
/// tagged with the service's name as the component.
fn forward_output(name: &str, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        let service = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(component = %service, "{line}");
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let service = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                error!(component = %service, "{line}");
            }
        });
    }
}
