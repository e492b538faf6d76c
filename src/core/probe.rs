//! # Health prober.
//!
//! Repeatedly runs a service's health command until one run exits 0,
//! the supervised run is cancelled, or the wall-clock cap elapses.
//! Retries follow the engine's backoff schedule; the cap rides on the
//! backoff instance's elapsed budget.
//!
//! The probe shares the supervised run's cancellation token, so killing
//! the child also tears down an in-flight probe process.

use std::process::Stdio;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::runner::build_command;
use crate::policies::BackoffPolicy;

/// Result of one health-command execution.
enum Check {
    Passed,
    Failed,
    Cancelled,
}

/// Runs the probe loop for `health_check`.
///
/// Returns `true` on the first successful probe, `false` once `token`
/// fires or `cap` of wall-clock time has elapsed.
pub(crate) async fn probe(
    health_check: &str,
    token: &CancellationToken,
    policy: BackoffPolicy,
    cap: Duration,
) -> bool {
    let mut backoff = policy.instance_capped(cap);
    backoff.reset();

    loop {
        if token.is_cancelled() {
            return false;
        }
        match check_once(health_check, token).await {
            Check::Passed => return true,
            Check::Cancelled => return false,
            Check::Failed => {}
        }
        let Some(delay) = backoff.next_delay() else {
            return false;
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = token.cancelled() => return false,
        }
    }
}

/// Executes the health command once. Success is exit code 0; a command
/// that cannot be tokenised or spawned counts as a failed check.
async fn check_once(health_check: &str, token: &CancellationToken) -> Check {
    let Some(mut cmd) = build_command(health_check) else {
        return Check::Failed;
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(_) => return Check::Failed,
    };

    tokio::select! {
        res = child.wait() => match res {
            Ok(status) if status.success() => Check::Passed,
            _ => Check::Failed,
        },
        _ = token.cancelled() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Check::Cancelled
        }
    }
}
