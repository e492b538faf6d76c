//! Custom subscriber demo.
//!
//! Demonstrates how to implement and register a custom event subscriber.
//!
//! What it shows:
//! - Implementing `Subscribe` and pattern-matching `EventKind`
//! - Counting restarts of a crashing service
//! - Running an engine with subscribers attached
//!
//! Run with:
//! `cargo run --example custom_subscriber`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sminit::{Config, Engine, Event, EventKind, ServiceDefinition, Subscribe};

/// A console subscriber that prints selected events and counts failures.
/// In real life this could export metrics, ship logs, or send alerts.
struct ConsoleSubscriber {
    failures: AtomicU64,
}

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let service = ev.service.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            EventKind::ServiceAdmitted => {
                println!("[sub] admitted: service={service}");
            }
            EventKind::ServiceStarted => {
                let attempt = ev.attempt.unwrap_or_default();
                println!("[sub] started:  service={service} attempt={attempt}");
            }
            EventKind::ServiceReady => {
                println!("[sub] running:  service={service}");
            }
            EventKind::ServiceFailed => {
                let n = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                let err = ev.error.as_deref().unwrap_or("<no error>");
                println!("[sub] failed:   service={service} total={n} err={err}");
            }
            EventKind::BackoffScheduled => {
                let delay = ev.delay.map(|d| format!("{d:?}")).unwrap_or_default();
                println!("[sub] backoff:  service={service} delay={delay}");
            }
            EventKind::ServiceStopped => {
                println!("[sub] stopped:  service={service}");
            }
            EventKind::ServiceRemoved => {
                println!("[sub] removed:  service={service}");
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = Arc::new(ConsoleSubscriber {
        failures: AtomicU64::new(0),
    });
    let engine = Engine::new(Config::default(), vec![subscriber.clone()]);

    // A service that crashes on every attempt: watch the restart loop
    engine.add(ServiceDefinition::new("crashy", "false")).await?;

    tokio::time::sleep(Duration::from_secs(5)).await;
    engine.stop("crashy").await?;

    println!(
        "[main] crashy failed {} times in 5s",
        subscriber.failures.load(Ordering::Relaxed)
    );
    Ok(())
}
