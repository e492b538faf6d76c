//! # Demo: runtime_control
//!
//! Drive the control API at runtime: add, stop, start, and delete
//! services against a live engine, the way the daemon's transport does.
//!
//! Demonstrates how to:
//! - Add services one by one with [`Engine::add`].
//! - Stop and restart a service, observing `Stopped → Pending → Running`.
//! - Delete a service and re-admit the name.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► engine.add(worker)      worker: Pending ──► Running
//!   ├─► engine.stop(worker)     worker: Stopped (child killed)
//!   ├─► engine.start(worker)    worker: Pending ──► Running
//!   ├─► engine.delete(worker)   registry drained
//!   └─► engine.add(worker)      fresh record, fresh supervisor
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example runtime_control
//! ```

use std::sync::Arc;
use std::time::Duration;

use sminit::{Config, Engine, LogWriter, ServiceDefinition, Status};

async fn show(engine: &Engine, label: &str) {
    let entries = engine.list().await;
    if entries.is_empty() {
        println!("[control] {label}: (no services)");
        return;
    }
    for entry in entries {
        println!("[control] {label}: {} = {}", entry.name, entry.status);
    }
}

async fn settle(engine: &Engine, name: &str, want: Status) {
    for _ in 0..100 {
        let status = engine
            .list()
            .await
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.status);
        if status == Some(want) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let engine = Engine::new(Config::default(), vec![Arc::new(LogWriter::new())]);

    // 1. Add a long-running worker at runtime
    engine
        .add(ServiceDefinition::new("worker", "sleep 3600"))
        .await?;
    settle(&engine, "worker", Status::Running).await;
    show(&engine, "after add").await;

    // 2. Stop it; the acknowledgement means the child has been signalled
    engine.stop("worker").await?;
    show(&engine, "after stop").await;

    // 3. Start it again; only a stopped or pending service accepts this
    engine.start("worker").await?;
    settle(&engine, "worker", Status::Running).await;
    show(&engine, "after start").await;

    // 4. Starting a running service is a caller error
    match engine.start("worker").await {
        Err(err) => println!("[control] start rejected as expected: {err}"),
        Ok(()) => println!("[control] unexpected: start accepted twice"),
    }

    // 5. Delete it; the record leaves the registry after the supervisor acks
    engine.delete("worker").await?;
    show(&engine, "after delete").await;

    // 6. The name is free again
    engine
        .add(ServiceDefinition::new("worker", "echo reborn").with_one_shot(true))
        .await?;
    settle(&engine, "worker", Status::Successful).await;
    show(&engine, "after re-add").await;

    engine.delete("worker").await?;
    Ok(())
}
