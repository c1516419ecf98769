//! End-to-end demo: seed a fleet, subscribe, poke it, let churn run.
//!
//! Prints every received change event as a JSON line, the same record shape
//! an HTTP or WebSocket layer would forward to browsers.
//!
//! ```bash
//! cargo run --example watch_fleet
//! ```

use std::time::Duration;

use fleetwatch_core::{Action, Fleet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let fleet = Fleet::builder()
        .churn_interval(Duration::from_secs(2))
        .build()?;

    // Attach before acting so the resync snapshot arrives first.
    let mut events = fleet.subscribe();

    // A quick tour of the action set.
    println!("{}", fleet.apply_action("PC-01", Action::Assign)?.message);
    println!("{}", fleet.apply_action("PC-01", Action::Remote)?.message);
    println!("{}", fleet.apply_action("PC-18", Action::Resolve)?.message);
    println!("{}", fleet.apply_action("PC-11", Action::Release)?.message);

    if let Err(err) = fleet.apply_action("PC-20", Action::Assign) {
        println!("rejected as expected: {err}");
    }

    let churn = fleet.start();

    // Stream a handful of events, then stop.
    for _ in 0..10 {
        match events.recv().await {
            Some(event) => println!("{}", serde_json::to_string(&event)?),
            None => break,
        }
    }

    churn.stop();
    Ok(())
}
