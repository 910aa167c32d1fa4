//! Layers sharing one event bus: the top layer subscribes, the middle layer
//! adds two handlers, the bottom layer publishes.
//!
//! Run with:
//!   cargo run --example event-bus

use slipstack::dispatch::{EventBus, DEFAULT_MAX_SUBSCRIBERS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut bus: EventBus<i32> = EventBus::new();

    bus.subscribe(|code| println!("[TOP   ] received event {code}"))?;

    println!("[MIDDLE] register handler1");
    bus.subscribe(|code| println!("[MIDDLE] handler1 got id {code}"))?;
    println!("[MIDDLE] register handler2");
    bus.subscribe(|code| println!("[MIDDLE] handler2 got id {code}"))?;

    println!("===== Begin Flow ====");
    for code in [1, 2] {
        println!("[BOTTOM] publish {code}");
        let notified = bus.publish(&code);
        println!("[BOTTOM] {notified} subscribers notified");
    }
    println!("===== End Flow ====");

    // Fill the bus to show the capacity bound.
    while bus.len() < DEFAULT_MAX_SUBSCRIBERS {
        bus.subscribe(|_| {})?;
    }
    if let Err(err) = bus.subscribe(|_| {}) {
        println!("extra subscriber rejected: {err}");
    }

    Ok(())
}
