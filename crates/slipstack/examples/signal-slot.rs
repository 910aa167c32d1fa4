//! Two signals with context-capturing slots; one slot is disconnected.
//!
//! Run with:
//!   cargo run --example signal-slot

use slipstack::dispatch::Signal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut greetings = Signal::new();
    let mut names = Signal::new();

    let hello = "say_hello".to_string();
    greetings.connect(move || println!("{hello}"))?;
    let goodbye = "say_goodbye".to_string();
    let goodbye_id = greetings.connect(move || println!("{goodbye}"))?;

    names.connect(|| println!("print_name"))?;

    println!("---- Before disconnect ----");
    greetings.emit();

    greetings.disconnect(goodbye_id)?;

    println!("---- After disconnect ----");
    greetings.emit();

    println!("---- Emit second signal ----");
    names.emit();

    Ok(())
}
