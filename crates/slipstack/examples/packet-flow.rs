//! Transmit and receive paths over a FIFO in one process.
//!
//! The receiver runs on a worker thread; the transmitter sends the payload
//! `01 C0 02 DB`, which needs both escape sequences on the wire.
//!
//! Run with:
//!   cargo run --example packet-flow
//!
//! Or across processes with the CLI:
//!   cargo run --features cli -- listen /tmp/packet_pipe --count 1
//!   cargo run --features cli -- send /tmp/packet_pipe --hex "01 c0 02 db"

use std::thread;

use slipstack::layer::LayerStack;
use slipstack::transport::NamedPipe;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join(format!("slipstack-flow-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let fifo_path = dir.join("packet_pipe");
    let pipe = NamedPipe::create(&fifo_path)?;
    eprintln!("FIFO at {}", pipe.path().display());

    let rx_path = fifo_path.clone();
    let receiver = thread::spawn(move || -> Result<u64, slipstack::layer::StackError> {
        let mut stack = LayerStack::fifo_reader(&rx_path)?;
        stack.register_handler(|packet| {
            let hex: Vec<String> = packet.iter().map(|b| format!("{b:02X}")).collect();
            println!("[TOP   ] packet of {} bytes: {}", packet.len(), hex.join(" "));
        })?;
        stack.on_close(|| println!("[BOTTOM] channel closed"))?;
        let summary = stack.listen()?;
        Ok(summary.packets)
    });

    let mut sender = LayerStack::fifo_writer(&fifo_path)?;
    let payload = [0x01, 0xC0, 0x02, 0xDB];
    let wire = sender.send(&payload)?;
    println!("[TOP   ] sent {} payload bytes as {wire} wire bytes", payload.len());
    drop(sender);

    let packets = receiver
        .join()
        .map_err(|_| "receiver thread panicked")??;
    println!("received {packets} packet(s)");

    drop(pipe);
    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}
