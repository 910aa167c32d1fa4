//! Layered SLIP packet stack.
//!
//! slipstack turns an ordered byte stream into discrete packets and back,
//! and fans received packets out to registered callbacks.
//!
//! # Crate Structure
//!
//! - [`transport`] - Byte-stream channels (Unix sockets, named pipes)
//! - [`dispatch`] - Bounded callback registries: signal/slot and event bus
//! - [`frame`] - SLIP encoder and incremental decoder
//! - [`layer`] - Bottom/Middle/Top stack composing framing and dispatch

/// Re-export transport types.
pub mod transport {
    pub use slipstack_transport::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use slipstack_dispatch::*;
}

/// Re-export frame types.
pub mod frame {
    pub use slipstack_frame::*;
}

/// Re-export layer stack types.
pub mod layer {
    pub use slipstack_layer::*;
}
