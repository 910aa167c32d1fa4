//! Layered packet stack over an ordered byte-stream channel.
//!
//! - [`Bottom`] moves raw bytes on the channel.
//! - [`Middle`] frames outgoing payloads and decodes incoming chunks,
//!   publishing each packet to the registered handlers.
//! - The Top layer is the caller of [`LayerStack`]: it registers handlers
//!   before listening and sends payloads.

pub mod bottom;
pub mod config;
pub mod error;
pub mod middle;
pub mod stack;

pub use bottom::Bottom;
pub use config::{StackConfig, DEFAULT_MAX_HANDLERS};
pub use error::{Result, StackError};
pub use middle::{Handler, Middle};
pub use stack::{LayerStack, ListenSummary, StackStats};

#[cfg(unix)]
pub use stack::{FifoReceiver, FifoSender, SocketStack};
