//! Byte-stream transport channels.
//!
//! The layer stack only needs an ordered byte pipe: something that
//! implements [`std::io::Read`] on the receive side and [`std::io::Write`]
//! on the transmit side. This crate provides the concrete channels:
//! - Unix domain sockets (bidirectional)
//! - POSIX named pipes (one FIFO, opened once per direction)
//!
//! Both hand out an [`IpcStream`].

pub mod error;

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod traits;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use fifo::{NamedPipe, DEFAULT_FIFO_PATH};
#[cfg(unix)]
pub use traits::IpcStream;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
