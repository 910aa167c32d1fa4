use std::io::{ErrorKind, Read, Write};

use tracing::{debug, trace};

use slipstack_frame::DEFAULT_READ_CHUNK;

use crate::error::{Result, StackError};

/// Bottom layer: raw byte I/O on the transport channel.
///
/// Knows nothing about framing. The transmit side hands it complete encoded
/// frames; the receive side hands raw chunks upward as they arrive.
pub struct Bottom<T> {
    channel: T,
    chunk: Vec<u8>,
    bytes_read: u64,
    bytes_written: u64,
}

impl<T> Bottom<T> {
    /// Wrap a channel with the default 256-byte read chunk.
    pub fn new(channel: T) -> Self {
        Self::with_chunk_size(channel, DEFAULT_READ_CHUNK)
    }

    pub fn with_chunk_size(channel: T, chunk_size: usize) -> Self {
        Self {
            channel,
            chunk: vec![0u8; chunk_size.max(1)],
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    /// Bytes requested per read.
    pub fn chunk_size(&self) -> usize {
        self.chunk.len()
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &T {
        &self.channel
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.channel
    }

    pub fn into_inner(self) -> T {
        self.channel
    }
}

impl<T: Write> Bottom<T> {
    /// Write one encoded frame with a single write call.
    ///
    /// A short write is reported as [`StackError::PartialWrite`]; the
    /// remainder is not retried. Only `Interrupted` is retried.
    pub fn send(&mut self, frame: &[u8]) -> Result<usize> {
        let written = loop {
            match self.channel.write(frame) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StackError::Io(err)),
            }
        };
        self.bytes_written += written as u64;

        if written != frame.len() {
            return Err(StackError::PartialWrite {
                written,
                expected: frame.len(),
            });
        }

        loop {
            match self.channel.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StackError::Io(err)),
            }
        }
        trace!(bytes = written, "frame sent");
        Ok(written)
    }
}

impl<T: Read> Bottom<T> {
    /// Perform one blocking read and pass the bytes to `on_chunk`.
    ///
    /// Returns the number of bytes read; `0` means the channel is closed and
    /// `on_chunk` was not called.
    pub fn read_chunk<F>(&mut self, mut on_chunk: F) -> Result<usize>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let read = loop {
            match self.channel.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StackError::Io(err)),
            }
        };

        if read > 0 {
            self.bytes_read += read as u64;
            trace!(bytes = read, "chunk received");
            on_chunk(&self.chunk[..read])?;
        }
        Ok(read)
    }

    /// Read until end of stream, passing every chunk to `on_chunk`.
    ///
    /// Returns the total bytes read. An I/O error or an error from
    /// `on_chunk` ends the loop and is returned as is.
    pub fn listen<F>(&mut self, mut on_chunk: F) -> Result<u64>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut total = 0u64;
        loop {
            let read = self.read_chunk(&mut on_chunk)?;
            if read == 0 {
                debug!(total, "channel closed");
                return Ok(total);
            }
            total += read as u64;
        }
    }
}
