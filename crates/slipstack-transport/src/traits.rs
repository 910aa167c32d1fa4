use std::io::{Read, Write};

use crate::error::Result;

/// A connected byte-stream channel - implements Read + Write.
///
/// Socket channels are bidirectional. A named pipe end is opened either for
/// reading or for writing; using it the other way fails with the OS error
/// (`EBADF`), which surfaces as an ordinary I/O error.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    Unix(std::os::unix::net::UnixStream),
    Fifo(std::fs::File),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            IpcStreamInner::Unix(stream) => stream.read(buf),
            IpcStreamInner::Fifo(file) => file.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            IpcStreamInner::Unix(stream) => stream.write(buf),
            IpcStreamInner::Fifo(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            IpcStreamInner::Unix(stream) => stream.flush(),
            IpcStreamInner::Fifo(file) => file.flush(),
        }
    }
}

impl IpcStream {
    /// Create an IpcStream from a Unix domain socket stream.
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    /// Create an IpcStream from an opened named pipe end.
    pub(crate) fn from_fifo(file: std::fs::File) -> Self {
        Self {
            inner: IpcStreamInner::Fifo(file),
        }
    }

    /// Create a connected pair of socket channels.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Named pipes have no timeout support; the call is a no-op for them.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            IpcStreamInner::Fifo(_) => Ok(()),
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Named pipes have no timeout support; the call is a no-op for them.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            IpcStreamInner::Fifo(_) => Ok(()),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            IpcStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
            IpcStreamInner::Fifo(file) => {
                let cloned = file.try_clone()?;
                Ok(Self::from_fifo(cloned))
            }
        }
    }

    /// Channel kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            IpcStreamInner::Unix(_) => "unix",
            IpcStreamInner::Fifo(_) => "fifo",
        }
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("type", &self.kind())
            .finish()
    }
}
