use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Default FIFO path shared by the sender and listener demos.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/packet_pipe";

/// A POSIX named pipe on the filesystem.
///
/// The FIFO is a pair of unidirectional ends: the receive side opens it for
/// reading, the transmit side for writing. Opening either end blocks until
/// the other end is opened by some process.
#[derive(Debug)]
pub struct NamedPipe {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl NamedPipe {
    /// Default permission mode for created FIFOs.
    pub const DEFAULT_FIFO_MODE: u32 = 0o600;

    /// Create the FIFO at `path`, or adopt an existing one.
    ///
    /// A FIFO created here is removed again when the value is dropped. An
    /// existing FIFO is reused and left in place.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_mode(path, Self::DEFAULT_FIFO_MODE)
    }

    /// Create the FIFO with an explicit permission mode.
    pub fn create_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let create_err = |source: std::io::Error| TransportError::CreateFifo {
            path: path.clone(),
            source,
        };

        match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.file_type().is_fifo() => {
                debug!(?path, "fifo already exists");
                return Ok(Self {
                    path,
                    cleanup_on_drop: false,
                });
            }
            Ok(_) => {
                return Err(create_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a fifo",
                )));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(create_err(err)),
        }

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            create_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "fifo path contains a NUL byte",
            ))
        })?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // Lost a race with another creator: adopt the FIFO it made.
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                return Self::open_existing(&path);
            }
            return Err(create_err(err));
        }

        info!(?path, "created fifo");
        Ok(Self {
            path,
            cleanup_on_drop: true,
        })
    }

    /// Refer to a FIFO that must already exist.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::symlink_metadata(&path).map_err(|source| {
            TransportError::OpenFifo {
                path: path.clone(),
                source,
            }
        })?;
        if !metadata.file_type().is_fifo() {
            return Err(TransportError::OpenFifo {
                path,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path is not a fifo",
                ),
            });
        }
        Ok(Self {
            path,
            cleanup_on_drop: false,
        })
    }

    /// Open the read end (blocks until a writer opens the FIFO).
    pub fn open_reader(&self) -> Result<IpcStream> {
        let file = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .map_err(|source| self.open_err(source))?;
        debug!(path = ?self.path, "opened fifo for reading");
        Ok(IpcStream::from_fifo(file))
    }

    /// Open the write end (blocks until a reader opens the FIFO).
    pub fn open_writer(&self) -> Result<IpcStream> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|source| self.open_err(source))?;
        debug!(path = ?self.path, "opened fifo for writing");
        Ok(IpcStream::from_fifo(file))
    }

    /// Release a reader blocked in [`open_reader`](Self::open_reader).
    ///
    /// Opens the write end without blocking and closes it again, so the
    /// reader's open returns and its first read sees end of stream. Fails
    /// with `ENXIO` when no reader has the FIFO open.
    pub fn wake_reader(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| TransportError::OpenFifo {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?path, "woke fifo reader");
        Ok(())
    }

    /// Whether the FIFO is removed when this value is dropped.
    pub fn removes_on_drop(&self) -> bool {
        self.cleanup_on_drop
    }

    /// The FIFO path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the FIFO on disk after this value is dropped.
    pub fn persist(mut self) -> Self {
        self.cleanup_on_drop = false;
        self
    }

    fn open_err(&self, source: std::io::Error) -> TransportError {
        TransportError::OpenFifo {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for NamedPipe {
    fn drop(&mut self) {
        if !self.cleanup_on_drop {
            return;
        }
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_fifo() {
                debug!(path = ?self.path, "removing fifo");
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "slipstack-fifo-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_open_and_transfer() {
        let dir = scratch_dir("transfer");
        let fifo_path = dir.join("pipe");
        let fifo = NamedPipe::create(&fifo_path).unwrap();

        let writer_path = fifo_path.clone();
        let writer = std::thread::spawn(move || {
            let pipe = NamedPipe::open_existing(&writer_path).unwrap();
            let mut tx = pipe.open_writer().unwrap();
            tx.write_all(&[0xC0, 0x42, 0xC0]).unwrap();
        });

        let mut rx = fifo.open_reader().unwrap();
        let mut received = Vec::new();
        rx.read_to_end(&mut received).unwrap();
        writer.join().unwrap();

        assert_eq!(received, vec![0xC0, 0x42, 0xC0]);
        assert_eq!(rx.kind(), "fifo");

        drop(fifo);
        assert!(!fifo_path.exists(), "created fifo should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn existing_fifo_is_adopted_and_kept() {
        let dir = scratch_dir("adopt");
        let fifo_path = dir.join("pipe");

        let first = NamedPipe::create(&fifo_path).unwrap().persist();
        drop(first);
        assert!(fifo_path.exists());

        let second = NamedPipe::create(&fifo_path).unwrap();
        drop(second);
        assert!(fifo_path.exists(), "adopted fifo must not be removed");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn regular_file_is_rejected() {
        let dir = scratch_dir("regular");
        let path = dir.join("plain");
        std::fs::write(&path, b"data").unwrap();

        assert!(matches!(
            NamedPipe::create(&path),
            Err(TransportError::CreateFifo { .. })
        ));
        assert!(matches!(
            NamedPipe::open_existing(&path),
            Err(TransportError::OpenFifo { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn wake_reader_releases_blocked_open() {
        let dir = scratch_dir("wake");
        let fifo_path = dir.join("pipe");
        let fifo = NamedPipe::create(&fifo_path).unwrap();
        assert!(fifo.removes_on_drop());

        // No reader yet: a non-blocking writer open is refused.
        assert!(matches!(
            NamedPipe::wake_reader(&fifo_path),
            Err(TransportError::OpenFifo { .. })
        ));

        let reader = std::thread::spawn(move || {
            let mut rx = fifo.open_reader().unwrap();
            let mut received = Vec::new();
            rx.read_to_end(&mut received).unwrap();
            received
        });

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while NamedPipe::wake_reader(&fifo_path).is_err() {
            assert!(std::time::Instant::now() < deadline, "reader never blocked in open");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(reader.join().unwrap().is_empty());
        assert!(!fifo_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_fifo_cannot_be_opened() {
        let dir = scratch_dir("missing");
        let result = NamedPipe::open_existing(dir.join("absent"));
        assert!(matches!(result, Err(TransportError::OpenFifo { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
