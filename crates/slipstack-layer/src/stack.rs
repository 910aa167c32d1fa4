use std::io::{Read, Write};

use tracing::{debug, info, warn};

use slipstack_dispatch::{Signal, SubscriptionId};
use slipstack_frame::{DecoderState, DecoderStats, FrameError, Packet};

use crate::bottom::Bottom;
use crate::config::StackConfig;
use crate::error::{Result, StackError};
use crate::middle::Middle;

/// Outcome of a receive session that ended at end of stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenSummary {
    /// Raw bytes read from the channel.
    pub bytes: u64,
    /// Packets published to handlers.
    pub packets: u64,
    /// Unknown escapes and oversize frames encountered.
    pub protocol_errors: u64,
}

/// Running counters for both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackStats {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub decoder: DecoderStats,
}

/// Bottom / Middle / Top composition over one transport channel.
///
/// The reader and writer halves are separate so both a socket (one stream
/// cloned) and a named pipe (one end per direction) fit. The Top layer is
/// the caller: it registers handlers, then sends payloads or listens.
///
/// ```no_run
/// use slipstack_layer::LayerStack;
///
/// let mut stack = LayerStack::unix("/tmp/slipstack.sock")?;
/// stack.register_handler(|packet| println!("{} bytes", packet.len()))?;
/// stack.send(&[0x01, 0xC0, 0x02, 0xDB])?;
/// let summary = stack.listen()?;
/// println!("{} packets", summary.packets);
/// # Ok::<(), slipstack_layer::StackError>(())
/// ```
pub struct LayerStack<R, W> {
    rx: Bottom<R>,
    tx: Bottom<W>,
    middle: Middle,
    closed: Signal,
    frames_sent: u64,
    listening: bool,
    session_closed: bool,
}

impl<R, W> LayerStack<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, StackConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: StackConfig) -> Self {
        Self {
            rx: Bottom::with_chunk_size(reader, config.read_chunk_size),
            tx: Bottom::new(writer),
            middle: Middle::with_config(&config),
            closed: Signal::new(),
            frames_sent: 0,
            listening: false,
            session_closed: false,
        }
    }

    /// Register a Top-layer packet handler.
    ///
    /// Rejected with [`StackError::ListenerActive`] once [`listen`](Self::listen)
    /// or [`poll`](Self::poll) has run.
    pub fn register_handler<F>(&mut self, handler: F) -> Result<SubscriptionId>
    where
        F: for<'a> FnMut(Packet<'a>) + Send + 'static,
    {
        if self.listening {
            return Err(StackError::ListenerActive);
        }
        self.middle.register_handler(handler)
    }

    pub fn unregister_handler(&mut self, id: SubscriptionId) -> Result<()> {
        self.middle.unregister_handler(id)
    }

    /// Observe recoverable protocol errors on the receive path.
    pub fn on_protocol_error<F>(&mut self, observer: F) -> Result<SubscriptionId>
    where
        F: FnMut(&FrameError) + Send + 'static,
    {
        self.middle.subscribe_errors(observer)
    }

    /// Run `slot` once when the receive session ends.
    ///
    /// A session ends at end of stream, or when `listen`/`poll` fails with an
    /// I/O or allocation error. Any partial frame is dropped before the slot
    /// runs.
    pub fn on_close<F>(&mut self, slot: F) -> Result<SubscriptionId>
    where
        F: FnMut() + Send + 'static,
    {
        Ok(self.closed.connect(slot)?)
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether the receive session has ended.
    pub fn is_closed(&self) -> bool {
        self.session_closed
    }

    pub fn stats(&self) -> StackStats {
        StackStats {
            frames_sent: self.frames_sent,
            bytes_sent: self.tx.bytes_written(),
            bytes_received: self.rx.bytes_read(),
            decoder: self.middle.decoder().stats(),
        }
    }

    pub fn middle(&self) -> &Middle {
        &self.middle
    }

    pub fn reader(&self) -> &R {
        self.rx.get_ref()
    }

    pub fn writer(&self) -> &W {
        self.tx.get_ref()
    }

    /// Take the channel halves back.
    pub fn into_parts(self) -> (R, W) {
        (self.rx.into_inner(), self.tx.into_inner())
    }
}

impl<R, W: Write> LayerStack<R, W> {
    /// Transmit path: encode `payload` and write it with a single write.
    ///
    /// Returns the number of wire bytes written.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        let frame = self.middle.encode(payload);
        let written = self.tx.send(frame)?;
        self.frames_sent += 1;
        debug!(payload = payload.len(), wire = written, "payload sent");
        Ok(written)
    }
}

impl<R: Read, W> LayerStack<R, W> {
    /// Receive path: read and decode until end of stream.
    ///
    /// Handlers run inline on this thread. Returns a summary at EOF; an I/O
    /// or allocation error ends the session and is returned instead. Once the
    /// session has ended, further calls return an empty summary.
    pub fn listen(&mut self) -> Result<ListenSummary> {
        self.listening = true;
        if self.session_closed {
            return Ok(ListenSummary::default());
        }
        let before = self.middle.decoder().stats();
        info!(
            handlers = self.middle.handler_count(),
            chunk = self.rx.chunk_size(),
            "listening"
        );

        let middle = &mut self.middle;
        let bytes = match self.rx.listen(|chunk| middle.on_raw(chunk).map(drop)) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "receive session failed");
                self.finish_session();
                return Err(err);
            }
        };

        let after = self.middle.decoder().stats();
        let summary = ListenSummary {
            bytes,
            packets: after.packets - before.packets,
            protocol_errors: (after.unknown_escapes + after.oversized)
                - (before.unknown_escapes + before.oversized),
        };
        self.finish_session();
        info!(
            bytes = summary.bytes,
            packets = summary.packets,
            protocol_errors = summary.protocol_errors,
            "channel closed"
        );
        Ok(summary)
    }

    /// One blocking read.
    ///
    /// Returns `Some(packets published)` or `None` once the session has
    /// ended. An error also ends the session.
    pub fn poll(&mut self) -> Result<Option<usize>> {
        self.listening = true;
        if self.session_closed {
            return Ok(None);
        }
        let mut published = 0usize;
        let middle = &mut self.middle;
        let read = self.rx.read_chunk(|chunk| {
            published = middle.on_raw(chunk)?;
            Ok(())
        });
        let read = match read {
            Ok(read) => read,
            Err(err) => {
                warn!(error = %err, "receive session failed");
                self.finish_session();
                return Err(err);
            }
        };

        if read == 0 {
            self.finish_session();
            return Ok(None);
        }
        Ok(Some(published))
    }

    fn finish_session(&mut self) {
        if self.session_closed {
            return;
        }
        self.session_closed = true;
        let decoder = self.middle.decoder();
        if decoder.is_mid_frame() || decoder.state() != DecoderState::Collecting {
            debug!(
                buffered = decoder.buffered_len(),
                state = ?decoder.state(),
                "discarding partial frame at end of session"
            );
            self.middle.reset();
        }
        self.closed.emit();
    }
}

impl<R, W> std::fmt::Debug for LayerStack<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStack")
            .field("middle", &self.middle)
            .field("frames_sent", &self.frames_sent)
            .field("listening", &self.listening)
            .field("session_closed", &self.session_closed)
            .finish()
    }
}

#[cfg(unix)]
mod channels {
    use std::io::{Empty, Sink};
    use std::path::Path;

    use slipstack_transport::{IpcStream, NamedPipe, UnixDomainSocket};

    use super::LayerStack;
    use crate::config::StackConfig;
    use crate::error::Result;

    /// Stack over a connected Unix domain socket.
    pub type SocketStack = LayerStack<IpcStream, IpcStream>;
    /// Receive-only stack over the read end of a FIFO.
    pub type FifoReceiver = LayerStack<IpcStream, Sink>;
    /// Transmit-only stack over the write end of a FIFO.
    pub type FifoSender = LayerStack<Empty, IpcStream>;

    impl LayerStack<IpcStream, IpcStream> {
        /// Connect to a listening socket at `path`.
        pub fn unix(path: impl AsRef<Path>) -> Result<SocketStack> {
            Self::unix_with_config(path, StackConfig::default())
        }

        pub fn unix_with_config(path: impl AsRef<Path>, config: StackConfig) -> Result<SocketStack> {
            let stream = UnixDomainSocket::connect(path)?;
            Self::from_stream(stream, config)
        }

        /// Split an accepted or connected stream into both halves.
        pub fn from_stream(stream: IpcStream, config: StackConfig) -> Result<SocketStack> {
            let reader = stream.try_clone()?;
            Ok(LayerStack::with_config(reader, stream, config))
        }
    }

    impl LayerStack<IpcStream, Sink> {
        /// Open the read end of the FIFO at `path`, creating it if missing.
        ///
        /// Blocks until a writer opens the FIFO. The FIFO is left on disk.
        pub fn fifo_reader(path: impl AsRef<Path>) -> Result<FifoReceiver> {
            Self::fifo_reader_with_config(path, StackConfig::default())
        }

        pub fn fifo_reader_with_config(
            path: impl AsRef<Path>,
            config: StackConfig,
        ) -> Result<FifoReceiver> {
            let pipe = NamedPipe::create(path)?.persist();
            let reader = pipe.open_reader()?;
            Ok(LayerStack::with_config(reader, std::io::sink(), config))
        }
    }

    impl LayerStack<Empty, IpcStream> {
        /// Open the write end of an existing FIFO at `path`.
        ///
        /// Blocks until a reader opens the FIFO.
        pub fn fifo_writer(path: impl AsRef<Path>) -> Result<FifoSender> {
            let pipe = NamedPipe::open_existing(path)?;
            let writer = pipe.open_writer()?;
            Ok(LayerStack::new(std::io::empty(), writer))
        }
    }
}

#[cfg(unix)]
pub use channels::{FifoReceiver, FifoSender, SocketStack};
