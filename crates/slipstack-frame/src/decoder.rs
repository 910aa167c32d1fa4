use std::ops::Deref;

use tracing::{debug, trace, warn};

use crate::codec::{DEFAULT_MAX_PAYLOAD, END, ESC, ESC_END, ESC_ESC};
use crate::error::{FrameError, Result};

/// Initial frame buffer capacity.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Handling of an `ESC` followed by a byte that is not an escape code.
///
/// Whatever the policy, the condition is reported to the sink as
/// [`FrameError::UnknownEscape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapePolicy {
    /// Discard the offending byte and keep collecting the frame.
    #[default]
    Drop,
    /// Append the offending byte as if it had not been escaped.
    PassThrough,
    /// Discard the whole partial frame and resynchronise at the next `END`.
    DiscardFrame,
}

/// Decoder settings.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Capacity allocated for the first payload byte. Default: 256.
    pub initial_capacity: usize,
    /// Largest payload the decoder will accumulate. Default: 16 MiB.
    pub max_payload_size: usize,
    pub escape_policy: EscapePolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            escape_policy: EscapePolicy::default(),
        }
    }
}

impl DecoderConfig {
    pub fn with_escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.escape_policy = policy;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

/// Where the decoder is within the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Accumulating payload bytes (possibly none yet).
    Collecting,
    /// The previous byte was `ESC`.
    EscapePending,
    /// Skipping the rest of a rejected frame until the next `END`.
    Discarding,
    /// The frame buffer could not be grown; [`SlipDecoder::reset`] is required.
    Failed,
}

/// Running counters for one decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Packets delivered.
    pub packets: u64,
    /// Raw bytes consumed.
    pub bytes: u64,
    pub unknown_escapes: u64,
    /// Frames dropped for exceeding the payload limit.
    pub oversized: u64,
    /// Times the frame buffer was grown.
    pub growths: u64,
}

/// A decoded payload, borrowed from the decoder's buffer.
///
/// Only valid for the duration of the [`PacketSink::on_packet`] call that
/// receives it: the buffer is reused for the next frame right after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    data: &'a [u8],
}

impl<'a> Packet<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Deref for Packet<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl AsRef<[u8]> for Packet<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

/// Receiver of decoder output.
///
/// Any `FnMut(Packet<'_>)` closure is a sink; protocol errors then go to the
/// default [`PacketSink::on_error`], which logs them.
pub trait PacketSink {
    /// A complete frame was decoded.
    fn on_packet(&mut self, packet: Packet<'_>);

    /// A recoverable protocol error was detected. Decoding continues.
    fn on_error(&mut self, err: FrameError) {
        warn!(error = %err, "slip protocol error");
    }
}

impl<F> PacketSink for F
where
    F: FnMut(Packet<'_>),
{
    fn on_packet(&mut self, packet: Packet<'_>) {
        self(packet)
    }
}

/// Incremental SLIP decoder.
///
/// Holds the escape flag and the partially decoded frame between calls, so
/// input can be split at any byte boundary.
#[derive(Debug)]
pub struct SlipDecoder {
    buf: Vec<u8>,
    state: DecoderState,
    config: DecoderConfig,
    stats: DecoderStats,
}

impl SlipDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    ///
    /// The frame buffer is allocated on the first payload byte.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            buf: Vec::new(),
            state: DecoderState::Collecting,
            config,
            stats: DecoderStats::default(),
        }
    }

    /// Feed a chunk of raw channel bytes.
    ///
    /// Each completed frame is handed to `sink.on_packet` in stream order;
    /// protocol errors go to `sink.on_error`. Returns the number of packets
    /// delivered from this chunk.
    ///
    /// Fails only with [`FrameError::AllocationFailure`], after which the
    /// decoder refuses input until [`reset`](Self::reset).
    pub fn decode<S>(&mut self, chunk: &[u8], sink: &mut S) -> Result<usize>
    where
        S: PacketSink + ?Sized,
    {
        if self.state == DecoderState::Failed {
            return Err(FrameError::AllocationFailure {
                requested: self.next_capacity(),
            });
        }

        let before = self.stats.packets;
        for &byte in chunk {
            self.stats.bytes += 1;
            if let Err(err) = self.step(byte, sink) {
                self.state = DecoderState::Failed;
                return Err(err);
            }
        }
        Ok((self.stats.packets - before) as usize)
    }

    /// [`decode`](Self::decode) with a closure receiving each packet.
    pub fn decode_with<F>(&mut self, chunk: &[u8], mut on_packet: F) -> Result<usize>
    where
        F: FnMut(Packet<'_>),
    {
        self.decode(chunk, &mut on_packet)
    }

    /// Decode `chunk` and collect owned copies of the completed packets.
    pub fn decode_to_vec(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut packets = Vec::new();
        self.decode_with(chunk, |packet| packets.push(packet.to_vec()))?;
        Ok(packets)
    }

    /// Drop any partial frame and clear the escape flag.
    ///
    /// Buffer capacity and statistics are kept.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = DecoderState::Collecting;
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Payload bytes accumulated for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Current frame buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Whether a frame is partially decoded.
    pub fn is_mid_frame(&self) -> bool {
        !self.buf.is_empty() || self.state == DecoderState::EscapePending
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn step<S>(&mut self, byte: u8, sink: &mut S) -> Result<()>
    where
        S: PacketSink + ?Sized,
    {
        trace!(byte, state = ?self.state, "decode byte");
        match self.state {
            DecoderState::Collecting => match byte {
                END => self.finish_frame(sink),
                ESC => self.state = DecoderState::EscapePending,
                other => self.append(other, sink)?,
            },
            DecoderState::EscapePending => {
                self.state = DecoderState::Collecting;
                match byte {
                    ESC_END => self.append(END, sink)?,
                    ESC_ESC => self.append(ESC, sink)?,
                    other => self.unknown_escape(other, sink)?,
                }
            }
            DecoderState::Discarding => {
                if byte == END {
                    self.state = DecoderState::Collecting;
                }
            }
            DecoderState::Failed => {}
        }
        Ok(())
    }

    fn finish_frame<S>(&mut self, sink: &mut S)
    where
        S: PacketSink + ?Sized,
    {
        if self.buf.is_empty() {
            return;
        }
        debug!(len = self.buf.len(), "frame complete");
        self.stats.packets += 1;
        sink.on_packet(Packet::new(&self.buf));
        self.buf.clear();
    }

    fn unknown_escape<S>(&mut self, byte: u8, sink: &mut S) -> Result<()>
    where
        S: PacketSink + ?Sized,
    {
        self.stats.unknown_escapes += 1;
        sink.on_error(FrameError::UnknownEscape { byte });

        if byte == END {
            // The delimiter still closes the frame; the escape is abandoned.
            if self.config.escape_policy == EscapePolicy::DiscardFrame {
                self.buf.clear();
            } else {
                self.finish_frame(sink);
            }
            return Ok(());
        }

        match self.config.escape_policy {
            EscapePolicy::Drop => Ok(()),
            EscapePolicy::PassThrough => self.append(byte, sink),
            EscapePolicy::DiscardFrame => {
                self.buf.clear();
                self.state = DecoderState::Discarding;
                Ok(())
            }
        }
    }

    fn append<S>(&mut self, byte: u8, sink: &mut S) -> Result<()>
    where
        S: PacketSink + ?Sized,
    {
        if self.buf.len() >= self.config.max_payload_size {
            self.stats.oversized += 1;
            sink.on_error(FrameError::PayloadTooLarge {
                size: self.buf.len() + 1,
                max: self.config.max_payload_size,
            });
            self.buf.clear();
            self.state = DecoderState::Discarding;
            return Ok(());
        }

        if self.buf.len() == self.buf.capacity() {
            self.grow()?;
        }
        self.buf.push(byte);
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let requested = self.next_capacity();
        self.buf
            .try_reserve_exact(requested - self.buf.len())
            .map_err(|_| FrameError::AllocationFailure { requested })?;
        self.stats.growths += 1;
        debug!(capacity = self.buf.capacity(), "expanded frame buffer");
        Ok(())
    }

    fn next_capacity(&self) -> usize {
        match self.buf.capacity() {
            0 => self.config.initial_capacity.max(1),
            cap => cap.saturating_mul(2),
        }
    }
}

impl Default for SlipDecoder {
    fn default() -> Self {
        Self::new()
    }
}
