use bytes::{BufMut, Bytes, BytesMut};

use crate::decoder::{DecoderConfig, EscapePolicy, DEFAULT_INITIAL_CAPACITY};

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// `ESC ESC_END` stands for a payload `END` byte.
pub const ESC_END: u8 = 0xDC;
/// `ESC ESC_ESC` stands for a payload `ESC` byte.
pub const ESC_ESC: u8 = 0xDD;

/// Default maximum decoded payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Read chunk size used by the stream readers.
pub const DEFAULT_READ_CHUNK: usize = 256;

/// An owned, decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Exact number of bytes this payload occupies on the wire.
    pub fn wire_size(&self) -> usize {
        encoded_len(&self.payload)
    }
}

/// Upper bound on the encoded size of a `payload_len`-byte payload.
///
/// Every byte may need escaping, plus the two delimiters.
pub fn max_encoded_len(payload_len: usize) -> usize {
    payload_len.saturating_mul(2).saturating_add(2)
}

/// Exact encoded size of `payload`.
pub fn encoded_len(payload: &[u8]) -> usize {
    let escaped = payload.iter().filter(|&&b| b == END || b == ESC).count();
    payload.len() + escaped + 2
}

/// Encode a payload into a SLIP frame, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────┬──────┐
/// │ 0xC0 │ payload, 0xC0 → 0xDB 0xDC,   │ 0xC0 │
/// │ END  │          0xDB → 0xDB 0xDD    │ END  │
/// └──────┴──────────────────────────────┴──────┘
/// ```
///
/// `dst` is reserved to the worst case up front, so the loop never
/// reallocates.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(max_encoded_len(payload.len()));
    dst.put_u8(END);
    for &byte in payload {
        match byte {
            END => dst.put_slice(&[ESC, ESC_END]),
            ESC => dst.put_slice(&[ESC, ESC_ESC]),
            other => dst.put_u8(other),
        }
    }
    dst.put_u8(END);
}

/// Encode a payload into a freshly allocated buffer.
pub fn encode_to_vec(payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_frame(payload, &mut buf);
    buf.to_vec()
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum decoded payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// What to do with an unknown escape sequence.
    pub escape_policy: EscapePolicy,
    /// Bytes requested from the channel per read. Default: 256.
    pub read_chunk_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl FrameConfig {
    /// Decoder settings derived from this configuration.
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_payload_size: self.max_payload_size,
            escape_policy: self.escape_policy,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            escape_policy: EscapePolicy::default(),
            read_chunk_size: DEFAULT_READ_CHUNK,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
