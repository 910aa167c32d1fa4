//! SLIP framing for byte streams.
//!
//! Every payload travels as
//! - a leading `END` (0xC0),
//! - the payload with `END` and `ESC` (0xDB) bytes escaped,
//! - a trailing `END`.
//!
//! The encoder is a total function. The decoder is an incremental state
//! machine: feed it channel-sized chunks in any split and it hands each
//! completed packet to a [`PacketSink`] as a borrowed view of its buffer.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    encode_frame, encode_to_vec, encoded_len, max_encoded_len, Frame, FrameConfig,
    DEFAULT_MAX_PAYLOAD, DEFAULT_READ_CHUNK, END, ESC, ESC_END, ESC_ESC,
};
pub use decoder::{
    DecoderConfig, DecoderState, DecoderStats, EscapePolicy, Packet, PacketSink, SlipDecoder,
    DEFAULT_INITIAL_CAPACITY,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::SlipCodec;
