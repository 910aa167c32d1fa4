//! `tokio_util::codec` adapter for async streams.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::decoder::SlipDecoder;
use crate::error::{FrameError, Result};

/// SLIP codec for `FramedRead` / `FramedWrite`.
///
/// Input buffers are consumed whole; completed frames queue up until the
/// framed stream asks for them. Recoverable protocol errors are logged and
/// counted in [`SlipCodec::decoder`] stats rather than returned, because a
/// returned error ends a `Framed` stream.
#[derive(Debug)]
pub struct SlipCodec {
    decoder: SlipDecoder,
    pending: std::collections::VecDeque<Bytes>,
    max_payload_size: usize,
}

impl SlipCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            decoder: SlipDecoder::with_config(config.decoder_config()),
            pending: std::collections::VecDeque::new(),
            max_payload_size: config.max_payload_size,
        }
    }

    /// The underlying incremental decoder.
    pub fn decoder(&self) -> &SlipDecoder {
        &self.decoder
    }

    fn encode_payload(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(payload, dst);
        Ok(())
    }
}

impl Default for SlipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SlipCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if !src.is_empty() {
            let chunk = src.split();
            let pending = &mut self.pending;
            self.decoder.decode_with(&chunk, |packet| {
                pending.push_back(Bytes::copy_from_slice(&packet));
            })?;
        }
        Ok(self.pending.pop_front().map(Frame::new))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if self.decoder.is_mid_frame() {
            tracing::debug!(
                buffered = self.decoder.buffered_len(),
                "eof inside frame; discarding partial payload"
            );
            self.decoder.reset();
        }
        Ok(None)
    }
}

impl Encoder<Frame> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        self.encode_payload(&item.payload, dst)
    }
}

impl Encoder<&[u8]> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        self.encode_payload(item, dst)
    }
}
