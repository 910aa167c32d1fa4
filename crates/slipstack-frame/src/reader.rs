use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;
#[cfg(unix)]
use slipstack_transport::IpcStream;

use crate::codec::{Frame, FrameConfig};
use crate::decoder::{Packet, PacketSink, SlipDecoder};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Pull-style front end to [`SlipDecoder`]: each call returns the next
/// decoded payload as an owned [`Frame`]. Protocol errors are returned in
/// stream order as recoverable `Err`s; the next call carries on with the
/// following frame.
pub struct FrameReader<T> {
    inner: T,
    decoder: SlipDecoder,
    ready: VecDeque<Result<Frame>>,
    chunk: Vec<u8>,
    config: FrameConfig,
}

struct ReadyQueue<'a>(&'a mut VecDeque<Result<Frame>>);

impl PacketSink for ReadyQueue<'_> {
    fn on_packet(&mut self, packet: Packet<'_>) {
        self.0
            .push_back(Ok(Frame::new(Bytes::copy_from_slice(&packet))));
    }

    fn on_error(&mut self, err: FrameError) {
        self.0.push_back(Err(err));
    }
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: SlipDecoder::with_config(config.decoder_config()),
            ready: VecDeque::new(),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF; a partially
    /// received frame is discarded.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return next;
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.decoder.is_mid_frame() {
                    tracing::debug!(
                        buffered = self.decoder.buffered_len(),
                        "eof inside frame; discarding partial payload"
                    );
                    self.decoder.reset();
                }
                return Err(FrameError::ConnectionClosed);
            }

            let mut queue = ReadyQueue(&mut self.ready);
            self.decoder.decode(&self.chunk[..read], &mut queue)?;
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// The decoder driving this reader.
    pub fn decoder(&self) -> &SlipDecoder {
        &self.decoder
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until the stream closes.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}

#[cfg(unix)]
impl FrameReader<IpcStream> {
    /// Create a frame reader for `IpcStream` and apply read timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(crate::writer::transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{encode_to_vec, END, ESC};
    use crate::decoder::EscapePolicy;

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        payloads.iter().flat_map(|p| encode_to_vec(p)).collect()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(encode_to_vec(b"hello")));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames_in_order() {
        let bytes = wire(&[b"one", &[END, ESC], b"three"]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), [END, ESC]);
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"three");
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn large_payload_spans_many_reads() {
        let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        let mut reader = FrameReader::new(Cursor::new(encode_to_vec(&payload)));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn byte_at_a_time_reads() {
        let reader = ByteByByteReader {
            bytes: wire(&[b"slow", b"and steady"]),
            pos: 0,
        };
        let frames: Vec<_> = FrameReader::new(reader).map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload.as_ref(), b"and steady");
    }

    #[test]
    fn empty_stream_is_closed() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn eof_mid_frame_discards_partial_payload() {
        let mut reader = FrameReader::new(Cursor::new(vec![END, 0x01, 0x02]));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
        assert_eq!(reader.decoder().buffered_len(), 0);
    }

    #[test]
    fn unknown_escape_is_reported_then_reading_continues() {
        let mut bytes = vec![END, 0x01, ESC, 0x55, END];
        bytes.extend(encode_to_vec(b"after"));
        let cfg = FrameConfig {
            escape_policy: EscapePolicy::DiscardFrame,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::UnknownEscape { byte: 0x55 }));
        assert!(err.is_recoverable());
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"after");
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut bytes = encode_to_vec(&[0xAA; 32]);
        bytes.extend(encode_to_vec(b"fits"));
        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);

        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::PayloadTooLarge { size: 17, max: 16 })
        ));
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"fits");
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(encode_to_vec(b"ok")),
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut framed = FrameReader::new(WouldBlockReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().read_chunk_size, 256);
        let _inner = reader.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = IpcStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::with_config_ipc(right, FrameConfig::default()).unwrap();

        writer.send(&[0x01, 0xC0, 0x02, 0xDB]).unwrap();
        writer.send(b"ping").unwrap();

        assert_eq!(
            reader.read_frame().unwrap().payload.as_ref(),
            [0x01, 0xC0, 0x02, 0xDB]
        );
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"ping");
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_and_writer_threads() {
        let (left, right) = IpcStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);

        let reader_thread = std::thread::spawn(move || {
            let mut reader = FrameReader::new(right);
            for expected in 0..64u32 {
                let frame = reader.read_frame().unwrap();
                assert_eq!(frame.payload.as_ref(), format!("msg-{expected}").as_bytes());
            }
        });

        for i in 0..64u32 {
            writer.send(format!("msg-{i}").as_bytes()).unwrap();
        }
        reader_thread.join().unwrap();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct WouldBlockReader;

    impl Read for WouldBlockReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
