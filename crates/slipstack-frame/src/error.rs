/// Errors that can occur during SLIP encoding/decoding and frame I/O.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An `ESC` byte was followed by something other than `ESC_END`/`ESC_ESC`.
    #[error("unknown escape sequence 0xDB 0x{byte:02X}")]
    UnknownEscape { byte: u8 },

    /// A frame grew past the configured maximum payload size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame buffer could not be grown.
    #[error("failed to grow frame buffer to {requested} bytes")]
    AllocationFailure { requested: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel was closed (EOF, or a write accepted zero bytes).
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Protocol errors affect one frame; the stream resynchronises at the next `END`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownEscape { .. } | FrameError::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
