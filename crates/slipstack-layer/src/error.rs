/// Errors that can occur in layer stack operations.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// Transport-level error (bind, connect, fifo setup).
    #[error("transport error: {0}")]
    Transport(#[from] slipstack_transport::TransportError),

    /// Frame-level error. Only fatal conditions reach the caller this way.
    #[error("frame error: {0}")]
    Frame(#[from] slipstack_frame::FrameError),

    /// Registry bookkeeping error.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] slipstack_dispatch::DispatchError),

    /// The handler registry is full.
    #[error("too many handlers (max {max})")]
    TooManyHandlers { max: usize },

    /// The channel accepted fewer bytes than the frame holds.
    #[error("partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    /// Channel read or write failed.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Handlers must be registered before the receive path starts.
    #[error("cannot register handlers once listening has started")]
    ListenerActive,
}

impl StackError {
    /// Whether the session can keep going after this error.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            StackError::TooManyHandlers { .. }
                | StackError::Dispatch(_)
                | StackError::ListenerActive
        )
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
