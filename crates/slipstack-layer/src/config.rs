use slipstack_frame::{DecoderConfig, EscapePolicy, DEFAULT_READ_CHUNK};

/// Default upper bound on Top-layer packet handlers.
pub const DEFAULT_MAX_HANDLERS: usize = 10;

/// Layer stack settings.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Maximum registered packet handlers. Default: 10.
    pub max_handlers: usize,
    /// Bytes requested per channel read. Default: 256.
    pub read_chunk_size: usize,
    /// Receive-path decoder settings.
    pub decoder: DecoderConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_handlers: DEFAULT_MAX_HANDLERS,
            read_chunk_size: DEFAULT_READ_CHUNK,
            decoder: DecoderConfig::default(),
        }
    }
}

impl StackConfig {
    pub fn with_max_handlers(mut self, max: usize) -> Self {
        self.max_handlers = max;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn with_escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.decoder.escape_policy = policy;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.decoder.max_payload_size = max;
        self
    }

    pub fn with_decoder_config(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = StackConfig::default();
        assert_eq!(cfg.max_handlers, 10);
        assert_eq!(cfg.read_chunk_size, 256);
        assert_eq!(cfg.decoder.escape_policy, EscapePolicy::Drop);
    }

    #[test]
    fn builders_override_fields() {
        let cfg = StackConfig::default()
            .with_max_handlers(2)
            .with_read_chunk_size(0)
            .with_escape_policy(EscapePolicy::DiscardFrame)
            .with_max_payload_size(64);

        assert_eq!(cfg.max_handlers, 2);
        assert_eq!(cfg.read_chunk_size, 1, "zero chunk size is clamped");
        assert_eq!(cfg.decoder.escape_policy, EscapePolicy::DiscardFrame);
        assert_eq!(cfg.decoder.max_payload_size, 64);
    }
}
