use bytes::BytesMut;
use tracing::{debug, warn};

use slipstack_dispatch::{DispatchError, EventBus, Registry, SubscriptionId};
use slipstack_frame::{encode_frame, FrameError, Packet, PacketSink, SlipDecoder};

use crate::config::StackConfig;
use crate::error::{Result, StackError};

/// A Top-layer packet handler.
///
/// The packet borrows the decoder's buffer and is only valid for the call.
pub type Handler = dyn for<'a> FnMut(Packet<'a>) + Send;

/// Middle layer: SLIP codec plus the handler registry.
///
/// Transmit: [`encode`](Self::encode) frames a payload into an internal
/// buffer. Receive: [`on_raw`](Self::on_raw) decodes raw chunks and
/// publishes every completed packet to the handlers in registration order.
pub struct Middle {
    decoder: SlipDecoder,
    handlers: Registry<Handler>,
    errors: EventBus<FrameError>,
    tx_buf: BytesMut,
}

/// Routes decoder output into the registries for one `on_raw` call.
struct Fanout<'a> {
    handlers: &'a mut Registry<Handler>,
    errors: &'a mut EventBus<FrameError>,
}

impl PacketSink for Fanout<'_> {
    fn on_packet(&mut self, packet: Packet<'_>) {
        let notified = self.handlers.for_each_mut(|handler| handler(packet));
        debug!(len = packet.len(), notified, "packet published");
    }

    fn on_error(&mut self, err: FrameError) {
        warn!(error = %err, "slip protocol error");
        self.errors.publish(&err);
    }
}

impl Middle {
    pub fn new() -> Self {
        Self::with_config(&StackConfig::default())
    }

    pub fn with_config(config: &StackConfig) -> Self {
        Self {
            decoder: SlipDecoder::with_config(config.decoder.clone()),
            handlers: Registry::with_capacity(config.max_handlers),
            errors: EventBus::new(),
            tx_buf: BytesMut::new(),
        }
    }

    /// Register a packet handler.
    pub fn register_handler<F>(&mut self, handler: F) -> Result<SubscriptionId>
    where
        F: for<'a> FnMut(Packet<'a>) + Send + 'static,
    {
        self.handlers
            .subscribe(Box::new(handler))
            .map_err(|err| match err {
                DispatchError::CapacityExceeded { max } => StackError::TooManyHandlers { max },
                other => StackError::Dispatch(other),
            })
    }

    pub fn unregister_handler(&mut self, id: SubscriptionId) -> Result<()> {
        self.handlers.unsubscribe(id)?;
        Ok(())
    }

    /// Observe recoverable protocol errors (unknown escapes, oversize frames).
    pub fn subscribe_errors<F>(&mut self, observer: F) -> Result<SubscriptionId>
    where
        F: FnMut(&FrameError) + Send + 'static,
    {
        Ok(self.errors.subscribe(observer)?)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Frame `payload` for transmission.
    ///
    /// The returned slice borrows an internal buffer that is reused by the
    /// next call.
    pub fn encode(&mut self, payload: &[u8]) -> &[u8] {
        self.tx_buf.clear();
        encode_frame(payload, &mut self.tx_buf);
        &self.tx_buf
    }

    /// Decode a raw chunk from the Bottom layer.
    ///
    /// Returns the number of packets published. Only a failed buffer
    /// allocation is returned as an error; the stack must be reset or
    /// dropped after that.
    pub fn on_raw(&mut self, chunk: &[u8]) -> Result<usize> {
        let mut sink = Fanout {
            handlers: &mut self.handlers,
            errors: &mut self.errors,
        };
        Ok(self.decoder.decode(chunk, &mut sink)?)
    }

    pub fn decoder(&self) -> &SlipDecoder {
        &self.decoder
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }
}

impl Default for Middle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Middle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middle")
            .field("decoder", &self.decoder)
            .field("handlers", &self.handlers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use slipstack_frame::{encode_to_vec, EscapePolicy, END, ESC};

    use super::*;

    type Log = Arc<Mutex<Vec<(&'static str, Vec<u8>)>>>;

    fn tagged(log: &Log, tag: &'static str) -> impl FnMut(Packet<'_>) + Send + 'static {
        let log = Arc::clone(log);
        move |packet: Packet<'_>| log.lock().unwrap().push((tag, packet.to_vec()))
    }

    #[test]
    fn encode_reference_vector() {
        let mut middle = Middle::new();
        assert_eq!(
            middle.encode(&[0x01, 0xC0, 0x02, 0xDB]),
            [0xC0, 0x01, 0xDB, 0xDC, 0x02, 0xDB, 0xDD, 0xC0]
        );
        assert_eq!(middle.encode(b"a"), [END, b'a', END]);
    }

    #[test]
    fn on_raw_publishes_to_handlers_in_order() {
        let log: Log = Arc::default();
        let mut middle = Middle::new();
        middle.register_handler(tagged(&log, "first")).unwrap();
        middle.register_handler(tagged(&log, "second")).unwrap();

        let published = middle.on_raw(&encode_to_vec(&[END, ESC])).unwrap();

        assert_eq!(published, 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", vec![END, ESC]), ("second", vec![END, ESC])]
        );
    }

    #[test]
    fn unregister_keeps_remaining_order() {
        let log: Log = Arc::default();
        let mut middle = Middle::new();
        middle.register_handler(tagged(&log, "a")).unwrap();
        let b = middle.register_handler(tagged(&log, "b")).unwrap();
        middle.register_handler(tagged(&log, "c")).unwrap();

        middle.unregister_handler(b).unwrap();
        middle.on_raw(&encode_to_vec(b"x")).unwrap();

        let tags: Vec<_> = log.lock().unwrap().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, ["a", "c"]);
        assert!(matches!(
            middle.unregister_handler(b),
            Err(StackError::Dispatch(DispatchError::NotFound(_)))
        ));
    }

    #[test]
    fn handler_limit_is_enforced() {
        let mut middle = Middle::with_config(&StackConfig::default().with_max_handlers(2));
        middle.register_handler(|_| {}).unwrap();
        middle.register_handler(|_| {}).unwrap();

        let err = middle.register_handler(|_| {}).unwrap_err();
        assert!(matches!(err, StackError::TooManyHandlers { max: 2 }));
        assert!(!err.is_terminal());
        assert_eq!(middle.handler_count(), 2);
    }

    #[test]
    fn frames_split_across_chunks() {
        let log: Log = Arc::default();
        let mut middle = Middle::new();
        middle.register_handler(tagged(&log, "h")).unwrap();

        let mut wire = encode_to_vec(b"one");
        wire.extend(encode_to_vec(b"two"));
        let mut published = 0;
        for chunk in wire.chunks(3) {
            published += middle.on_raw(chunk).unwrap();
        }

        assert_eq!(published, 2);
        let payloads: Vec<_> = log.lock().unwrap().iter().map(|(_, p)| p.clone()).collect();
        assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn protocol_errors_reach_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut middle = Middle::with_config(
            &StackConfig::default().with_escape_policy(EscapePolicy::PassThrough),
        );
        let errors = Arc::clone(&seen);
        middle
            .subscribe_errors(move |err| errors.lock().unwrap().push(err.to_string()))
            .unwrap();
        let log: Log = Arc::default();
        middle.register_handler(tagged(&log, "h")).unwrap();

        middle.on_raw(&[END, 0x01, ESC, 0x42, END]).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["unknown escape sequence 0xDB 0x42".to_string()]
        );
        assert_eq!(log.lock().unwrap()[0].1, vec![0x01, 0x42]);
        assert_eq!(middle.decoder().stats().unknown_escapes, 1);
    }

    #[test]
    fn no_handlers_still_decodes() {
        let mut middle = Middle::new();
        assert_eq!(middle.on_raw(&encode_to_vec(b"dropped")).unwrap(), 1);
        assert_eq!(middle.decoder().stats().packets, 1);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let log: Log = Arc::default();
        let mut middle = Middle::new();
        middle.register_handler(tagged(&log, "h")).unwrap();

        middle.on_raw(&[END, 0x01, 0x02]).unwrap();
        middle.reset();
        middle.on_raw(&[0x03, END]).unwrap();

        assert_eq!(log.lock().unwrap()[0].1, vec![0x03]);
    }
}
