use crate::error::Result;
use crate::registry::{Registry, SubscriptionId};

/// Slot type: a callable carrying its own context.
pub type Slot = dyn FnMut() + Send;

/// Signal/slot dispatcher.
///
/// Slots are plain closures; any per-slot context is captured by the closure
/// at connect time. `emit` runs every connected slot in connection order.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use slipstack_dispatch::Signal;
///
/// let said = Arc::new(Mutex::new(Vec::new()));
/// let mut clicked = Signal::new();
///
/// let log = Arc::clone(&said);
/// clicked.connect(move || log.lock().unwrap().push("hello")).unwrap();
/// let log = Arc::clone(&said);
/// let bye = clicked.connect(move || log.lock().unwrap().push("goodbye")).unwrap();
///
/// clicked.emit();
/// clicked.disconnect(bye).unwrap();
/// clicked.emit();
///
/// assert_eq!(*said.lock().unwrap(), ["hello", "goodbye", "hello"]);
/// ```
#[derive(Debug, Default)]
pub struct Signal {
    slots: Registry<Slot>,
}

impl Signal {
    /// Create a signal accepting up to the default number of slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal accepting up to `max_slots` slots.
    pub fn with_capacity(max_slots: usize) -> Self {
        Self {
            slots: Registry::with_capacity(max_slots),
        }
    }

    /// Connect a slot.
    pub fn connect(&mut self, slot: impl FnMut() + Send + 'static) -> Result<SubscriptionId> {
        self.slots.subscribe(Box::new(slot))
    }

    /// Disconnect a previously connected slot.
    pub fn disconnect(&mut self, id: SubscriptionId) -> Result<()> {
        self.slots.unsubscribe(id)
    }

    /// Invoke every connected slot. Returns how many ran.
    pub fn emit(&mut self) -> usize {
        self.slots.for_each_mut(|slot| slot())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
