use crate::error::Result;
use crate::registry::{Registry, SubscriptionId};

/// Event bus: every subscriber receives each published event.
///
/// Unlike [`crate::Signal`], the trigger carries a value (`T`), shared by
/// reference with all subscribers. A bus is an ordinary owned value; pass it
/// to the layers that need it instead of keeping one per process.
pub struct EventBus<T> {
    subscribers: Registry<dyn FnMut(&T) + Send>,
}

impl<T> EventBus<T> {
    /// Create a bus accepting up to the default number of subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Registry::new(),
        }
    }

    /// Create a bus accepting up to `max_subscribers` subscribers.
    pub fn with_capacity(max_subscribers: usize) -> Self {
        Self {
            subscribers: Registry::with_capacity(max_subscribers),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&T) + Send + 'static) -> Result<SubscriptionId> {
        self.subscribers.subscribe(Box::new(handler))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        self.subscribers.unsubscribe(id)
    }

    /// Deliver `event` to every subscriber in subscription order.
    ///
    /// Returns the number of subscribers notified.
    pub fn publish(&mut self, event: &T) -> usize {
        self.subscribers.for_each_mut(|handler| handler(event))
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.subscribers.capacity()
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers)
            .finish()
    }
}
