use std::fmt;

use tracing::{debug, warn};

use crate::error::{DispatchError, Result};

/// Default upper bound on subscribers per registry.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 10;

/// Handle identifying one subscription.
///
/// Ids are never reused within a registry, so unsubscribing a stale handle
/// cannot remove somebody else's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription #{}", self.0)
    }
}

struct Entry<F: ?Sized> {
    id: SubscriptionId,
    callback: Box<F>,
}

/// Fixed-capacity, insertion-ordered list of boxed callbacks.
///
/// `F` is the callback's trait-object type, e.g. `dyn FnMut() + Send`.
/// The typed front-ends ([`crate::Signal`], [`crate::EventBus`]) decide how
/// callbacks are invoked; the registry only keeps them in order.
pub struct Registry<F: ?Sized> {
    entries: Vec<Entry<F>>,
    capacity: usize,
    next_id: u64,
}

impl<F: ?Sized> Registry<F> {
    /// Create a registry bounded by [`DEFAULT_MAX_SUBSCRIBERS`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SUBSCRIBERS)
    }

    /// Create a registry bounded by `capacity` subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append a callback.
    ///
    /// Fails with [`DispatchError::CapacityExceeded`] when the registry is
    /// full; the registered set is left untouched in that case.
    pub fn subscribe(&mut self, callback: Box<F>) -> Result<SubscriptionId> {
        if self.is_full() {
            warn!(max = self.capacity, "registry full; subscription rejected");
            return Err(DispatchError::CapacityExceeded { max: self.capacity });
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, callback });
        debug!(%id, count = self.entries.len(), "subscribed");
        Ok(id)
    }

    /// Remove a callback, keeping the relative order of the others.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(DispatchError::NotFound(id))?;
        self.entries.remove(index);
        debug!(%id, count = self.entries.len(), "unsubscribed");
        Ok(())
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Registered ids in notification order.
    pub fn ids(&self) -> impl Iterator<Item = SubscriptionId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    /// Visit every callback in registration order.
    ///
    /// Returns the number of callbacks visited.
    pub fn for_each_mut(&mut self, mut visit: impl FnMut(&mut F)) -> usize {
        for entry in &mut self.entries {
            visit(&mut *entry.callback);
        }
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of subscribers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Drop every subscriber. Ids already handed out stay retired.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<F: ?Sized> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
