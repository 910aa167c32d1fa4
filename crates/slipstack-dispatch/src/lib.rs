//! Bounded, ordered callback registries.
//!
//! One trigger, many callbacks. Two flavours are built on the same
//! [`Registry`]:
//! - [`Signal`] - slots take no argument; each slot captures whatever
//!   context it needs.
//! - [`EventBus`] - subscribers receive a shared event value.
//!
//! Registries hold at most a fixed number of subscribers
//! ([`DEFAULT_MAX_SUBSCRIBERS`] unless configured). Subscribers are invoked
//! synchronously, in registration order, on the publishing thread.

pub mod error;
pub mod event_bus;
pub mod registry;
pub mod signal;

pub use error::{DispatchError, Result};
pub use event_bus::EventBus;
pub use registry::{Registry, SubscriptionId, DEFAULT_MAX_SUBSCRIBERS};
pub use signal::Signal;
