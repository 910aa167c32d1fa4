use crate::registry::SubscriptionId;

/// Errors returned by registry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The registry already holds its maximum number of subscribers.
    #[error("registry full (max {max} subscribers)")]
    CapacityExceeded { max: usize },

    /// No subscriber with this id is registered.
    #[error("{0} is not registered")]
    NotFound(SubscriptionId),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
