use uuid::Uuid;

use crate::repository::BoxError;

/// Failure taxonomy for booking and cancellation.
///
/// `LockContention` is transient and worth retrying after a short delay;
/// everything else is permanent for the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum TicketingError {
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    #[error("reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("not enough seats left (remaining: {remaining})")]
    InsufficientSeats { remaining: i32 },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("another booking holds this event, try again shortly")]
    LockContention,

    #[error("reservation is already cancelled")]
    AlreadyCancelled,

    #[error("store error: {0}")]
    Store(#[source] BoxError),

    #[error("lock service error: {0}")]
    Lock(#[source] BoxError),
}

impl TicketingError {
    pub fn store(err: BoxError) -> Self {
        TicketingError::Store(err)
    }

    pub fn lock(err: BoxError) -> Self {
        TicketingError::Lock(err)
    }

    /// Whether the caller can retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TicketingError::LockContention | TicketingError::Store(_) | TicketingError::Lock(_)
        )
    }
}
