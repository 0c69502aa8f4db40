pub mod error;
pub mod event;
pub mod repository;
pub mod reservation;

pub use error::TicketingError;
pub use event::{Event, EventStatus};
pub use repository::{BoxError, EventCache, LockToken, SeatLock, TicketStore};
pub use reservation::{BookingDetails, Reservation, ReservationStatus};
