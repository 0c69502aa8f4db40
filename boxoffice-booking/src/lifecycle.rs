//! Pure reservation-lifecycle logic: seat math, status derivation and the
//! allowed state transitions. No I/O, so all of it tests without a store
//! or a lock service.

use boxoffice_core::{Event, EventStatus, Reservation, ReservationStatus, TicketingError};

pub const MIN_QUANTITY_PER_BOOKING: i32 = 1;
pub const MAX_QUANTITY_PER_BOOKING: i32 = 4;

/// Decides whether `requested` seats can come out of `available_seats`.
///
/// The 1-4 per-booking window is request validation and lives at the API
/// boundary; here only a non-positive quantity is rejected, since booking
/// zero or negative seats would corrupt the count.
pub fn check_availability(available_seats: i32, requested: i32) -> Result<(), TicketingError> {
    if requested < MIN_QUANTITY_PER_BOOKING {
        return Err(TicketingError::InvalidQuantity(requested));
    }
    if available_seats < requested {
        return Err(TicketingError::InsufficientSeats {
            remaining: available_seats,
        });
    }
    Ok(())
}

/// Status an event ends up in once `available_seats` has the given value.
/// A CANCELLED event is never resurrected by seat movements.
pub fn status_for(current: EventStatus, available_seats: i32) -> EventStatus {
    match current {
        EventStatus::Cancelled => EventStatus::Cancelled,
        _ if available_seats == 0 => EventStatus::SoldOut,
        _ => EventStatus::Available,
    }
}

/// Takes `quantity` seats out of `event`, deriving the resulting status.
pub fn book_seats(event: &mut Event, quantity: i32) -> Result<(), TicketingError> {
    check_availability(event.available_seats, quantity)?;
    event.available_seats -= quantity;
    event.status = status_for(event.status, event.available_seats);
    Ok(())
}

/// Returns `quantity` seats to `event`, reverting SOLD_OUT to AVAILABLE.
pub fn restore_seats(event: &mut Event, quantity: i32) {
    event.available_seats += quantity;
    event.status = status_for(event.status, event.available_seats);
}

/// Only CONFIRMED reservations may transition; a second cancel is an error,
/// not a no-op.
pub fn ensure_cancellable(reservation: &Reservation) -> Result<(), TicketingError> {
    match reservation.status {
        ReservationStatus::Confirmed => Ok(()),
        ReservationStatus::Cancelled => Err(TicketingError::AlreadyCancelled),
    }
}
