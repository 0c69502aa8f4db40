use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// A confirmed or cancelled claim on some quantity of an event's seats.
///
/// Reservations are never deleted; cancellation flips `status` and nothing
/// else. `quantity` and `total_price` are frozen at confirmation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_name: String,
    pub email: String,
    pub phone: String,
    pub quantity: i32,
    pub total_price: i32,
    pub status: ReservationStatus,
    pub reservation_code: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requester details captured with a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    pub user_name: String,
    pub email: String,
    pub phone: String,
    pub quantity: i32,
}

impl Reservation {
    /// Builds a confirmed reservation against `event`, freezing
    /// `total_price` at the event's current price.
    pub fn confirmed(event: &Event, details: BookingDetails) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id: event.id,
            user_name: details.user_name,
            email: details.email,
            phone: details.phone,
            quantity: details.quantity,
            total_price: event.price * details.quantity,
            status: ReservationStatus::Confirmed,
            reservation_code: generate_reservation_code(),
            created_at: now,
            confirmed_at: Some(now),
        }
    }
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_SUFFIX_LEN: usize = 8;

/// Generates a human-typeable reservation code: `RSV-YYYYMMDD-XXXXXXXX`
/// with the suffix drawn from `A-Z0-9` via the thread-local CSPRNG.
///
/// 36^8 combinations per day; the unique index on `reservation_code` is the
/// backstop for the residual collision odds.
pub fn generate_reservation_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("RSV-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn code_has_expected_shape() {
        let code = generate_reservation_code();
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "RSV");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), CODE_SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn codes_do_not_repeat() {
        let codes: HashSet<String> =
            (0..10_000).map(|_| generate_reservation_code()).collect();
        assert_eq!(codes.len(), 10_000);
    }

    #[test]
    fn confirmed_reservation_freezes_total_price() {
        let event = Event {
            id: Uuid::new_v4(),
            name: "Concert".into(),
            description: None,
            venue: "Main Hall".into(),
            event_date: Utc::now(),
            total_seats: 100,
            available_seats: 100,
            price: 150,
            status: crate::event::EventStatus::Available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let reservation = Reservation::confirmed(
            &event,
            BookingDetails {
                user_name: "Jordan Lee".into(),
                email: "jordan@example.com".into(),
                phone: "010-1234-5678".into(),
                quantity: 3,
            },
        );
        assert_eq!(reservation.total_price, 450);
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(reservation.confirmed_at.is_some());
        assert_eq!(reservation.event_id, event.id);
    }
}
