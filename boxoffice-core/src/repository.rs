use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::event::Event;
use crate::reservation::Reservation;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque per-acquisition lock value. Release only succeeds against the
/// token handed out by the matching acquire, so an expired holder cannot
/// delete a later holder's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Authoritative store for events and reservations.
///
/// The two `commit_*` operations are transactional: the event mutation and
/// the reservation write either both land or neither does.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, BoxError>;

    async fn list_events(&self) -> Result<Vec<Event>, BoxError>;

    /// AVAILABLE events that still have seats, ordered by event date.
    async fn list_available_events(&self) -> Result<Vec<Event>, BoxError>;

    async fn fetch_reservation(&self, code: &str) -> Result<Option<Reservation>, BoxError>;

    /// Persists the decremented event together with the new reservation.
    async fn commit_booking(
        &self,
        event: &Event,
        reservation: &Reservation,
    ) -> Result<(), BoxError>;

    /// Persists the restored event together with the cancelled reservation.
    async fn commit_cancellation(
        &self,
        event: &Event,
        reservation: &Reservation,
    ) -> Result<(), BoxError>;
}

/// Time-bounded, cross-process mutual exclusion keyed by event id.
///
/// Advisory only: it does not itself stop anyone from writing the store
/// outside the lock. The TTL bounds the blast radius of a crashed holder.
#[async_trait]
pub trait SeatLock: Send + Sync {
    /// Single non-blocking attempt. `Ok(None)` means someone else holds it.
    async fn try_acquire(
        &self,
        event_id: Uuid,
        ttl: Duration,
    ) -> Result<Option<LockToken>, BoxError>;

    /// Compare-and-delete: releases only while `token` still owns the key.
    async fn release(&self, event_id: Uuid, token: &LockToken) -> Result<(), BoxError>;
}

/// Keyed snapshot cache for event data. Not authoritative; entries may be
/// evicted or expire at any time. Writers never update values in place,
/// they only delete stale keys.
#[async_trait]
pub trait EventCache: Send + Sync {
    async fn event(&self, event_id: Uuid) -> Result<Option<Event>, BoxError>;

    async fn put_event(&self, event: &Event, ttl: Duration) -> Result<(), BoxError>;

    async fn evict_event(&self, event_id: Uuid) -> Result<(), BoxError>;

    async fn available_events(&self) -> Result<Option<Vec<Event>>, BoxError>;

    async fn put_available_events(
        &self,
        events: &[Event],
        ttl: Duration,
    ) -> Result<(), BoxError>;

    async fn evict_available_events(&self) -> Result<(), BoxError>;
}
