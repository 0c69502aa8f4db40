//! The seat-inventory controller.
//!
//! Serializes every seat mutation for an event behind that event's
//! distributed lock: acquire, re-read the store, mutate through the
//! lifecycle rules, persist in one transaction, invalidate the cache,
//! release. The release runs on every path after a successful acquire.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use boxoffice_core::{
    BookingDetails, Event, EventCache, LockToken, Reservation, ReservationStatus, SeatLock,
    TicketStore, TicketingError,
};

use crate::lifecycle;

const BACKOFF_BASE: Duration = Duration::from_millis(25);
const BACKOFF_MAX: Duration = Duration::from_millis(400);

/// Tunables for the critical section and the snapshot cache.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Lock TTL; bounds how long a crashed holder can block an event.
    pub lock_ttl: Duration,
    /// Hard deadline for lock acquisition before `LockContention`.
    pub lock_wait: Duration,
    /// TTL for cache snapshots populated on the read path.
    pub cache_ttl: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(10),
            lock_wait: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

pub struct InventoryController {
    store: Arc<dyn TicketStore>,
    lock: Arc<dyn SeatLock>,
    cache: Arc<dyn EventCache>,
    policy: BookingPolicy,
}

impl InventoryController {
    pub fn new(
        store: Arc<dyn TicketStore>,
        lock: Arc<dyn SeatLock>,
        cache: Arc<dyn EventCache>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            lock,
            cache,
            policy,
        }
    }

    /// Books `details.quantity` seats on `event_id` and returns the
    /// persisted CONFIRMED reservation.
    pub async fn book(
        &self,
        event_id: Uuid,
        details: BookingDetails,
    ) -> Result<Reservation, TicketingError> {
        info!(%event_id, quantity = details.quantity, "booking started");

        let token = self.acquire_event_lock(event_id).await?;
        let result = self.book_locked(event_id, details).await;
        self.release_event_lock(event_id, token).await;

        if let Ok(reservation) = &result {
            info!(
                %event_id,
                reservation_code = %reservation.reservation_code,
                "booking confirmed"
            );
        }
        result
    }

    async fn book_locked(
        &self,
        event_id: Uuid,
        details: BookingDetails,
    ) -> Result<Reservation, TicketingError> {
        // Authoritative read; the cache is never consulted inside the
        // critical section.
        let mut event = self
            .store
            .fetch_event(event_id)
            .await
            .map_err(TicketingError::store)?
            .ok_or(TicketingError::EventNotFound(event_id))?;

        lifecycle::book_seats(&mut event, details.quantity)?;
        event.updated_at = Utc::now();

        let reservation = Reservation::confirmed(&event, details);
        self.store
            .commit_booking(&event, &reservation)
            .await
            .map_err(TicketingError::store)?;

        self.invalidate_snapshots(event_id).await;
        Ok(reservation)
    }

    /// Cancels the reservation with `code`, returning the seats to its
    /// event under the same per-event lock `book` uses.
    pub async fn cancel(&self, code: &str) -> Result<Reservation, TicketingError> {
        info!(reservation_code = %code, "cancellation started");

        // Cheap pre-checks before taking the lock; both are re-validated
        // inside the critical section.
        let reservation = self
            .store
            .fetch_reservation(code)
            .await
            .map_err(TicketingError::store)?
            .ok_or_else(|| TicketingError::ReservationNotFound(code.to_string()))?;
        lifecycle::ensure_cancellable(&reservation)?;

        let event_id = reservation.event_id;
        let token = self.acquire_event_lock(event_id).await?;
        let result = self.cancel_locked(code, event_id).await;
        self.release_event_lock(event_id, token).await;

        if result.is_ok() {
            info!(reservation_code = %code, %event_id, "cancellation completed");
        }
        result
    }

    async fn cancel_locked(
        &self,
        code: &str,
        event_id: Uuid,
    ) -> Result<Reservation, TicketingError> {
        let mut reservation = self
            .store
            .fetch_reservation(code)
            .await
            .map_err(TicketingError::store)?
            .ok_or_else(|| TicketingError::ReservationNotFound(code.to_string()))?;
        lifecycle::ensure_cancellable(&reservation)?;

        let mut event = self
            .store
            .fetch_event(event_id)
            .await
            .map_err(TicketingError::store)?
            .ok_or(TicketingError::EventNotFound(event_id))?;

        lifecycle::restore_seats(&mut event, reservation.quantity);
        event.updated_at = Utc::now();
        reservation.status = ReservationStatus::Cancelled;

        self.store
            .commit_cancellation(&event, &reservation)
            .await
            .map_err(TicketingError::store)?;

        self.invalidate_snapshots(event_id).await;
        Ok(reservation)
    }

    /// One event, cache-aside.
    pub async fn event(&self, event_id: Uuid) -> Result<Event, TicketingError> {
        match self.cache.event(event_id).await {
            Ok(Some(event)) => {
                debug!(%event_id, "event served from cache");
                return Ok(event);
            }
            Ok(None) => {}
            Err(err) => warn!(%event_id, error = %err, "event cache read failed"),
        }

        let event = self
            .store
            .fetch_event(event_id)
            .await
            .map_err(TicketingError::store)?
            .ok_or(TicketingError::EventNotFound(event_id))?;

        if let Err(err) = self.cache.put_event(&event, self.policy.cache_ttl).await {
            warn!(%event_id, error = %err, "event cache populate failed");
        }
        Ok(event)
    }

    /// Every event, straight from the store.
    pub async fn events(&self) -> Result<Vec<Event>, TicketingError> {
        self.store.list_events().await.map_err(TicketingError::store)
    }

    /// Bookable events, cache-aside against the fixed available-list key.
    pub async fn available_events(&self) -> Result<Vec<Event>, TicketingError> {
        match self.cache.available_events().await {
            Ok(Some(events)) => {
                debug!("available events served from cache");
                return Ok(events);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "available-events cache read failed"),
        }

        let events = self
            .store
            .list_available_events()
            .await
            .map_err(TicketingError::store)?;

        if let Err(err) = self
            .cache
            .put_available_events(&events, self.policy.cache_ttl)
            .await
        {
            warn!(error = %err, "available-events cache populate failed");
        }
        Ok(events)
    }

    pub async fn reservation(&self, code: &str) -> Result<Reservation, TicketingError> {
        self.store
            .fetch_reservation(code)
            .await
            .map_err(TicketingError::store)?
            .ok_or_else(|| TicketingError::ReservationNotFound(code.to_string()))
    }

    /// Repeated single-shot attempts under exponential backoff until the
    /// configured deadline, then `LockContention`.
    async fn acquire_event_lock(&self, event_id: Uuid) -> Result<LockToken, TicketingError> {
        let deadline = Instant::now() + self.policy.lock_wait;
        let mut backoff = BACKOFF_BASE;

        loop {
            if let Some(token) = self
                .lock
                .try_acquire(event_id, self.policy.lock_ttl)
                .await
                .map_err(TicketingError::lock)?
            {
                return Ok(token);
            }
            if Instant::now() + backoff >= deadline {
                debug!(%event_id, "seat lock still held at deadline");
                return Err(TicketingError::LockContention);
            }
            sleep(backoff).await;
            backoff = (backoff * 2).min(BACKOFF_MAX);
        }
    }

    async fn release_event_lock(&self, event_id: Uuid, token: LockToken) {
        if let Err(err) = self.lock.release(event_id, &token).await {
            // The TTL reaps an unreleased key; the next booking just waits
            // out the remainder.
            warn!(%event_id, error = %err, "seat lock release failed");
        }
    }

    /// Best-effort: a committed write is never failed over the cache.
    async fn invalidate_snapshots(&self, event_id: Uuid) {
        if let Err(err) = self.cache.evict_event(event_id).await {
            warn!(%event_id, error = %err, "event snapshot eviction failed");
        }
        if let Err(err) = self.cache.evict_available_events().await {
            warn!(error = %err, "available-events snapshot eviction failed");
        }
    }
}
