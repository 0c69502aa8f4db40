//! Booking and cancellation flows driven end to end against in-memory
//! fakes of the store, the seat lock and the snapshot cache, including the
//! many-writers-few-seats contention case.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use boxoffice_booking::{BookingPolicy, InventoryController};
use boxoffice_core::{
    BookingDetails, BoxError, Event, EventCache, EventStatus, LockToken, Reservation,
    SeatLock, TicketStore, TicketingError,
};

#[derive(Default)]
struct MemoryTables {
    events: HashMap<Uuid, Event>,
    reservations: HashMap<String, Reservation>,
}

#[derive(Default)]
struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, BoxError> {
        Ok(self.tables.lock().await.events.get(&event_id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, BoxError> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables.events.values().cloned().collect();
        events.sort_by_key(|e| e.event_date);
        Ok(events)
    }

    async fn list_available_events(&self) -> Result<Vec<Event>, BoxError> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.status == EventStatus::Available && e.available_seats > 0)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        Ok(events)
    }

    async fn fetch_reservation(&self, code: &str) -> Result<Option<Reservation>, BoxError> {
        Ok(self.tables.lock().await.reservations.get(code).cloned())
    }

    async fn commit_booking(
        &self,
        event: &Event,
        reservation: &Reservation,
    ) -> Result<(), BoxError> {
        let mut tables = self.tables.lock().await;
        if tables
            .reservations
            .contains_key(&reservation.reservation_code)
        {
            return Err("duplicate reservation code".into());
        }
        tables.events.insert(event.id, event.clone());
        tables
            .reservations
            .insert(reservation.reservation_code.clone(), reservation.clone());
        Ok(())
    }

    async fn commit_cancellation(
        &self,
        event: &Event,
        reservation: &Reservation,
    ) -> Result<(), BoxError> {
        let mut tables = self.tables.lock().await;
        tables.events.insert(event.id, event.clone());
        tables
            .reservations
            .insert(reservation.reservation_code.clone(), reservation.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryLock {
    held: Mutex<HashMap<Uuid, String>>,
}

#[async_trait]
impl SeatLock for MemoryLock {
    async fn try_acquire(
        &self,
        event_id: Uuid,
        _ttl: Duration,
    ) -> Result<Option<LockToken>, BoxError> {
        let mut held = self.held.lock().await;
        if held.contains_key(&event_id) {
            return Ok(None);
        }
        let token = Uuid::new_v4().simple().to_string();
        held.insert(event_id, token.clone());
        Ok(Some(LockToken::new(token)))
    }

    async fn release(&self, event_id: Uuid, token: &LockToken) -> Result<(), BoxError> {
        let mut held = self.held.lock().await;
        if held.get(&event_id).map(String::as_str) == Some(token.value()) {
            held.remove(&event_id);
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryCache {
    events: Mutex<HashMap<Uuid, Event>>,
    available: Mutex<Option<Vec<Event>>>,
}

#[async_trait]
impl EventCache for MemoryCache {
    async fn event(&self, event_id: Uuid) -> Result<Option<Event>, BoxError> {
        Ok(self.events.lock().await.get(&event_id).cloned())
    }

    async fn put_event(&self, event: &Event, _ttl: Duration) -> Result<(), BoxError> {
        self.events.lock().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn evict_event(&self, event_id: Uuid) -> Result<(), BoxError> {
        self.events.lock().await.remove(&event_id);
        Ok(())
    }

    async fn available_events(&self) -> Result<Option<Vec<Event>>, BoxError> {
        Ok(self.available.lock().await.clone())
    }

    async fn put_available_events(
        &self,
        events: &[Event],
        _ttl: Duration,
    ) -> Result<(), BoxError> {
        *self.available.lock().await = Some(events.to_vec());
        Ok(())
    }

    async fn evict_available_events(&self) -> Result<(), BoxError> {
        *self.available.lock().await = None;
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    lock: Arc<MemoryLock>,
    cache: Arc<MemoryCache>,
    controller: Arc<InventoryController>,
}

fn harness(policy: BookingPolicy) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let lock = Arc::new(MemoryLock::default());
    let cache = Arc::new(MemoryCache::default());
    let controller = Arc::new(InventoryController::new(
        store.clone(),
        lock.clone(),
        cache.clone(),
        policy,
    ));
    Harness {
        store,
        lock,
        cache,
        controller,
    }
}

async fn seed_event(store: &MemoryStore, total_seats: i32, price: i32) -> Uuid {
    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        name: "Midnight Orchestra".into(),
        description: Some("One night only".into()),
        venue: "Grand Hall".into(),
        event_date: now + chrono::Duration::days(30),
        total_seats,
        available_seats: total_seats,
        price,
        status: EventStatus::Available,
        created_at: now,
        updated_at: now,
    };
    let id = event.id;
    store.tables.lock().await.events.insert(id, event);
    id
}

fn details(quantity: i32) -> BookingDetails {
    BookingDetails {
        user_name: "Alex Kim".into(),
        email: "alex@example.com".into(),
        phone: "010-1234-5678".into(),
        quantity,
    }
}

#[tokio::test]
async fn booking_scenario_walkthrough() {
    let h = harness(BookingPolicy::default());
    let event_id = seed_event(&h.store, 10, 100).await;

    let first = h.controller.book(event_id, details(4)).await.unwrap();
    assert_eq!(first.total_price, 400);
    let event = h.controller.event(event_id).await.unwrap();
    assert_eq!(event.available_seats, 6);
    assert_eq!(event.status, EventStatus::Available);

    h.controller.book(event_id, details(6)).await.unwrap();
    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 0);
    assert_eq!(event.status, EventStatus::SoldOut);

    let err = h.controller.book(event_id, details(1)).await.unwrap_err();
    assert!(err.to_string().contains("remaining: 0"));
    match err {
        TicketingError::InsufficientSeats { remaining } => assert_eq!(remaining, 0),
        other => panic!("unexpected error: {other}"),
    }

    h.controller
        .cancel(&first.reservation_code)
        .await
        .unwrap();
    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 4);
    assert_eq!(event.status, EventStatus::Available);
}

#[tokio::test]
async fn booking_unknown_event_fails() {
    let h = harness(BookingPolicy::default());
    let missing = Uuid::new_v4();
    let err = h.controller.book(missing, details(2)).await.unwrap_err();
    assert!(matches!(err, TicketingError::EventNotFound(id) if id == missing));
}

#[tokio::test]
async fn failed_booking_leaves_seats_and_lock_untouched() {
    let h = harness(BookingPolicy::default());
    let event_id = seed_event(&h.store, 2, 100).await;

    let err = h.controller.book(event_id, details(3)).await.unwrap_err();
    assert!(matches!(
        err,
        TicketingError::InsufficientSeats { remaining: 2 }
    ));

    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 2);

    // lock was released on the failure path
    let token = h
        .lock
        .try_acquire(event_id, Duration::from_secs(10))
        .await
        .unwrap();
    assert!(token.is_some());
}

#[tokio::test]
async fn booking_invalidates_both_snapshots() {
    let h = harness(BookingPolicy::default());
    let event_id = seed_event(&h.store, 10, 100).await;

    // Warm both cache keys through the read path.
    let stale = h.controller.event(event_id).await.unwrap();
    assert_eq!(stale.available_seats, 10);
    let listed = h.controller.available_events().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(h.cache.event(event_id).await.unwrap().is_some());
    assert!(h.cache.available_events().await.unwrap().is_some());

    h.controller.book(event_id, details(4)).await.unwrap();

    assert!(h.cache.event(event_id).await.unwrap().is_none());
    assert!(h.cache.available_events().await.unwrap().is_none());

    // The next read repopulates from the store and sees the decrement.
    let fresh = h.controller.event(event_id).await.unwrap();
    assert_eq!(fresh.available_seats, 6);
    let fresh_list = h.controller.available_events().await.unwrap();
    assert_eq!(fresh_list[0].available_seats, 6);
}

#[tokio::test]
async fn cancellation_restores_seats_and_invalidates() {
    let h = harness(BookingPolicy::default());
    let event_id = seed_event(&h.store, 4, 250).await;

    let reservation = h.controller.book(event_id, details(4)).await.unwrap();
    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::SoldOut);

    // Warm the cache with the sold-out snapshot.
    h.controller.event(event_id).await.unwrap();

    let cancelled = h
        .controller
        .cancel(&reservation.reservation_code)
        .await
        .unwrap();
    assert_eq!(cancelled.quantity, 4);
    assert_eq!(cancelled.total_price, 1000);

    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 4);
    assert_eq!(event.status, EventStatus::Available);
    assert!(h.cache.event(event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn cancelling_unknown_code_fails() {
    let h = harness(BookingPolicy::default());
    let err = h.controller.cancel("RSV-19700101-NOPE0000").await.unwrap_err();
    assert!(matches!(err, TicketingError::ReservationNotFound(_)));
}

#[tokio::test]
async fn double_cancel_is_an_error_and_mutates_nothing() {
    let h = harness(BookingPolicy::default());
    let event_id = seed_event(&h.store, 10, 100).await;

    let reservation = h.controller.book(event_id, details(2)).await.unwrap();
    h.controller
        .cancel(&reservation.reservation_code)
        .await
        .unwrap();
    let restored = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(restored.available_seats, 10);

    let err = h
        .controller
        .cancel(&reservation.reservation_code)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::AlreadyCancelled));

    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 10);
    assert_eq!(event.status, EventStatus::Available);
}

#[tokio::test]
async fn contended_lock_surfaces_after_deadline() {
    let policy = BookingPolicy {
        lock_wait: Duration::from_millis(80),
        ..BookingPolicy::default()
    };
    let h = harness(policy);
    let event_id = seed_event(&h.store, 10, 100).await;

    // Another holder keeps the lock for the whole attempt.
    let holder = h
        .lock
        .try_acquire(event_id, Duration::from_secs(10))
        .await
        .unwrap()
        .unwrap();

    let err = h.controller.book(event_id, details(1)).await.unwrap_err();
    assert!(matches!(err, TicketingError::LockContention));
    assert!(err.is_retryable());

    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 10);

    h.lock.release(event_id, &holder).await.unwrap();
}

#[tokio::test]
async fn cancellation_takes_the_event_lock_too() {
    let policy = BookingPolicy {
        lock_wait: Duration::from_millis(80),
        ..BookingPolicy::default()
    };
    let h = harness(policy);
    let event_id = seed_event(&h.store, 10, 100).await;
    let reservation = h.controller.book(event_id, details(2)).await.unwrap();

    let holder = h
        .lock
        .try_acquire(event_id, Duration::from_secs(10))
        .await
        .unwrap()
        .unwrap();

    let err = h
        .controller
        .cancel(&reservation.reservation_code)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::LockContention));

    h.lock.release(event_id, &holder).await.unwrap();
}

#[tokio::test]
async fn stale_token_cannot_release_a_newer_lock() {
    let h = harness(BookingPolicy::default());
    let event_id = Uuid::new_v4();

    let first = h
        .lock
        .try_acquire(event_id, Duration::from_secs(10))
        .await
        .unwrap()
        .unwrap();
    h.lock.release(event_id, &first).await.unwrap();

    let second = h
        .lock
        .try_acquire(event_id, Duration::from_secs(10))
        .await
        .unwrap()
        .unwrap();

    // Releasing with the stale first token must not free the second hold.
    h.lock.release(event_id, &first).await.unwrap();
    assert!(h
        .lock
        .try_acquire(event_id, Duration::from_secs(10))
        .await
        .unwrap()
        .is_none());

    h.lock.release(event_id, &second).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_bookings_never_oversell() {
    let policy = BookingPolicy {
        lock_wait: Duration::from_secs(10),
        ..BookingPolicy::default()
    };
    let h = harness(policy);
    let event_id = seed_event(&h.store, 5, 100).await;

    let mut handles = Vec::new();
    for _ in 0..40 {
        let controller = h.controller.clone();
        handles.push(tokio::spawn(async move {
            controller.book(event_id, details(1)).await
        }));
    }

    let mut confirmed = Vec::new();
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(reservation) => confirmed.push(reservation),
            Err(TicketingError::InsufficientSeats { .. }) => rejections += 1,
            Err(other) => panic!("unexpected error under contention: {other}"),
        }
    }

    assert_eq!(confirmed.len(), 5);
    assert_eq!(rejections, 35);

    let event = h.store.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.available_seats, 0);
    assert_eq!(event.status, EventStatus::SoldOut);

    let codes: HashSet<&str> = confirmed
        .iter()
        .map(|r| r.reservation_code.as_str())
        .collect();
    assert_eq!(codes.len(), confirmed.len());

    let total_booked: i32 = confirmed.iter().map(|r| r.quantity).sum();
    assert!(total_booked <= event.total_seats);
}
