use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use boxoffice_core::{
    BoxError, Event, EventStatus, Reservation, ReservationStatus, TicketStore,
};

pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    venue: String,
    event_date: chrono::DateTime<chrono::Utc>,
    total_seats: i32,
    available_seats: i32,
    price: i32,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = BoxError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = EventStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown event status in store: {}", row.status))?;
        Ok(Event {
            id: row.id,
            name: row.name,
            description: row.description,
            venue: row.venue,
            event_date: row.event_date,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            price: row.price,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    event_id: Uuid,
    user_name: String,
    email: String,
    phone: String,
    quantity: i32,
    total_price: i32,
    status: String,
    reservation_code: String,
    created_at: chrono::DateTime<chrono::Utc>,
    confirmed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = BoxError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let status = ReservationStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown reservation status in store: {}", row.status))?;
        Ok(Reservation {
            id: row.id,
            event_id: row.event_id,
            user_name: row.user_name,
            email: row.email,
            phone: row.phone,
            quantity: row.quantity,
            total_price: row.total_price,
            status,
            reservation_code: row.reservation_code,
            created_at: row.created_at,
            confirmed_at: row.confirmed_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, name, description, venue, event_date, total_seats, \
     available_seats, price, status, created_at, updated_at";

const RESERVATION_COLUMNS: &str = "id, event_id, user_name, email, phone, quantity, \
     total_price, status, reservation_code, created_at, confirmed_at";

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, BoxError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    async fn list_events(&self) -> Result<Vec<Event>, BoxError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events ORDER BY event_date",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn list_available_events(&self) -> Result<Vec<Event>, BoxError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events \
             WHERE status = 'AVAILABLE' AND available_seats > 0 \
             ORDER BY event_date",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn fetch_reservation(&self, code: &str) -> Result<Option<Reservation>, BoxError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE reservation_code = $1",
            RESERVATION_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Reservation::try_from).transpose()
    }

    async fn commit_booking(
        &self,
        event: &Event,
        reservation: &Reservation,
    ) -> Result<(), BoxError> {
        // The seat decrement and the reservation insert share one
        // transaction; a crash between them cannot strand inventory.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE events SET available_seats = $2, status = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(event.available_seats)
        .bind(event.status.as_str())
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO reservations \
             (id, event_id, user_name, email, phone, quantity, total_price, \
              status, reservation_code, created_at, confirmed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(reservation.id)
        .bind(reservation.event_id)
        .bind(&reservation.user_name)
        .bind(&reservation.email)
        .bind(&reservation.phone)
        .bind(reservation.quantity)
        .bind(reservation.total_price)
        .bind(reservation.status.as_str())
        .bind(&reservation.reservation_code)
        .bind(reservation.created_at)
        .bind(reservation.confirmed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_cancellation(
        &self,
        event: &Event,
        reservation: &Reservation,
    ) -> Result<(), BoxError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE events SET available_seats = $2, status = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(event.available_seats)
        .bind(event.status.as_str())
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(reservation.id)
            .bind(reservation.status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
