use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use boxoffice_booking::lifecycle::{MAX_QUANTITY_PER_BOOKING, MIN_QUANTITY_PER_BOOKING};
use boxoffice_core::{BookingDetails, Reservation};
use boxoffice_store::events::{TOPIC_RESERVATION_CANCELLED, TOPIC_RESERVATION_CONFIRMED};

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email pattern"));
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2,3}-\d{3,4}-\d{4}$").expect("invalid phone pattern"));

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub event_id: Uuid,
    pub user_name: String,
    pub email: String,
    pub phone: String,
    pub quantity: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/reservations", post(create_reservation))
        .route(
            "/api/v1/reservations/{code}",
            get(get_reservation).delete(cancel_reservation),
        )
}

fn validate(req: &CreateReservationRequest) -> Result<(), AppError> {
    let name_len = req.user_name.trim().chars().count();
    if !(2..=50).contains(&name_len) {
        return Err(AppError::Validation(
            "user_name must be between 2 and 50 characters".into(),
        ));
    }
    if !EMAIL_PATTERN.is_match(&req.email) {
        return Err(AppError::Validation(
            "email is not a valid address".into(),
        ));
    }
    if !PHONE_PATTERN.is_match(&req.phone) {
        return Err(AppError::Validation(
            "phone must match the pattern 010-1234-5678".into(),
        ));
    }
    if !(MIN_QUANTITY_PER_BOOKING..=MAX_QUANTITY_PER_BOOKING).contains(&req.quantity) {
        return Err(AppError::Validation(format!(
            "quantity must be between {} and {} tickets",
            MIN_QUANTITY_PER_BOOKING, MAX_QUANTITY_PER_BOOKING
        )));
    }
    Ok(())
}

async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Reservation>>), AppError> {
    info!("POST /api/v1/reservations: event {}", req.event_id);
    validate(&req)?;

    let details = BookingDetails {
        user_name: req.user_name.trim().to_string(),
        email: req.email,
        phone: req.phone,
        quantity: req.quantity,
    };
    let reservation = state.controller.book(req.event_id, details).await?;

    if let Ok(payload) = serde_json::to_string(&reservation) {
        let _ = state
            .kafka
            .publish(
                TOPIC_RESERVATION_CONFIRMED,
                &reservation.reservation_code,
                &payload,
            )
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Reservation confirmed", reservation)),
    ))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Reservation>>, AppError> {
    info!("GET /api/v1/reservations/{}", code);
    let reservation = state.controller.reservation(&code).await?;
    Ok(Json(ApiResponse::success("Fetched reservation", reservation)))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    info!("DELETE /api/v1/reservations/{}", code);
    let cancelled = state.controller.cancel(&code).await?;

    if let Ok(payload) = serde_json::to_string(&cancelled) {
        let _ = state
            .kafka
            .publish(
                TOPIC_RESERVATION_CANCELLED,
                &cancelled.reservation_code,
                &payload,
            )
            .await;
    }

    Ok(Json(ApiResponse::message("Reservation cancelled")))
}
