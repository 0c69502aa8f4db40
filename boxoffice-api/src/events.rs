use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use boxoffice_core::Event;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/events", get(list_events))
        .route("/api/v1/events/available", get(list_available_events))
        .route("/api/v1/events/{event_id}", get(get_event))
}

async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Event>>>, AppError> {
    info!("GET /api/v1/events");
    let events = state.controller.events().await?;
    Ok(Json(ApiResponse::success("Fetched all events", events)))
}

async fn list_available_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Event>>>, AppError> {
    info!("GET /api/v1/events/available");
    let events = state.controller.available_events().await?;
    Ok(Json(ApiResponse::success("Fetched available events", events)))
}

async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Event>>, AppError> {
    info!("GET /api/v1/events/{}", event_id);
    let event = state.controller.event(event_id).await?;
    Ok(Json(ApiResponse::success("Fetched event", event)))
}
