use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use boxoffice_core::TicketingError;

use crate::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Ticketing(TicketingError),
    Internal(anyhow::Error),
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        Self::Ticketing(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Ticketing(err) => match &err {
                TicketingError::EventNotFound(_) | TicketingError::ReservationNotFound(_) => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                // Contention is the retryable member of this class; the
                // other two need a changed request.
                TicketingError::LockContention
                | TicketingError::InsufficientSeats { .. }
                | TicketingError::AlreadyCancelled => (StatusCode::CONFLICT, err.to_string()),
                TicketingError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                TicketingError::Store(_) | TicketingError::Lock(_) => {
                    tracing::error!("Internal Server Error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            },
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}
