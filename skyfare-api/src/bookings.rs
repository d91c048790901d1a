use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use skyfare_core::{Booking, Pnr};
use skyfare_order::{BookingConfirmation, BookingRequest, CancellationResult};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{pnr}", get(get_booking))
        .route("/v1/bookings/{pnr}/cancel", post(cancel_booking))
}

fn parse_pnr(raw: &str) -> Result<Pnr, AppError> {
    let pnr = Pnr::new(raw);
    if pnr.is_empty() || !pnr.as_str().chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest(format!("malformed PNR {:?}", raw)));
    }
    Ok(pnr)
}

/// POST /v1/bookings
/// Locks the flight, charges the current price and confirms a seat
pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), AppError> {
    info!("Booking requested on flight {} by {:?}", req.flight_id, req.passenger);
    let confirmation = state.manager.create_booking(req).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// GET /v1/bookings/{pnr}
pub async fn get_booking(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let pnr = parse_pnr(&pnr)?;
    Ok(Json(state.manager.get_booking(&pnr).await?))
}

/// POST /v1/bookings/{pnr}/cancel
/// Releases the seat; the refund is left pending
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<Json<CancellationResult>, AppError> {
    let pnr = parse_pnr(&pnr)?;
    Ok(Json(state.manager.cancel_booking(&pnr).await?))
}
