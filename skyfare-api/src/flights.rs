use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skyfare_catalog::{PriceQuote, SeatStatus};
use skyfare_core::{Flight, FlightFilter, FlightId, FlightSort, NewFlight};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub sort: Option<FlightSort>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceResponse {
    pub flight_id: FlightId,
    pub current_price: Decimal,
    pub quote: PriceQuote,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatMapResponse {
    pub flight_id: FlightId,
    pub total_seats: u32,
    pub available_seats: u32,
    pub seats: Vec<SeatStatus>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", get(search_flights).post(create_flight))
        .route("/v1/flights/{id}", get(get_flight))
        .route("/v1/flights/{id}/price", get(get_price))
        .route("/v1/flights/{id}/seats", get(get_seat_map))
        .route("/v1/flights/{id}/reprice", post(reprice_flight))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/flights?origin=&destination=&date=&sort=
/// Upcoming flights only
pub async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Flight>>, AppError> {
    let filter = FlightFilter {
        origin: params.origin,
        destination: params.destination,
        date: params.date,
        departing_after: Some(state.manager.clock().now()),
        sort: params.sort.unwrap_or_default(),
    };
    let flights = state.manager.search_flights(&filter).await?;
    Ok(Json(flights))
}

/// POST /v1/flights
/// Schedule load; the stored flight is priced at registration time
pub async fn create_flight(
    State(state): State<AppState>,
    Json(new): Json<NewFlight>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    let flight = state.manager.register_flight(new).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

/// GET /v1/flights/{id}
pub async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<FlightId>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.manager.get_flight(flight_id).await?))
}

/// GET /v1/flights/{id}/price
/// Stored price plus the factors it would be recomputed from now
pub async fn get_price(
    State(state): State<AppState>,
    Path(flight_id): Path<FlightId>,
) -> Result<Json<PriceResponse>, AppError> {
    let current_price = state.manager.get_price_quote(flight_id).await?;
    let quote = state.manager.price_breakdown(flight_id).await?;
    Ok(Json(PriceResponse {
        flight_id,
        current_price,
        quote,
    }))
}

/// GET /v1/flights/{id}/seats
pub async fn get_seat_map(
    State(state): State<AppState>,
    Path(flight_id): Path<FlightId>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let flight = state.manager.get_flight(flight_id).await?;
    let seats = state.manager.seat_map(flight_id).await?;
    Ok(Json(SeatMapResponse {
        flight_id,
        total_seats: flight.total_seats,
        available_seats: flight.available_seats,
        seats,
    }))
}

/// POST /v1/flights/{id}/reprice
pub async fn reprice_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<FlightId>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.manager.recompute_price(flight_id).await?))
}
