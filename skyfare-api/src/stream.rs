use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use skyfare_core::FlightId;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/flights/{id}/stream", get(flight_events))
}

/// GET /v1/flights/{id}/stream
/// Server-sent booking, cancellation and reprice events for one flight
pub async fn flight_events(
    State(state): State<AppState>,
    Path(flight_id): Path<FlightId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.manager.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.flight_id() == flight_id => Event::default()
            .event(event.kind())
            .json_data(&event)
            .ok()
            .map(Ok),
        Ok(_) => None,
        Err(e) => {
            // Lagged receivers skip ahead
            debug!("Event stream for flight {} lagged: {}", flight_id, e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
