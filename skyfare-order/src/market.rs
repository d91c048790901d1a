use crate::manager::BookingManager;
use serde::Serialize;
use skyfare_catalog::DemandSampler;
use skyfare_core::{BookingError, BookingResult, DemandLevel, FlightFilter, FlightId, FlightSort};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketReport {
    pub examined: usize,
    pub demand_shifts: usize,
    pub repriced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Periodic demand re-sampling and repricing of upcoming flights.
pub struct MarketUpdater {
    manager: Arc<BookingManager>,
    sampler: DemandSampler,
}

impl MarketUpdater {
    pub fn new(manager: Arc<BookingManager>, sampler: DemandSampler) -> Self {
        Self { manager, sampler }
    }

    /// One pass over every flight that has not departed yet.
    pub async fn run_once(&self) -> BookingResult<MarketReport> {
        let now = self.manager.clock().now();
        let filter = FlightFilter {
            departing_after: Some(now),
            sort: FlightSort::Departure,
            ..Default::default()
        };
        let flights = self.manager.search_flights(&filter).await?;

        // Draw every shift up front; the thread-local RNG cannot live across an await.
        let plan: Vec<(FlightId, DemandLevel, Option<DemandLevel>)> = {
            let mut rng = rand::thread_rng();
            flights
                .iter()
                .map(|f| (f.id, f.demand_level, self.sampler.maybe_shift(&mut rng)))
                .collect()
        };

        let mut report = MarketReport {
            examined: plan.len(),
            ..Default::default()
        };

        for (flight_id, previous, shift) in plan {
            let before = self.manager.get_price_quote(flight_id).await.ok();
            match self.manager.apply_market_update(flight_id, shift).await {
                Ok(flight) => {
                    if flight.demand_level != previous {
                        report.demand_shifts += 1;
                    }
                    if before != Some(flight.current_price) {
                        report.repriced += 1;
                    }
                }
                Err(BookingError::FlightDeparted(_)) | Err(BookingError::Busy(_)) => {
                    debug!("Skipping market update for flight {}", flight_id);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Market update failed for flight {}: {}", flight_id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Market update: {} flights, {} demand shifts, {} repriced, {} skipped, {} failed",
            report.examined, report.demand_shifts, report.repriced, report.skipped, report.failed
        );
        Ok(report)
    }
}
