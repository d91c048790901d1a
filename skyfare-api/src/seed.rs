use skyfare_catalog::{ScheduleGenerator, SeedConfig};
use skyfare_order::BookingManager;
use tracing::{info, warn};

/// Fills an empty ledger with a generated schedule. Returns how many flights were stored.
pub async fn seed_schedule(manager: &BookingManager, config: &SeedConfig) -> usize {
    let today = manager.clock().now().date_naive();
    let flights = {
        let mut rng = rand::thread_rng();
        ScheduleGenerator::new(config.clone()).generate(&mut rng, today)
    };

    let planned = flights.len();
    let mut stored = 0;
    for new in flights {
        let number = new.flight_number.clone();
        match manager.register_flight(new).await {
            Ok(_) => stored += 1,
            Err(e) => warn!("Skipping seeded flight {}: {}", number, e),
        }
    }

    info!("Seeded {} of {} flights over {} days", stored, planned, config.days_ahead);
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skyfare_catalog::PricingEngine;
    use skyfare_core::{BookingRules, FixedClock, FlightFilter, ScriptedPaymentOracle};
    use skyfare_store::MemoryLedger;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_schedule_registers_flights() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()));
        let manager = BookingManager::new(
            Arc::new(MemoryLedger::new()),
            Arc::new(PricingEngine::default()),
            Arc::new(ScriptedPaymentOracle::approving()),
            BookingRules::default(),
        )
        .with_clock(clock);
        let config = SeedConfig {
            enabled: true,
            days_ahead: 2,
            routes_per_day: 3,
            flights_per_route: 2,
        };

        let stored = seed_schedule(&manager, &config).await;
        assert!(stored > 0);

        let all = manager.search_flights(&FlightFilter::default()).await.unwrap();
        assert_eq!(all.len(), stored);
        assert!(all.iter().all(|f| f.available_seats == f.total_seats));
    }
}
