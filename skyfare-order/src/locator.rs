use skyfare_core::{BookingError, BookingResult, LedgerTransaction, LocatorSource, PnrConfig, Pnr};
use std::sync::Arc;
use tracing::{debug, warn};

/// Generates locators that are unique within the ledger.
///
/// Tries `primary_attempts` codes of `primary_length`, then `fallback_attempts` of
/// `fallback_length`. Both budgets are finite, so generation always terminates.
pub struct PnrGenerator {
    source: Arc<dyn LocatorSource>,
    config: PnrConfig,
}

impl PnrGenerator {
    pub fn new(source: Arc<dyn LocatorSource>, config: PnrConfig) -> Self {
        Self { source, config }
    }

    pub async fn generate(&self, tx: &mut dyn LedgerTransaction) -> BookingResult<Pnr> {
        let rounds = [
            (self.config.primary_length, self.config.primary_attempts),
            (self.config.fallback_length, self.config.fallback_attempts),
        ];

        for (length, attempts) in rounds {
            for attempt in 1..=attempts {
                let pnr = Pnr::new(self.source.next_code(length));
                if pnr.is_empty() {
                    continue;
                }
                if !tx.pnr_exists(&pnr).await? {
                    return Ok(pnr);
                }
                debug!("PNR collision on {} (length {}, attempt {})", pnr, length, attempt);
            }
            warn!("Exhausted {} PNR attempts at length {}", attempts, length);
        }

        Err(BookingError::IntegrityViolation(
            "unable to generate a unique PNR".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use skyfare_core::locator::ScriptedLocatorSource;
    use skyfare_core::{Booking, DemandLevel, Flight, FlightId, LedgerResult, SeatLabel, StatusChange};
    use std::collections::{BTreeSet, HashSet};

    /// Transaction stub that only knows which locators exist.
    struct TakenPnrs(HashSet<String>);

    #[async_trait]
    impl LedgerTransaction for TakenPnrs {
        async fn get_flight_for_update(&mut self, _id: FlightId) -> LedgerResult<Option<Flight>> {
            Ok(None)
        }
        async fn set_available_seats(&mut self, _id: FlightId, _available: u32) -> LedgerResult<()> {
            Ok(())
        }
        async fn set_current_price(&mut self, _id: FlightId, _price: Decimal) -> LedgerResult<()> {
            Ok(())
        }
        async fn set_demand_level(&mut self, _id: FlightId, _level: DemandLevel) -> LedgerResult<()> {
            Ok(())
        }
        async fn list_active_seat_labels(&mut self, _id: FlightId) -> LedgerResult<BTreeSet<SeatLabel>> {
            Ok(BTreeSet::new())
        }
        async fn insert_booking(&mut self, _booking: &Booking) -> LedgerResult<()> {
            Ok(())
        }
        async fn update_booking_status(&mut self, _pnr: &Pnr, _change: StatusChange) -> LedgerResult<()> {
            Ok(())
        }
        async fn find_booking_by_pnr(&mut self, _pnr: &Pnr) -> LedgerResult<Option<Booking>> {
            Ok(None)
        }
        async fn pnr_exists(&mut self, pnr: &Pnr) -> LedgerResult<bool> {
            Ok(self.0.contains(pnr.as_str()))
        }
        async fn commit(&mut self) -> LedgerResult<()> {
            Ok(())
        }
        async fn rollback(&mut self) -> LedgerResult<()> {
            Ok(())
        }
    }

    fn config() -> PnrConfig {
        PnrConfig {
            primary_length: 6,
            primary_attempts: 3,
            fallback_length: 10,
            fallback_attempts: 2,
        }
    }

    #[tokio::test]
    async fn test_retries_on_collision() {
        let source = Arc::new(ScriptedLocatorSource::new(["TAKEN1", "FRESH1"]));
        let generator = PnrGenerator::new(source, config());
        let mut tx = TakenPnrs(["TAKEN1".to_string()].into_iter().collect());

        let pnr = generator.generate(&mut tx).await.unwrap();
        assert_eq!(pnr.as_str(), "FRESH1");
    }

    #[tokio::test]
    async fn test_falls_back_to_longer_codes() {
        let source = Arc::new(ScriptedLocatorSource::new(["AAAAAA", "AAAAAA", "AAAAAA"]));
        let generator = PnrGenerator::new(source, config());
        let mut tx = TakenPnrs(["AAAAAA".to_string()].into_iter().collect());

        let pnr = generator.generate(&mut tx).await.unwrap();
        assert_eq!(pnr.as_str().len(), 10);
    }

    #[tokio::test]
    async fn test_exhaustion_is_integrity_violation() {
        let source = Arc::new(ScriptedLocatorSource::new([
            "AAAAAA", "AAAAAA", "AAAAAA", "BBBBBBBBBB", "BBBBBBBBBB",
        ]));
        let generator = PnrGenerator::new(source, config());
        let mut tx = TakenPnrs(
            ["AAAAAA".to_string(), "BBBBBBBBBB".to_string()]
                .into_iter()
                .collect(),
        );

        let err = generator.generate(&mut tx).await.unwrap_err();
        assert!(matches!(err, BookingError::IntegrityViolation(_)));
    }
}
