use crate::attempt::{AttemptState, BookingAttempt};
use crate::events::BookingEvent;
use crate::locator::PnrGenerator;
use crate::locks::{FlightGuard, FlightLockTable};
use crate::payment::PaymentOrchestrator;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skyfare_catalog::{AllocationError, PriceQuote, PricingEngine, PricingInput, SeatAllocator, SeatStatus};
use skyfare_core::{
    Booking, BookingError, BookingId, BookingResult, BookingRules, BookingStatus, ChargeRequest, Clock,
    DemandLevel, Flight, FlightFilter, FlightId, InventoryLedger, LedgerTransaction, LocatorSource,
    NewFlight, Passenger, PaymentOracle, PaymentStatus, Pnr, RandomLocatorSource, SeatLabel,
    StatusChange, SystemClock,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 1024;
const CURRENCY: &str = "INR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub flight_id: FlightId,
    pub passenger: Passenger,
    /// Requested seat label such as `12C`; the lowest free seat when absent.
    pub seat: Option<String>,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingConfirmation {
    pub booking_id: BookingId,
    pub pnr: Pnr,
    pub flight_id: FlightId,
    pub seat_label: SeatLabel,
    pub price_charged: Decimal,
    pub status: BookingStatus,
    pub transaction_id: String,
    pub available_seats: u32,
    pub current_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationResult {
    pub pnr: Pnr,
    pub flight_id: FlightId,
    pub seat_label: SeatLabel,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub refund_amount: Decimal,
    pub available_seats: u32,
    pub current_price: Decimal,
}

/// Books and cancels seats with per-flight serialisation.
///
/// Every mutation of a flight runs inside that flight's lock and a single ledger
/// transaction, so inventory, price and booking rows change together or not at all.
pub struct BookingManager {
    ledger: Arc<dyn InventoryLedger>,
    pricing: Arc<PricingEngine>,
    payments: PaymentOrchestrator,
    pnrs: PnrGenerator,
    clock: Arc<dyn Clock>,
    locks: FlightLockTable,
    allocator: SeatAllocator,
    rules: BookingRules,
    events: broadcast::Sender<BookingEvent>,
}

impl BookingManager {
    pub fn new(
        ledger: Arc<dyn InventoryLedger>,
        pricing: Arc<PricingEngine>,
        oracle: Arc<dyn PaymentOracle>,
        rules: BookingRules,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ledger,
            pricing,
            payments: PaymentOrchestrator::new(oracle, rules.payment_timeout()),
            pnrs: PnrGenerator::new(Arc::new(RandomLocatorSource), rules.pnr.clone()),
            clock: Arc::new(SystemClock),
            locks: FlightLockTable::new(),
            allocator: SeatAllocator,
            rules,
            events,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_locator_source(mut self, source: Arc<dyn LocatorSource>) -> Self {
        self.pnrs = PnrGenerator::new(source, self.rules.pnr.clone());
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn locks(&self) -> &FlightLockTable {
        &self.locks
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    /// Prices and stores a newly scheduled flight.
    pub async fn register_flight(&self, new: NewFlight) -> BookingResult<Flight> {
        if new.total_seats == 0 {
            return Err(BookingError::InvalidRequest("total_seats must be positive".to_string()));
        }
        if new.base_price <= Decimal::ZERO {
            return Err(BookingError::InvalidRequest("base_price must be positive".to_string()));
        }
        if new.arrival_time <= new.departure_time {
            return Err(BookingError::InvalidRequest(
                "arrival_time must be after departure_time".to_string(),
            ));
        }
        for code in [&new.origin, &new.destination] {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(BookingError::InvalidRequest(format!(
                    "{:?} is not a three-letter airport code",
                    code
                )));
            }
        }
        if new.flight_number.trim().is_empty() {
            return Err(BookingError::InvalidRequest("flight_number is required".to_string()));
        }
        if new.origin.eq_ignore_ascii_case(&new.destination) {
            return Err(BookingError::InvalidRequest(
                "origin and destination must differ".to_string(),
            ));
        }

        let mut flight = Flight {
            id: Uuid::new_v4(),
            flight_number: new.flight_number,
            airline: new.airline,
            origin: new.origin.to_ascii_uppercase(),
            destination: new.destination.to_ascii_uppercase(),
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            base_price: new.base_price,
            current_price: new.base_price,
            total_seats: new.total_seats,
            available_seats: new.total_seats,
            demand_level: new.demand_level,
        };
        flight.current_price = self.pricing.price_flight(&flight, self.clock.now());

        self.ledger.insert_flight(&flight).await?;
        debug!(
            "Registered flight {} {} {}->{} at {}",
            flight.id, flight.flight_number, flight.origin, flight.destination, flight.current_price
        );
        Ok(flight)
    }

    pub async fn create_booking(&self, request: BookingRequest) -> BookingResult<BookingConfirmation> {
        // 0. Request shape, before touching the flight
        request
            .passenger
            .validate()
            .map_err(BookingError::InvalidRequest)?;
        if request.payment_method.trim().is_empty() {
            return Err(BookingError::InvalidRequest("payment_method is required".to_string()));
        }
        let requested = request
            .seat
            .as_deref()
            .map(str::parse::<SeatLabel>)
            .transpose()
            .map_err(|e| BookingError::InvalidSeat(e.to_string()))?;

        let flight_id = request.flight_id;
        let mut attempt = BookingAttempt::new();

        // 1. Exclusive lock on the flight
        let _guard = self.lock_flight(flight_id).await?;
        attempt.lock_acquired()?;

        let mut tx = self.ledger.begin().await?;
        let result = self
            .book_locked(tx.as_mut(), &mut attempt, &request, requested)
            .await;

        match result {
            Ok((booking, flight)) => {
                info!(
                    "Booking {} confirmed on flight {} seat {} for {} ({} seats left, price now {})",
                    booking.pnr,
                    flight_id,
                    booking.seat_label,
                    booking.booking_price,
                    flight.available_seats,
                    flight.current_price
                );
                let _ = self.events.send(BookingEvent::Confirmed {
                    flight_id,
                    pnr: booking.pnr.clone(),
                    seat_label: booking.seat_label,
                    price_charged: booking.booking_price,
                    available_seats: flight.available_seats,
                    current_price: flight.current_price,
                    at: booking.created_at,
                });
                Ok(BookingConfirmation {
                    booking_id: booking.id,
                    pnr: booking.pnr,
                    flight_id,
                    seat_label: booking.seat_label,
                    price_charged: booking.booking_price,
                    status: booking.status,
                    transaction_id: booking.transaction_id,
                    available_seats: flight.available_seats,
                    current_price: flight.current_price,
                })
            }
            Err(err) => {
                if attempt.state() == AttemptState::PaymentCleared {
                    error!(
                        "Payment captured but booking on flight {} failed, refund required: {}",
                        flight_id, err
                    );
                }
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed on flight {}: {}", flight_id, rollback_err);
                }
                let _ = attempt.abort();
                debug!("Booking attempt on flight {} aborted: {}", flight_id, err);
                Err(err)
            }
        }
    }

    async fn book_locked(
        &self,
        tx: &mut dyn LedgerTransaction,
        attempt: &mut BookingAttempt,
        request: &BookingRequest,
        requested: Option<SeatLabel>,
    ) -> BookingResult<(Booking, Flight)> {
        let flight_id = request.flight_id;

        // 2. Validate
        let mut flight = tx
            .get_flight_for_update(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))?;
        if flight.available_seats == 0 {
            return Err(BookingError::NoSeatsAvailable(flight_id));
        }
        let now = self.clock.now();
        if flight.has_departed(now) {
            return Err(BookingError::FlightDeparted(flight_id));
        }
        let occupied = tx.list_active_seat_labels(flight_id).await?;
        check_consistency(&flight, &occupied)?;
        attempt.validated()?;

        // 3. Seat
        let seat = self
            .allocator
            .allocate(flight.total_seats, &occupied, requested)
            .map_err(|e| match e {
                AllocationError::SeatTaken(seat) => BookingError::SeatTaken(seat),
                AllocationError::OutOfLayout { .. } => BookingError::InvalidSeat(e.to_string()),
                AllocationError::NoSeatAvailable => BookingError::IntegrityViolation(format!(
                    "flight {} reports {} free seats but the layout is full",
                    flight_id, flight.available_seats
                )),
            })?;
        attempt.seat_allocated()?;

        // 4. Charge at the current price
        let price = flight.current_price;
        let transaction_id = self
            .payments
            .charge(&ChargeRequest {
                flight_id,
                amount: price,
                currency: CURRENCY.to_string(),
                payment_method: request.payment_method.clone(),
                description: format!("{} seat {}", flight.flight_number, seat),
            })
            .await?;
        attempt.payment_cleared()?;

        // 5. Locator
        let pnr = self.pnrs.generate(tx).await?;

        // 6. Record booking, inventory and price
        let booking = Booking {
            id: Uuid::new_v4(),
            pnr,
            flight_id,
            passenger: request.passenger.clone(),
            seat_label: seat,
            booking_price: price,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            transaction_id,
            payment_method: request.payment_method.clone(),
            created_at: now,
            cancelled_at: None,
        };
        tx.insert_booking(&booking).await?;

        let remaining = flight.available_seats - 1;
        let new_price = self
            .pricing
            .price(&PricingInput::from(&flight).with_available(remaining), now);
        tx.set_available_seats(flight_id, remaining).await?;
        tx.set_current_price(flight_id, new_price).await?;

        // 7. Commit
        tx.commit().await?;
        attempt.committed()?;

        flight.available_seats = remaining;
        flight.current_price = new_price;
        Ok((booking, flight))
    }

    pub async fn cancel_booking(&self, pnr: &Pnr) -> BookingResult<CancellationResult> {
        // 1. Find the flight without holding any lock
        let located = self
            .ledger
            .find_booking_by_pnr(pnr)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(pnr.clone()))?;
        let flight_id = located.flight_id;

        // 2. Lock it and re-read inside the transaction
        let _guard = self.lock_flight(flight_id).await?;
        let mut tx = self.ledger.begin().await?;

        match self.cancel_locked(tx.as_mut(), flight_id, pnr).await {
            Ok(result) => {
                info!(
                    "Booking {} cancelled on flight {}, seat {} released ({} seats left, price now {})",
                    pnr, flight_id, result.seat_label, result.available_seats, result.current_price
                );
                let _ = self.events.send(BookingEvent::Cancelled {
                    flight_id,
                    pnr: pnr.clone(),
                    seat_label: result.seat_label,
                    available_seats: result.available_seats,
                    current_price: result.current_price,
                    at: self.clock.now(),
                });
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed on flight {}: {}", flight_id, rollback_err);
                }
                debug!("Cancellation of {} aborted: {}", pnr, err);
                Err(err)
            }
        }
    }

    async fn cancel_locked(
        &self,
        tx: &mut dyn LedgerTransaction,
        flight_id: FlightId,
        pnr: &Pnr,
    ) -> BookingResult<CancellationResult> {
        let flight = tx
            .get_flight_for_update(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))?;
        let booking = tx
            .find_booking_by_pnr(pnr)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(pnr.clone()))?;

        if !booking.is_active() {
            return Err(BookingError::AlreadyCancelled(pnr.clone()));
        }
        let now = self.clock.now();
        if flight.has_departed(now) {
            return Err(BookingError::FlightDeparted(flight_id));
        }
        if flight.available_seats >= flight.total_seats {
            return Err(BookingError::IntegrityViolation(format!(
                "flight {} has an active booking but no seats sold",
                flight_id
            )));
        }

        let change = StatusChange::cancelled(now);
        let payment_status = change.payment_status;
        tx.update_booking_status(pnr, change).await?;

        let available = flight.available_seats + 1;
        tx.set_available_seats(flight_id, available).await?;

        let current_price = if self.rules.reprice_on_cancel {
            let price = self
                .pricing
                .price(&PricingInput::from(&flight).with_available(available), now);
            tx.set_current_price(flight_id, price).await?;
            price
        } else {
            flight.current_price
        };

        tx.commit().await?;

        Ok(CancellationResult {
            pnr: pnr.clone(),
            flight_id,
            seat_label: booking.seat_label,
            status: BookingStatus::Cancelled,
            payment_status,
            refund_amount: booking.booking_price,
            available_seats: available,
            current_price,
        })
    }

    /// Current stored price, read without locking.
    pub async fn get_price_quote(&self, flight_id: FlightId) -> BookingResult<Decimal> {
        Ok(self.get_flight(flight_id).await?.current_price)
    }

    /// Factor breakdown of what the flight would be priced at right now.
    pub async fn price_breakdown(&self, flight_id: FlightId) -> BookingResult<PriceQuote> {
        let flight = self.get_flight(flight_id).await?;
        Ok(self
            .pricing
            .quote(&PricingInput::from(&flight), self.clock.now()))
    }

    /// Recomputes and stores the price of a flight under its lock.
    pub async fn recompute_price(&self, flight_id: FlightId) -> BookingResult<Flight> {
        self.apply_market_update(flight_id, None).await
    }

    /// Optionally moves the flight to a new demand level, then reprices it.
    pub async fn apply_market_update(
        &self,
        flight_id: FlightId,
        demand: Option<DemandLevel>,
    ) -> BookingResult<Flight> {
        let _guard = self.lock_flight(flight_id).await?;
        let mut tx = self.ledger.begin().await?;

        match self.reprice_locked(tx.as_mut(), flight_id, demand).await {
            Ok((flight, changed)) => {
                if changed {
                    debug!(
                        "Flight {} repriced to {} (demand {})",
                        flight_id, flight.current_price, flight.demand_level
                    );
                    let _ = self.events.send(BookingEvent::Repriced {
                        flight_id,
                        demand_level: flight.demand_level,
                        available_seats: flight.available_seats,
                        current_price: flight.current_price,
                        at: self.clock.now(),
                    });
                }
                Ok(flight)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed on flight {}: {}", flight_id, rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn reprice_locked(
        &self,
        tx: &mut dyn LedgerTransaction,
        flight_id: FlightId,
        demand: Option<DemandLevel>,
    ) -> BookingResult<(Flight, bool)> {
        let mut flight = tx
            .get_flight_for_update(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))?;
        let now = self.clock.now();
        if flight.has_departed(now) {
            return Err(BookingError::FlightDeparted(flight_id));
        }

        let mut changed = false;
        if let Some(level) = demand {
            if level != flight.demand_level {
                tx.set_demand_level(flight_id, level).await?;
                flight.demand_level = level;
                changed = true;
            }
        }

        let price = self.pricing.price_flight(&flight, now);
        if price != flight.current_price {
            tx.set_current_price(flight_id, price).await?;
            flight.current_price = price;
            changed = true;
        }

        tx.commit().await?;
        Ok((flight, changed))
    }

    pub async fn get_flight(&self, flight_id: FlightId) -> BookingResult<Flight> {
        self.ledger
            .get_flight(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))
    }

    pub async fn get_booking(&self, pnr: &Pnr) -> BookingResult<Booking> {
        self.ledger
            .find_booking_by_pnr(pnr)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(pnr.clone()))
    }

    pub async fn search_flights(&self, filter: &FlightFilter) -> BookingResult<Vec<Flight>> {
        Ok(self.ledger.search_flights(filter).await?)
    }

    /// Seat occupancy for a flight, read without locking.
    pub async fn seat_map(&self, flight_id: FlightId) -> BookingResult<Vec<SeatStatus>> {
        let flight = self.get_flight(flight_id).await?;
        let occupied = self.active_seats(flight_id).await?;
        Ok(self.allocator.seat_map(flight.total_seats, &occupied))
    }

    /// Checks that the flight's seat count agrees with its active bookings.
    pub async fn verify_inventory(&self, flight_id: FlightId) -> BookingResult<()> {
        let flight = self.get_flight(flight_id).await?;
        let bookings = self.ledger.list_bookings_for_flight(flight_id).await?;
        let active: Vec<&Booking> = bookings.iter().filter(|b| b.is_active()).collect();
        let distinct: BTreeSet<SeatLabel> = active.iter().map(|b| b.seat_label).collect();

        if distinct.len() != active.len() {
            return Err(BookingError::IntegrityViolation(format!(
                "flight {} has {} active bookings on {} distinct seats",
                flight_id,
                active.len(),
                distinct.len()
            )));
        }
        check_consistency(&flight, &distinct)
    }

    async fn active_seats(&self, flight_id: FlightId) -> BookingResult<BTreeSet<SeatLabel>> {
        Ok(self
            .ledger
            .list_bookings_for_flight(flight_id)
            .await?
            .into_iter()
            .filter(Booking::is_active)
            .map(|b| b.seat_label)
            .collect())
    }

    async fn lock_flight(&self, flight_id: FlightId) -> BookingResult<FlightGuard> {
        self.locks
            .acquire(flight_id, self.rules.lock_timeout())
            .await
            .ok_or_else(|| {
                warn!("Timed out waiting for lock on flight {}", flight_id);
                BookingError::Busy(flight_id)
            })
    }
}

fn check_consistency(flight: &Flight, occupied: &BTreeSet<SeatLabel>) -> BookingResult<()> {
    if flight.available_seats > flight.total_seats {
        return Err(BookingError::IntegrityViolation(format!(
            "flight {} has {} available of {} seats",
            flight.id, flight.available_seats, flight.total_seats
        )));
    }
    if occupied.len() as u32 != flight.seats_sold() {
        return Err(BookingError::IntegrityViolation(format!(
            "flight {} has {} active bookings but {} seats sold",
            flight.id,
            occupied.len(),
            flight.seats_sold()
        )));
    }
    Ok(())
}

