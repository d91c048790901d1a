use async_trait::async_trait;
use rust_decimal::Decimal;
use skyfare_core::{
    Booking, DemandLevel, Flight, FlightFilter, FlightId, InventoryLedger, LedgerError, LedgerResult,
    LedgerTransaction, Pnr, SeatLabel, StatusChange,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct LedgerState {
    flights: HashMap<FlightId, Flight>,
    bookings: HashMap<Pnr, Booking>,
    by_flight: HashMap<FlightId, Vec<Pnr>>,
}

impl LedgerState {
    fn bookings_for(&self, flight_id: FlightId) -> impl Iterator<Item = &Booking> {
        self.by_flight
            .get(&flight_id)
            .into_iter()
            .flatten()
            .filter_map(|pnr| self.bookings.get(pnr))
    }
}

/// Process-local ledger with transactional write sets.
///
/// Writes are staged per transaction and applied under the state's write lock on
/// commit, where PNR uniqueness, one active booking per seat and seat-count bounds
/// are checked again. Row locking is left to the caller's per-flight lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryLedger for MemoryLedger {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTransaction>> {
        Ok(Box::new(MemoryTransaction::new(self.state.clone())))
    }

    async fn insert_flight(&self, flight: &Flight) -> LedgerResult<()> {
        if flight.available_seats > flight.total_seats {
            return Err(LedgerError::SeatCountOutOfRange(flight.id));
        }
        let mut state = self.state.write().await;
        if state.flights.contains_key(&flight.id) {
            return Err(LedgerError::DuplicateFlight(flight.id));
        }
        state.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn get_flight(&self, id: FlightId) -> LedgerResult<Option<Flight>> {
        Ok(self.state.read().await.flights.get(&id).cloned())
    }

    async fn search_flights(&self, filter: &FlightFilter) -> LedgerResult<Vec<Flight>> {
        let mut flights: Vec<Flight> = {
            let state = self.state.read().await;
            state
                .flights
                .values()
                .filter(|f| filter.matches(f))
                .cloned()
                .collect()
        };
        filter.order(&mut flights);
        Ok(flights)
    }

    async fn find_booking_by_pnr(&self, pnr: &Pnr) -> LedgerResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(pnr).cloned())
    }

    async fn list_bookings_for_flight(&self, id: FlightId) -> LedgerResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state.bookings_for(id).cloned().collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.pnr.cmp(&b.pnr)));
        Ok(bookings)
    }
}

pub struct MemoryTransaction {
    state: Arc<RwLock<LedgerState>>,
    flights: HashMap<FlightId, Flight>,
    new_bookings: Vec<Booking>,
    status_changes: HashMap<Pnr, StatusChange>,
    finished: bool,
}

impl MemoryTransaction {
    fn new(state: Arc<RwLock<LedgerState>>) -> Self {
        Self {
            state,
            flights: HashMap::new(),
            new_bookings: Vec::new(),
            status_changes: HashMap::new(),
            finished: false,
        }
    }

    fn ensure_open(&self) -> LedgerResult<()> {
        if self.finished {
            return Err(LedgerError::TransactionClosed);
        }
        Ok(())
    }

    /// The flight as this transaction sees it, staged for writing.
    async fn staged_flight(&mut self, id: FlightId) -> LedgerResult<&mut Flight> {
        if !self.flights.contains_key(&id) {
            let flight = self
                .state
                .read()
                .await
                .flights
                .get(&id)
                .cloned()
                .ok_or(LedgerError::FlightNotFound(id))?;
            self.flights.insert(id, flight);
        }
        self.flights.get_mut(&id).ok_or(LedgerError::FlightNotFound(id))
    }

    fn view_booking(&self, state: &LedgerState, pnr: &Pnr) -> Option<Booking> {
        if let Some(staged) = self.new_bookings.iter().find(|b| &b.pnr == pnr) {
            return Some(staged.clone());
        }
        let mut booking = state.bookings.get(pnr).cloned()?;
        if let Some(change) = self.status_changes.get(pnr) {
            apply_change(&mut booking, change);
        }
        Some(booking)
    }

    fn active_labels(&self, state: &LedgerState, flight_id: FlightId) -> BTreeSet<SeatLabel> {
        let committed = state.bookings_for(flight_id).filter_map(|b| {
            let status = self
                .status_changes
                .get(&b.pnr)
                .map(|c| c.status)
                .unwrap_or(b.status);
            (status == skyfare_core::BookingStatus::Confirmed).then_some(b.seat_label)
        });
        let staged = self
            .new_bookings
            .iter()
            .filter(|b| b.flight_id == flight_id && b.is_active())
            .map(|b| b.seat_label);
        committed.chain(staged).collect()
    }
}

fn apply_change(booking: &mut Booking, change: &StatusChange) {
    booking.status = change.status;
    booking.payment_status = change.payment_status;
    booking.cancelled_at = change.cancelled_at;
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn get_flight_for_update(&mut self, id: FlightId) -> LedgerResult<Option<Flight>> {
        self.ensure_open()?;
        match self.staged_flight(id).await {
            Ok(flight) => Ok(Some(flight.clone())),
            Err(LedgerError::FlightNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_available_seats(&mut self, id: FlightId, available: u32) -> LedgerResult<()> {
        self.ensure_open()?;
        let flight = self.staged_flight(id).await?;
        if available > flight.total_seats {
            return Err(LedgerError::SeatCountOutOfRange(id));
        }
        flight.available_seats = available;
        Ok(())
    }

    async fn set_current_price(&mut self, id: FlightId, price: Decimal) -> LedgerResult<()> {
        self.ensure_open()?;
        self.staged_flight(id).await?.current_price = price;
        Ok(())
    }

    async fn set_demand_level(&mut self, id: FlightId, level: DemandLevel) -> LedgerResult<()> {
        self.ensure_open()?;
        self.staged_flight(id).await?.demand_level = level;
        Ok(())
    }

    async fn list_active_seat_labels(&mut self, id: FlightId) -> LedgerResult<BTreeSet<SeatLabel>> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(self.active_labels(&state, id))
    }

    async fn insert_booking(&mut self, booking: &Booking) -> LedgerResult<()> {
        self.ensure_open()?;
        {
            let state = self.state.read().await;
            if !state.flights.contains_key(&booking.flight_id) && !self.flights.contains_key(&booking.flight_id) {
                return Err(LedgerError::FlightNotFound(booking.flight_id));
            }
            if state.bookings.contains_key(&booking.pnr) || self.new_bookings.iter().any(|b| b.pnr == booking.pnr) {
                return Err(LedgerError::DuplicatePnr(booking.pnr.clone()));
            }
            if booking.is_active() && self.active_labels(&state, booking.flight_id).contains(&booking.seat_label) {
                return Err(LedgerError::SeatConflict(booking.flight_id, booking.seat_label));
            }
        }
        self.new_bookings.push(booking.clone());
        Ok(())
    }

    async fn update_booking_status(&mut self, pnr: &Pnr, change: StatusChange) -> LedgerResult<()> {
        self.ensure_open()?;
        if let Some(staged) = self.new_bookings.iter_mut().find(|b| &b.pnr == pnr) {
            apply_change(staged, &change);
            return Ok(());
        }
        if !self.state.read().await.bookings.contains_key(pnr) {
            return Err(LedgerError::BookingNotFound(pnr.clone()));
        }
        self.status_changes.insert(pnr.clone(), change);
        Ok(())
    }

    async fn find_booking_by_pnr(&mut self, pnr: &Pnr) -> LedgerResult<Option<Booking>> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(self.view_booking(&state, pnr))
    }

    async fn pnr_exists(&mut self, pnr: &Pnr) -> LedgerResult<bool> {
        self.ensure_open()?;
        if self.new_bookings.iter().any(|b| &b.pnr == pnr) {
            return Ok(true);
        }
        Ok(self.state.read().await.bookings.contains_key(pnr))
    }

    async fn commit(&mut self) -> LedgerResult<()> {
        self.ensure_open()?;
        self.finished = true;

        let mut state = self.state.write().await;

        // 1. Constraints against whatever committed since we staged
        for booking in &self.new_bookings {
            if state.bookings.contains_key(&booking.pnr) {
                return Err(LedgerError::DuplicatePnr(booking.pnr.clone()));
            }
        }
        let touched: BTreeSet<FlightId> = self.new_bookings.iter().map(|b| b.flight_id).collect();
        for flight_id in touched {
            let mut seen = BTreeSet::new();
            let committed = state.bookings_for(flight_id).filter(|b| {
                let status = self.status_changes.get(&b.pnr).map(|c| c.status).unwrap_or(b.status);
                status == skyfare_core::BookingStatus::Confirmed
            });
            let staged = self
                .new_bookings
                .iter()
                .filter(|b| b.flight_id == flight_id && b.is_active());
            for booking in committed.chain(staged) {
                if !seen.insert(booking.seat_label) {
                    return Err(LedgerError::SeatConflict(flight_id, booking.seat_label));
                }
            }
        }
        for flight in self.flights.values() {
            if flight.available_seats > flight.total_seats {
                return Err(LedgerError::SeatCountOutOfRange(flight.id));
            }
        }

        // 2. Apply
        for (id, flight) in self.flights.drain() {
            state.flights.insert(id, flight);
        }
        for (pnr, change) in self.status_changes.drain() {
            if let Some(booking) = state.bookings.get_mut(&pnr) {
                apply_change(booking, &change);
            }
        }
        for booking in self.new_bookings.drain(..) {
            state
                .by_flight
                .entry(booking.flight_id)
                .or_default()
                .push(booking.pnr.clone());
            state.bookings.insert(booking.pnr.clone(), booking);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> LedgerResult<()> {
        self.finished = true;
        self.flights.clear();
        self.new_bookings.clear();
        self.status_changes.clear();
        Ok(())
    }
}
