use crate::booking::{Booking, BookingStatus, PaymentStatus, Pnr};
use crate::flight::{DemandLevel, Flight, FlightFilter, FlightId};
use crate::seat::SeatLabel;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Timed out waiting for row lock on flight {0}")]
    LockTimeout(FlightId),

    #[error("Seat {1} on flight {0} is held by another active booking")]
    SeatConflict(FlightId, SeatLabel),

    #[error("Available seats out of range on flight {0}")]
    SeatCountOutOfRange(FlightId),

    #[error("Duplicate PNR: {0}")]
    DuplicatePnr(Pnr),

    #[error("Duplicate flight: {0}")]
    DuplicateFlight(FlightId),

    #[error("Flight not found: {0}")]
    FlightNotFound(FlightId),

    #[error("Booking not found: {0}")]
    BookingNotFound(Pnr),

    #[error("Transaction already finished")]
    TransactionClosed,

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// New status for an existing booking row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn cancelled(at: DateTime<Utc>) -> Self {
        Self {
            status: BookingStatus::Cancelled,
            payment_status: PaymentStatus::RefundPending,
            cancelled_at: Some(at),
        }
    }
}

/// Durable record of flights, seat occupancy and bookings.
///
/// Reads on the ledger itself are unlocked snapshots. All inventory mutations go
/// through a [`LedgerTransaction`] obtained from [`InventoryLedger::begin`].
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTransaction>>;

    /// Schedule load. Fails with `DuplicateFlight` if the id exists.
    async fn insert_flight(&self, flight: &Flight) -> LedgerResult<()>;

    async fn get_flight(&self, id: FlightId) -> LedgerResult<Option<Flight>>;

    /// Matching flights, ordered per `filter.sort`.
    async fn search_flights(&self, filter: &FlightFilter) -> LedgerResult<Vec<Flight>>;

    async fn find_booking_by_pnr(&self, pnr: &Pnr) -> LedgerResult<Option<Booking>>;

    async fn list_bookings_for_flight(&self, id: FlightId) -> LedgerResult<Vec<Booking>>;
}

/// A unit of work against the ledger.
///
/// Reads see this transaction's own writes; other readers see nothing until
/// `commit`. Dropping a transaction that was neither committed nor rolled back
/// discards its writes. Calls after `commit`/`rollback` fail with `TransactionClosed`,
/// except `rollback`, which is a no-op on a finished transaction.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Reads the flight and takes its row lock for the rest of the transaction.
    async fn get_flight_for_update(&mut self, id: FlightId) -> LedgerResult<Option<Flight>>;

    async fn set_available_seats(&mut self, id: FlightId, available: u32) -> LedgerResult<()>;

    async fn set_current_price(&mut self, id: FlightId, price: Decimal) -> LedgerResult<()>;

    async fn set_demand_level(&mut self, id: FlightId, level: DemandLevel) -> LedgerResult<()>;

    /// Seats referenced by confirmed bookings on the flight.
    async fn list_active_seat_labels(&mut self, id: FlightId) -> LedgerResult<BTreeSet<SeatLabel>>;

    async fn insert_booking(&mut self, booking: &Booking) -> LedgerResult<()>;

    async fn update_booking_status(&mut self, pnr: &Pnr, change: StatusChange) -> LedgerResult<()>;

    async fn find_booking_by_pnr(&mut self, pnr: &Pnr) -> LedgerResult<Option<Booking>>;

    async fn pnr_exists(&mut self, pnr: &Pnr) -> LedgerResult<bool>;

    async fn commit(&mut self) -> LedgerResult<()>;

    async fn rollback(&mut self) -> LedgerResult<()>;
}
