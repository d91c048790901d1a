use crate::booking::Pnr;
use crate::flight::FlightId;
use crate::ledger::LedgerError;
use crate::payment::PaymentError;
use crate::seat::SeatLabel;

/// Every way a booking, cancellation or reprice can fail.
///
/// Nothing is retried inside the core; callers use [`BookingError::is_retryable`]
/// to decide whether a second attempt could succeed.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Flight not found: {0}")]
    FlightNotFound(FlightId),

    #[error("No seats available on flight {0}")]
    NoSeatsAvailable(FlightId),

    #[error("Seat {0} is already taken")]
    SeatTaken(SeatLabel),

    #[error("Invalid seat: {0}")]
    InvalidSeat(String),

    #[error("Flight {0} has already departed")]
    FlightDeparted(FlightId),

    #[error("Payment failed: {0}")]
    PaymentFailed(#[from] PaymentError),

    #[error("Booking not found: {0}")]
    BookingNotFound(Pnr),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(Pnr),

    #[error("Flight {0} is busy, try again")]
    Busy(FlightId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Storage error: {0}")]
    Storage(LedgerError),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::PaymentFailed(_) | BookingError::Busy(_))
    }

    /// Stable machine-readable code for API bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::FlightNotFound(_) => "FLIGHT_NOT_FOUND",
            BookingError::NoSeatsAvailable(_) => "NO_SEATS_AVAILABLE",
            BookingError::SeatTaken(_) => "SEAT_TAKEN",
            BookingError::InvalidSeat(_) => "INVALID_SEAT",
            BookingError::FlightDeparted(_) => "FLIGHT_DEPARTED",
            BookingError::PaymentFailed(_) => "PAYMENT_FAILED",
            BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            BookingError::Busy(_) => "BUSY",
            BookingError::InvalidRequest(_) => "INVALID_REQUEST",
            BookingError::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            BookingError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::LockTimeout(flight_id) => BookingError::Busy(flight_id),
            LedgerError::SeatConflict(_, seat) => BookingError::SeatTaken(seat),
            LedgerError::SeatCountOutOfRange(flight_id) => BookingError::IntegrityViolation(format!(
                "available seats out of range on flight {}",
                flight_id
            )),
            other => BookingError::Storage(other),
        }
    }
}
