pub mod booking;
pub mod clock;
pub mod error;
pub mod flight;
pub mod ledger;
pub mod locator;
pub mod payment;
pub mod pii;
pub mod rules;
pub mod seat;

pub use booking::{Booking, BookingId, BookingStatus, Passenger, PaymentStatus, Pnr};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BookingError, BookingResult};
pub use flight::{DemandLevel, Flight, FlightFilter, FlightId, FlightSort, NewFlight};
pub use ledger::{InventoryLedger, LedgerError, LedgerResult, LedgerTransaction, StatusChange};
pub use locator::{LocatorSource, RandomLocatorSource, ScriptedLocatorSource};
pub use payment::{ChargeRequest, PaymentError, PaymentOracle, PaymentOutcome, ScriptedPaymentOracle};
pub use pii::Masked;
pub use rules::{BookingRules, PnrConfig, MAX_PNR_LENGTH};
pub use seat::{SeatLabel, SeatLabelError};
