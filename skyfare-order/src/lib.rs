pub mod attempt;
pub mod events;
pub mod locator;
pub mod locks;
pub mod manager;
pub mod market;
pub mod payment;

pub use attempt::{AttemptError, AttemptState, BookingAttempt};
pub use events::BookingEvent;
pub use locator::PnrGenerator;
pub use locks::{FlightGuard, FlightLockTable};
pub use manager::{BookingConfirmation, BookingManager, BookingRequest, CancellationResult};
pub use market::{MarketReport, MarketUpdater};
pub use payment::{PaymentOrchestrator, SimulatedPaymentOracle};
