use skyfare_core::BookingError;
use std::fmt;

/// Progress of a single booking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Start,
    FlightLocked,
    Validated,
    SeatAllocated,
    PaymentCleared,
    Committed,
    Aborted,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptState::Start => "START",
            AttemptState::FlightLocked => "FLIGHT_LOCKED",
            AttemptState::Validated => "VALIDATED",
            AttemptState::SeatAllocated => "SEAT_ALLOCATED",
            AttemptState::PaymentCleared => "PAYMENT_CLEARED",
            AttemptState::Committed => "COMMITTED",
            AttemptState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: AttemptState, to: AttemptState },
}

impl From<AttemptError> for BookingError {
    fn from(err: AttemptError) -> Self {
        BookingError::IntegrityViolation(err.to_string())
    }
}

/// Tracks an attempt through `Start → FlightLocked → Validated → SeatAllocated →
/// PaymentCleared → Committed`, or `Aborted` from any non-terminal state.
#[derive(Debug)]
pub struct BookingAttempt {
    state: AttemptState,
}

impl BookingAttempt {
    pub fn new() -> Self {
        Self {
            state: AttemptState::Start,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, AttemptState::Committed | AttemptState::Aborted)
    }

    /// Start → FlightLocked
    pub fn lock_acquired(&mut self) -> Result<(), AttemptError> {
        self.advance(AttemptState::Start, AttemptState::FlightLocked)
    }

    /// FlightLocked → Validated
    pub fn validated(&mut self) -> Result<(), AttemptError> {
        self.advance(AttemptState::FlightLocked, AttemptState::Validated)
    }

    /// Validated → SeatAllocated
    pub fn seat_allocated(&mut self) -> Result<(), AttemptError> {
        self.advance(AttemptState::Validated, AttemptState::SeatAllocated)
    }

    /// SeatAllocated → PaymentCleared
    pub fn payment_cleared(&mut self) -> Result<(), AttemptError> {
        self.advance(AttemptState::SeatAllocated, AttemptState::PaymentCleared)
    }

    /// PaymentCleared → Committed
    pub fn committed(&mut self) -> Result<(), AttemptError> {
        self.advance(AttemptState::PaymentCleared, AttemptState::Committed)
    }

    /// Any non-terminal state → Aborted
    pub fn abort(&mut self) -> Result<(), AttemptError> {
        if self.is_finished() {
            return Err(AttemptError::InvalidTransition {
                from: self.state,
                to: AttemptState::Aborted,
            });
        }
        self.state = AttemptState::Aborted;
        Ok(())
    }

    fn advance(&mut self, expected: AttemptState, next: AttemptState) -> Result<(), AttemptError> {
        if self.state != expected {
            return Err(AttemptError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

impl Default for BookingAttempt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_lifecycle() {
        let mut attempt = BookingAttempt::new();

        attempt.lock_acquired().unwrap();
        attempt.validated().unwrap();
        attempt.seat_allocated().unwrap();
        attempt.payment_cleared().unwrap();
        attempt.committed().unwrap();

        assert_eq!(attempt.state(), AttemptState::Committed);
        assert!(attempt.is_finished());
    }

    #[test]
    fn test_invalid_transition() {
        let mut attempt = BookingAttempt::new();
        attempt.lock_acquired().unwrap();

        // Cannot charge before a seat is held
        let result = attempt.payment_cleared();
        assert_eq!(
            result,
            Err(AttemptError::InvalidTransition {
                from: AttemptState::FlightLocked,
                to: AttemptState::PaymentCleared,
            })
        );

        let err: BookingError = result.unwrap_err().into();
        assert_eq!(err.code(), "INTEGRITY_VIOLATION");
    }

    #[test]
    fn test_abort_only_before_finish() {
        let mut attempt = BookingAttempt::new();
        attempt.lock_acquired().unwrap();
        attempt.abort().unwrap();
        assert_eq!(attempt.state(), AttemptState::Aborted);
        assert!(attempt.abort().is_err());
        assert!(attempt.validated().is_err());
    }
}
