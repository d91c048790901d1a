use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Widest locator the booking schema can store.
pub const MAX_PNR_LENGTH: usize = 16;

/// Locator generation limits. Collisions on the primary length retry up to
/// `primary_attempts` times, then switch to `fallback_length`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PnrConfig {
    pub primary_length: usize,
    pub primary_attempts: u32,
    pub fallback_length: usize,
    pub fallback_attempts: u32,
}

impl Default for PnrConfig {
    fn default() -> Self {
        Self {
            primary_length: 6,
            primary_attempts: 10,
            fallback_length: 10,
            fallback_attempts: 10,
        }
    }
}

/// Tunables for the booking transaction manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BookingRules {
    /// Upper bound on waiting for a flight's lock before answering `Busy`.
    pub lock_timeout_ms: u64,
    /// Upper bound on a single payment oracle call.
    pub payment_timeout_ms: u64,
    /// Recompute the price after a cancellation releases a seat.
    pub reprice_on_cancel: bool,
    pub pnr: PnrConfig,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
            payment_timeout_ms: 5_000,
            reprice_on_cancel: true,
            pnr: PnrConfig::default(),
        }
    }
}

impl BookingRules {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_millis(self.payment_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout_ms == 0 {
            return Err("booking.lock_timeout_ms must be positive".to_string());
        }
        if self.payment_timeout_ms == 0 {
            return Err("booking.payment_timeout_ms must be positive".to_string());
        }
        if self.pnr.primary_length == 0 || self.pnr.fallback_length <= self.pnr.primary_length {
            return Err("booking.pnr.fallback_length must exceed a positive primary_length".to_string());
        }
        if self.pnr.fallback_length > MAX_PNR_LENGTH {
            return Err(format!("booking.pnr.fallback_length must not exceed {}", MAX_PNR_LENGTH));
        }
        if self.pnr.primary_attempts == 0 || self.pnr.fallback_attempts == 0 {
            return Err("booking.pnr attempt limits must be positive".to_string());
        }
        Ok(())
    }
}
