use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skyfare_core::{DemandLevel, FlightId, Pnr, SeatLabel};

/// Published after every committed inventory change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    Confirmed {
        flight_id: FlightId,
        pnr: Pnr,
        seat_label: SeatLabel,
        price_charged: Decimal,
        available_seats: u32,
        current_price: Decimal,
        at: DateTime<Utc>,
    },
    Cancelled {
        flight_id: FlightId,
        pnr: Pnr,
        seat_label: SeatLabel,
        available_seats: u32,
        current_price: Decimal,
        at: DateTime<Utc>,
    },
    Repriced {
        flight_id: FlightId,
        demand_level: DemandLevel,
        available_seats: u32,
        current_price: Decimal,
        at: DateTime<Utc>,
    },
}

impl BookingEvent {
    pub fn flight_id(&self) -> FlightId {
        match self {
            BookingEvent::Confirmed { flight_id, .. }
            | BookingEvent::Cancelled { flight_id, .. }
            | BookingEvent::Repriced { flight_id, .. } => *flight_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BookingEvent::Confirmed { .. } => "confirmed",
            BookingEvent::Cancelled { .. } => "cancelled",
            BookingEvent::Repriced { .. } => "repriced",
        }
    }
}
