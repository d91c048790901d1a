use crate::flight::FlightId;
use crate::pii::Masked;
use crate::seat::SeatLabel;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type BookingId = Uuid;

/// Passenger name record locator, e.g. `K7Q2ZD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pnr(String);

impl Pnr {
    /// Normalises user input (trim, uppercase) into a locator.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Pnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pnr {
    fn from(raw: &str) -> Self {
        Pnr::new(raw)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    RefundPending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::RefundPending => "REFUND_PENDING",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PAID" => Some(PaymentStatus::Paid),
            "REFUND_PENDING" => Some(PaymentStatus::RefundPending),
            _ => None,
        }
    }
}

/// Passenger attributes captured at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub email: Masked<String>,
    pub phone: Masked<String>,
}

impl Passenger {
    /// Returns a description of the first missing or malformed field.
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() {
            return Err("first_name is required".to_string());
        }
        if self.last_name.trim().is_empty() {
            return Err("last_name is required".to_string());
        }
        if self.age == 0 || self.age > 120 {
            return Err(format!("age {} is out of range", self.age));
        }
        if !self.email.expose().contains('@') {
            return Err("email is malformed".to_string());
        }
        if self.phone.expose().trim().is_empty() {
            return Err("phone is required".to_string());
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A seat purchase. Rows are never deleted; cancellation flips `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub pnr: Pnr,
    pub flight_id: FlightId,
    pub passenger: Passenger,
    pub seat_label: SeatLabel,
    pub booking_price: Decimal, // Snapshot of the price charged
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger() -> Passenger {
        Passenger {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            age: 34,
            email: Masked("asha@example.com".to_string()),
            phone: Masked("+91 98450 12345".to_string()),
        }
    }

    #[test]
    fn test_pnr_normalises_input() {
        let pnr = Pnr::new("  k7q2zd ");
        assert_eq!(pnr.as_str(), "K7Q2ZD");
        assert_eq!(pnr, Pnr::from("K7Q2ZD"));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&BookingStatus::Cancelled).unwrap(), "\"CANCELLED\"");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::RefundPending).unwrap(),
            "\"REFUND_PENDING\""
        );
        assert_eq!(BookingStatus::parse("CONFIRMED"), Some(BookingStatus::Confirmed));
        assert_eq!(PaymentStatus::parse(PaymentStatus::Paid.as_str()), Some(PaymentStatus::Paid));
        assert_eq!(BookingStatus::parse("HELD"), None);
    }

    #[test]
    fn test_passenger_validation() {
        assert!(passenger().validate().is_ok());

        let mut p = passenger();
        p.first_name = " ".to_string();
        assert!(p.validate().is_err());

        let mut p = passenger();
        p.email = Masked("not-an-email".to_string());
        assert!(p.validate().is_err());

        let mut p = passenger();
        p.age = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_passenger_debug_is_masked() {
        let rendered = format!("{:?}", passenger());
        assert!(rendered.contains("Asha"));
        assert!(!rendered.contains("asha@example.com"));
        assert!(!rendered.contains("98450"));
    }
}
