use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type FlightId = Uuid;

/// Coarse market-pressure signal that feeds the pricing model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DemandLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl DemandLevel {
    pub const ALL: [DemandLevel; 4] = [
        DemandLevel::Low,
        DemandLevel::Medium,
        DemandLevel::High,
        DemandLevel::VeryHigh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DemandLevel::Low => "low",
            DemandLevel::Medium => "medium",
            DemandLevel::High => "high",
            DemandLevel::VeryHigh => "very_high",
        }
    }

    /// Parses a stored level, treating anything unrecognised as `Medium`
    /// so it prices at the neutral factor.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemandLevel {
    type Err = UnknownDemandLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(DemandLevel::Low),
            "medium" => Ok(DemandLevel::Medium),
            "high" => Ok(DemandLevel::High),
            "very_high" | "very-high" | "veryhigh" => Ok(DemandLevel::VeryHigh),
            _ => Err(UnknownDemandLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown demand level: {0}")]
pub struct UnknownDemandLevel(pub String);

/// A scheduled flight and its live inventory row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: FlightId,
    pub flight_number: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub current_price: Decimal,
    pub total_seats: u32,
    pub available_seats: u32,
    pub demand_level: DemandLevel,
}

impl Flight {
    pub fn seats_sold(&self) -> u32 {
        self.total_seats.saturating_sub(self.available_seats)
    }

    /// Departed flights accept no bookings or cancellations.
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time <= now
    }

    pub fn occupancy_rate(&self) -> f64 {
        if self.total_seats == 0 {
            return 1.0;
        }
        self.seats_sold() as f64 / self.total_seats as f64
    }
}

/// Schedule input for a flight that has not been priced or stored yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlight {
    pub flight_number: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub total_seats: u32,
    #[serde(default)]
    pub demand_level: DemandLevel,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlightSort {
    #[default]
    Price,
    Departure,
}

/// Search criteria for unlocked flight listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>, // Departure date, UTC
    pub departing_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort: FlightSort,
}

impl FlightFilter {
    pub fn matches(&self, flight: &Flight) -> bool {
        if let Some(origin) = &self.origin {
            if !flight.origin.eq_ignore_ascii_case(origin) {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !flight.destination.eq_ignore_ascii_case(destination) {
                return false;
            }
        }
        if let Some(date) = self.date {
            if flight.departure_time.date_naive() != date {
                return false;
            }
        }
        if let Some(after) = self.departing_after {
            if flight.departure_time <= after {
                return false;
            }
        }
        true
    }

    /// Sorts flights in place according to `self.sort`.
    pub fn order(&self, flights: &mut [Flight]) {
        match self.sort {
            FlightSort::Price => flights.sort_by(|a, b| {
                a.current_price
                    .cmp(&b.current_price)
                    .then(a.departure_time.cmp(&b.departure_time))
            }),
            FlightSort::Departure => flights.sort_by(|a, b| {
                a.departure_time
                    .cmp(&b.departure_time)
                    .then(a.current_price.cmp(&b.current_price))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn flight(origin: &str, destination: &str, hours_out: i64, price: Decimal) -> Flight {
        let departure = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap() + Duration::hours(hours_out);
        Flight {
            id: Uuid::new_v4(),
            flight_number: "AI101".to_string(),
            airline: "Air India".to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::minutes(150),
            base_price: price,
            current_price: price,
            total_seats: 150,
            available_seats: 150,
            demand_level: DemandLevel::Medium,
        }
    }

    #[test]
    fn test_demand_level_parsing() {
        assert_eq!("HIGH".parse::<DemandLevel>().unwrap(), DemandLevel::High);
        assert_eq!("very_high".parse::<DemandLevel>().unwrap(), DemandLevel::VeryHigh);
        assert!("surging".parse::<DemandLevel>().is_err());
        assert_eq!(DemandLevel::parse_lenient("surging"), DemandLevel::Medium);
    }

    #[test]
    fn test_filter_matches_route_and_date() {
        let f = flight("BLR", "DEL", 2, dec!(4500));
        let filter = FlightFilter {
            origin: Some("blr".to_string()),
            destination: Some("DEL".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        };
        assert!(filter.matches(&f));

        let wrong_day = FlightFilter {
            date: NaiveDate::from_ymd_opt(2026, 3, 2),
            ..Default::default()
        };
        assert!(!wrong_day.matches(&f));
    }

    #[test]
    fn test_filter_ordering() {
        let mut flights = vec![
            flight("BLR", "DEL", 5, dec!(3000)),
            flight("BLR", "DEL", 1, dec!(5000)),
            flight("BLR", "DEL", 3, dec!(4000)),
        ];

        FlightFilter::default().order(&mut flights);
        let prices: Vec<Decimal> = flights.iter().map(|f| f.current_price).collect();
        assert_eq!(prices, vec![dec!(3000), dec!(4000), dec!(5000)]);

        let by_departure = FlightFilter {
            sort: FlightSort::Departure,
            ..Default::default()
        };
        by_departure.order(&mut flights);
        let prices: Vec<Decimal> = flights.iter().map(|f| f.current_price).collect();
        assert_eq!(prices, vec![dec!(5000), dec!(4000), dec!(3000)]);
    }

    #[test]
    fn test_occupancy() {
        let mut f = flight("BLR", "DEL", 2, dec!(4500));
        f.available_seats = 30;
        assert_eq!(f.seats_sold(), 120);
        assert!((f.occupancy_rate() - 0.8).abs() < 1e-9);
    }
}
