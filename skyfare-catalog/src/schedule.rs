use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skyfare_core::{DemandLevel, NewFlight};

/// (airline, flight number prefix)
const AIRLINES: &[(&str, &str)] = &[
    ("Air India", "AI"),
    ("IndiGo", "6E"),
    ("SpiceJet", "SG"),
    ("Vistara", "UK"),
    ("Go First", "G8"),
    ("AirAsia India", "I5"),
];

const ROUTES: &[(&str, &str)] = &[
    ("BLR", "DEL"), ("BLR", "BOM"), ("BLR", "MAA"),
    ("BLR", "HYD"), ("BLR", "CCU"), ("BLR", "GOI"),
    ("DEL", "BLR"), ("DEL", "BOM"), ("DEL", "MAA"),
    ("BOM", "BLR"), ("BOM", "DEL"), ("BOM", "GOI"),
    ("MAA", "BLR"), ("MAA", "DEL"), ("MAA", "BOM"),
    ("HYD", "BLR"), ("HYD", "DEL"), ("HYD", "BOM"),
    ("CCU", "BLR"), ("CCU", "DEL"), ("CCU", "BOM"),
];

/// Block time in minutes for routes with a known duration.
const DURATIONS: &[((&str, &str), i64)] = &[
    (("BLR", "DEL"), 150), (("BLR", "BOM"), 105), (("BLR", "MAA"), 60),
    (("BLR", "HYD"), 75), (("BLR", "CCU"), 165), (("BLR", "GOI"), 75),
    (("DEL", "BLR"), 150), (("DEL", "BOM"), 120), (("DEL", "MAA"), 165),
    (("BOM", "BLR"), 105), (("BOM", "DEL"), 120), (("BOM", "GOI"), 60),
];

const DEFAULT_DURATION_MINUTES: i64 = 120;

/// Departure slots as (hour, minute), with the matching arrival slot.
const TIME_SLOTS: &[((u32, u32), (u32, u32))] = &[
    ((6, 0), (8, 30)), ((7, 30), (10, 0)),
    ((9, 0), (11, 30)), ((10, 30), (13, 0)),
    ((12, 0), (14, 30)), ((14, 0), (16, 30)),
    ((16, 0), (18, 30)), ((18, 0), (20, 30)),
    ((19, 30), (22, 0)), ((21, 0), (23, 30)),
];

const SEAT_COUNTS: &[u32] = &[150, 164, 180, 186, 189];

/// How much demo schedule to generate at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    pub enabled: bool,
    /// Days of schedule, starting tomorrow.
    pub days_ahead: u32,
    /// Routes sampled per day.
    pub routes_per_day: usize,
    pub flights_per_route: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days_ahead: 14,
            routes_per_day: 10,
            flights_per_route: 2,
        }
    }
}

pub fn route_duration_minutes(origin: &str, destination: &str) -> i64 {
    DURATIONS
        .iter()
        .find(|((o, d), _)| *o == origin && *d == destination)
        .map(|(_, minutes)| *minutes)
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

/// Base fare band, in rupees, by route length.
pub fn price_band(duration_minutes: i64) -> (u32, u32) {
    if duration_minutes < 90 {
        (2500, 4000)
    } else if duration_minutes < 150 {
        (4000, 6000)
    } else {
        (6000, 10000)
    }
}

fn at(date: NaiveDate, (hour, minute): (u32, u32)) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Produces a plausible domestic schedule for seeding an empty ledger.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    config: SeedConfig,
}

impl ScheduleGenerator {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    pub fn flights_for_route<R: Rng>(
        &self,
        rng: &mut R,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        count: usize,
    ) -> Vec<NewFlight> {
        let origin = origin.to_ascii_uppercase();
        let destination = destination.to_ascii_uppercase();
        let duration = route_duration_minutes(&origin, &destination);
        let (low, high) = price_band(duration);

        TIME_SLOTS
            .choose_multiple(rng, count.min(TIME_SLOTS.len()))
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|(departs, arrives)| {
                let departure_time = at(date, departs)?;
                let mut arrival_time = at(date, arrives)?;
                if arrival_time <= departure_time {
                    arrival_time += Duration::days(1);
                }

                let (airline, prefix) = AIRLINES.choose(rng).copied()?;
                let total_seats = SEAT_COUNTS.choose(rng).copied()?;
                let demand_level = [DemandLevel::Low, DemandLevel::Medium, DemandLevel::High]
                    .choose(rng)
                    .copied()?;

                Some(NewFlight {
                    flight_number: format!("{}{}", prefix, rng.gen_range(100..=999)),
                    airline: airline.to_string(),
                    origin: origin.clone(),
                    destination: destination.clone(),
                    departure_time,
                    arrival_time,
                    base_price: Decimal::from(rng.gen_range(low..=high)),
                    total_seats,
                    demand_level,
                })
            })
            .collect()
    }

    pub fn flights_for_date<R: Rng>(&self, rng: &mut R, date: NaiveDate) -> Vec<NewFlight> {
        let routes = ROUTES
            .iter()
            .choose_multiple(rng, self.config.routes_per_day.min(ROUTES.len()));
        let mut flights = Vec::new();
        for (origin, destination) in routes {
            flights.extend(self.flights_for_route(
                rng,
                origin,
                destination,
                date,
                self.config.flights_per_route,
            ));
        }
        flights
    }

    /// `days_ahead` days of schedule starting the day after `today`.
    pub fn generate<R: Rng>(&self, rng: &mut R, today: NaiveDate) -> Vec<NewFlight> {
        if !self.config.enabled {
            return Vec::new();
        }
        (1..=self.config.days_ahead)
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset as i64)))
            .flat_map(|date| self.flights_for_date(rng, date))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }

    #[test]
    fn test_route_durations_and_bands() {
        assert_eq!(route_duration_minutes("BLR", "DEL"), 150);
        assert_eq!(route_duration_minutes("MAA", "BOM"), 120);
        assert_eq!(price_band(60), (2500, 4000));
        assert_eq!(price_band(120), (4000, 6000));
        assert_eq!(price_band(150), (6000, 10000));
    }

    #[test]
    fn test_route_flights_are_plausible() {
        let generator = ScheduleGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);
        let flights = generator.flights_for_route(&mut rng, "blr", "maa", date(), 5);

        assert_eq!(flights.len(), 5);
        for f in &flights {
            assert_eq!(f.origin, "BLR");
            assert_eq!(f.destination, "MAA");
            assert_eq!(f.departure_time.date_naive(), date());
            assert!(f.arrival_time > f.departure_time);
            assert!(SEAT_COUNTS.contains(&f.total_seats));
            assert!(f.base_price >= Decimal::from(2500) && f.base_price <= Decimal::from(4000));
            assert!(AIRLINES.iter().any(|(_, p)| f.flight_number.starts_with(p)));
            assert_ne!(f.demand_level, DemandLevel::VeryHigh);
        }

        let mut slots: Vec<_> = flights.iter().map(|f| f.departure_time).collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn test_generate_covers_days_ahead() {
        let generator = ScheduleGenerator::new(SeedConfig {
            enabled: true,
            days_ahead: 3,
            routes_per_day: 4,
            flights_per_route: 2,
        });
        let mut rng = StdRng::seed_from_u64(9);
        let flights = generator.generate(&mut rng, date());
        assert_eq!(flights.len(), 3 * 4 * 2);
        assert!(flights.iter().all(|f| f.departure_time.date_naive() > date()));

        let disabled = ScheduleGenerator::new(SeedConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(disabled.generate(&mut rng, date()).is_empty());
    }
}
