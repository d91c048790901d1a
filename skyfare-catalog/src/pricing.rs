use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use skyfare_core::{DemandLevel, Flight};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One knot of a piecewise-linear curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub at: f64,
    pub factor: f64,
}

impl CurvePoint {
    pub const fn new(at: f64, factor: f64) -> Self {
        Self { at, factor }
    }
}

/// Linear interpolation through `points` (sorted by `at`), flat beyond either end.
fn interpolate(points: &[CurvePoint], x: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 1.0,
    };
    if x <= first.at {
        return first.factor;
    }
    if x >= last.at {
        return last.factor;
    }
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if x <= hi.at {
            let span = hi.at - lo.at;
            if span <= 0.0 {
                return hi.factor;
            }
            return lo.factor + (x - lo.at) / span * (hi.factor - lo.factor);
        }
    }
    last.factor
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemandFactors {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for DemandFactors {
    fn default() -> Self {
        Self {
            low: 0.9,
            medium: 1.0,
            high: 1.4,
            very_high: 2.0,
        }
    }
}

impl DemandFactors {
    pub fn factor(&self, level: DemandLevel) -> f64 {
        match level {
            DemandLevel::Low => self.low,
            DemandLevel::Medium => self.medium,
            DemandLevel::High => self.high,
            DemandLevel::VeryHigh => self.very_high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingConfigError {
    #[error("{0} curve needs at least two points")]
    CurveTooShort(&'static str),

    #[error("{0} curve points must be sorted by position")]
    CurveUnsorted(&'static str),

    #[error("Occupancy curve factors must not decrease")]
    OccupancyNotMonotonic,

    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("min_multiplier must not exceed max_multiplier")]
    ClampInverted,
}

/// Weights, breakpoints and clamps for the pricing model.
///
/// Built once at startup and shared read-only by every engine user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    pub seat_weight: f64,
    pub time_weight: f64,
    pub demand_weight: f64,

    pub min_multiplier: f64,
    pub max_multiplier: f64,

    /// Seat factor when nothing is left to sell.
    pub sold_out_factor: f64,
    /// Time factor once departure is in the past.
    pub departed_factor: f64,

    /// Occupancy rate (0..=1) to seat factor.
    pub occupancy_curve: Vec<CurvePoint>,
    /// Days until departure to time factor.
    pub time_curve: Vec<CurvePoint>,

    pub demand_factors: DemandFactors,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            seat_weight: 0.4,
            time_weight: 0.35,
            demand_weight: 0.25,
            min_multiplier: 0.8,
            max_multiplier: 3.0,
            sold_out_factor: 3.0,
            departed_factor: 3.0,
            occupancy_curve: vec![
                CurvePoint::new(0.0, 0.8),
                CurvePoint::new(0.2, 1.0),
                CurvePoint::new(0.6, 1.5),
                CurvePoint::new(0.9, 2.5),
                CurvePoint::new(1.0, 3.0),
            ],
            time_curve: vec![
                CurvePoint::new(0.0, 3.0),
                CurvePoint::new(1.0, 2.5),
                CurvePoint::new(3.0, 1.7),
                CurvePoint::new(7.0, 1.3),
                CurvePoint::new(15.0, 1.0),
                CurvePoint::new(30.0, 0.8),
            ],
            demand_factors: DemandFactors::default(),
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), PricingConfigError> {
        check_curve("occupancy", &self.occupancy_curve)?;
        check_curve("time", &self.time_curve)?;

        if self
            .occupancy_curve
            .windows(2)
            .any(|pair| pair[1].factor < pair[0].factor)
        {
            return Err(PricingConfigError::OccupancyNotMonotonic);
        }

        let non_negative = [
            ("seat_weight", self.seat_weight),
            ("time_weight", self.time_weight),
            ("demand_weight", self.demand_weight),
            ("min_multiplier", self.min_multiplier),
            ("max_multiplier", self.max_multiplier),
            ("sold_out_factor", self.sold_out_factor),
            ("departed_factor", self.departed_factor),
            ("demand_factors.low", self.demand_factors.low),
            ("demand_factors.medium", self.demand_factors.medium),
            ("demand_factors.high", self.demand_factors.high),
            ("demand_factors.very_high", self.demand_factors.very_high),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PricingConfigError::InvalidValue(name));
            }
        }

        if self.min_multiplier > self.max_multiplier {
            return Err(PricingConfigError::ClampInverted);
        }
        Ok(())
    }
}

fn check_curve(name: &'static str, points: &[CurvePoint]) -> Result<(), PricingConfigError> {
    if points.len() < 2 {
        return Err(PricingConfigError::CurveTooShort(name));
    }
    if points
        .iter()
        .any(|p| !p.at.is_finite() || !p.factor.is_finite() || p.factor < 0.0)
    {
        return Err(PricingConfigError::InvalidValue(name));
    }
    if points.windows(2).any(|pair| pair[1].at <= pair[0].at) {
        return Err(PricingConfigError::CurveUnsorted(name));
    }
    Ok(())
}

/// Flight state the pricing model reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInput {
    pub base_price: Decimal,
    pub total_seats: u32,
    pub available_seats: u32,
    pub departure_time: DateTime<Utc>,
    pub demand_level: DemandLevel,
}

impl PricingInput {
    /// Same flight with a different seat count, used to price the state a
    /// booking or cancellation is about to produce.
    pub fn with_available(self, available_seats: u32) -> Self {
        Self {
            available_seats,
            ..self
        }
    }
}

impl From<&Flight> for PricingInput {
    fn from(flight: &Flight) -> Self {
        Self {
            base_price: flight.base_price,
            total_seats: flight.total_seats,
            available_seats: flight.available_seats,
            departure_time: flight.departure_time,
            demand_level: flight.demand_level,
        }
    }
}

/// A computed price with the factors that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub current_price: Decimal,
    pub seat_factor: f64,
    pub time_factor: f64,
    pub demand_factor: f64,
    pub multiplier: f64,
    /// Change versus base price, in percent, one decimal place.
    pub percentage_change: f64,
}

/// Maps flight state and the current time to a price.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn seat_factor(&self, total_seats: u32, available_seats: u32) -> f64 {
        if available_seats == 0 || total_seats == 0 {
            return self.config.sold_out_factor;
        }
        let sold = total_seats.saturating_sub(available_seats);
        let occupancy = sold as f64 / total_seats as f64;
        interpolate(&self.config.occupancy_curve, occupancy)
    }

    pub fn time_factor(&self, departure_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let delta = departure_time - now;
        let seconds = delta.num_milliseconds() as f64 / 1000.0;
        if seconds < 0.0 {
            return self.config.departed_factor;
        }
        interpolate(&self.config.time_curve, seconds / SECONDS_PER_DAY)
    }

    pub fn demand_factor(&self, level: DemandLevel) -> f64 {
        self.config.demand_factors.factor(level)
    }

    pub fn quote(&self, input: &PricingInput, now: DateTime<Utc>) -> PriceQuote {
        // 1. Factors
        let seat_factor = self.seat_factor(input.total_seats, input.available_seats);
        let time_factor = self.time_factor(input.departure_time, now);
        let demand_factor = self.demand_factor(input.demand_level);

        // 2. Weighted blend, clamped
        let multiplier = (self.config.seat_weight * seat_factor
            + self.config.time_weight * time_factor
            + self.config.demand_weight * demand_factor)
            .max(self.config.min_multiplier)
            .min(self.config.max_multiplier);

        // 3. Price, rounded to the cent
        // Finite after clamping a validated config.
        let scale = Decimal::from_f64(multiplier).unwrap_or(Decimal::ONE);
        let current_price = (input.base_price * scale)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        PriceQuote {
            base_price: input.base_price,
            current_price,
            seat_factor: round_to(seat_factor, 2),
            time_factor: round_to(time_factor, 2),
            demand_factor: round_to(demand_factor, 2),
            multiplier: round_to(multiplier, 2),
            percentage_change: round_to((multiplier - 1.0) * 100.0, 1),
        }
    }

    pub fn price(&self, input: &PricingInput, now: DateTime<Utc>) -> Decimal {
        self.quote(input, now).current_price
    }

    pub fn price_flight(&self, flight: &Flight, now: DateTime<Utc>) -> Decimal {
        self.price(&PricingInput::from(flight), now)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn input(total: u32, available: u32, days_out: i64, demand: DemandLevel) -> PricingInput {
        PricingInput {
            base_price: dec!(5000),
            total_seats: total,
            available_seats: available,
            departure_time: now() + Duration::days(days_out),
            demand_level: demand,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_seat_factor_breakpoints() {
        let engine = PricingEngine::default();
        assert!(close(engine.seat_factor(100, 100), 0.8));
        assert!(close(engine.seat_factor(100, 80), 1.0));
        assert!(close(engine.seat_factor(100, 60), 1.25));
        assert!(close(engine.seat_factor(100, 40), 1.5));
        assert!(close(engine.seat_factor(100, 10), 2.5));
        assert!(close(engine.seat_factor(100, 5), 2.75));
        assert!(close(engine.seat_factor(100, 0), 3.0));
    }

    #[test]
    fn test_time_factor_breakpoints() {
        let engine = PricingEngine::default();
        let at = |days: i64| engine.time_factor(now() + Duration::days(days), now());
        assert!(close(at(45), 0.8));
        assert!(close(at(30), 0.8));
        assert!(close(at(15), 1.0));
        assert!(close(at(11), 1.15));
        assert!(close(at(7), 1.3));
        assert!(close(at(3), 1.7));
        assert!(close(at(1), 2.5));
        assert!(close(at(0), 3.0));
        assert!(close(engine.time_factor(now() - Duration::hours(1), now()), 3.0));
    }

    #[test]
    fn test_demand_factors() {
        let engine = PricingEngine::default();
        assert!(close(engine.demand_factor(DemandLevel::Low), 0.9));
        assert!(close(engine.demand_factor(DemandLevel::Medium), 1.0));
        assert!(close(engine.demand_factor(DemandLevel::High), 1.4));
        assert!(close(engine.demand_factor(DemandLevel::VeryHigh), 2.0));
    }

    #[test]
    fn test_quote_breakdown() {
        let engine = PricingEngine::default();
        // Empty flight, 45 days out, low demand: 0.4*0.8 + 0.35*0.8 + 0.25*0.9 = 0.825
        let quote = engine.quote(&input(100, 100, 45, DemandLevel::Low), now());
        assert!((quote.multiplier - 0.825).abs() < 0.01);
        assert_eq!(quote.current_price, dec!(4125.00));
        assert!(close(quote.percentage_change, -17.5));
        assert!(close(quote.seat_factor, 0.8));
    }

    #[test]
    fn test_multiplier_is_clamped() {
        let config = PricingConfig {
            max_multiplier: 2.0,
            ..Default::default()
        };
        let engine = PricingEngine::new(config);
        // Sold out, departing now, very high demand: 0.4*3 + 0.35*3 + 0.25*2 = 2.75
        let quote = engine.quote(&input(100, 0, 0, DemandLevel::VeryHigh), now());
        assert!(close(quote.multiplier, 2.0));
        assert_eq!(quote.current_price, dec!(10000.00));

        let floor = PricingConfig {
            min_multiplier: 1.0,
            ..Default::default()
        };
        let quote = PricingEngine::new(floor).quote(&input(100, 100, 45, DemandLevel::Low), now());
        assert_eq!(quote.current_price, dec!(5000.00));
    }

    #[test]
    fn test_last_seat_scenario() {
        let engine = PricingEngine::default();
        let before = input(150, 1, 10, DemandLevel::Medium);
        let after = before.with_available(0);

        assert!(close(engine.seat_factor(150, 0), 3.0));
        assert!(engine.price(&after, now()) > engine.price(&before, now()));
    }

    #[test]
    fn test_config_validation() {
        assert!(PricingConfig::default().validate().is_ok());

        let inverted = PricingConfig {
            min_multiplier: 3.0,
            max_multiplier: 0.8,
            ..Default::default()
        };
        assert_eq!(inverted.validate(), Err(PricingConfigError::ClampInverted));

        let mut falling = PricingConfig::default();
        falling.occupancy_curve[4].factor = 2.0;
        assert_eq!(falling.validate(), Err(PricingConfigError::OccupancyNotMonotonic));

        let mut unsorted = PricingConfig::default();
        unsorted.time_curve.swap(0, 1);
        assert_eq!(unsorted.validate(), Err(PricingConfigError::CurveUnsorted("time")));
    }
}
