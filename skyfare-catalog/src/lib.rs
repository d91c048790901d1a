pub mod demand;
pub mod pricing;
pub mod schedule;
pub mod seating;

pub use demand::{DemandError, DemandSampler, DemandWeights};
pub use pricing::{CurvePoint, DemandFactors, PriceQuote, PricingConfig, PricingConfigError, PricingEngine, PricingInput};
pub use schedule::{ScheduleGenerator, SeedConfig};
pub use seating::{AllocationError, SeatAllocator, SeatState, SeatStatus};
