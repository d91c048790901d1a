use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use skyfare_core::DemandLevel;

/// Relative likelihood of each level when the market shifts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemandWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for DemandWeights {
    fn default() -> Self {
        Self {
            low: 0.2,
            medium: 0.5,
            high: 0.2,
            very_high: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DemandError {
    #[error("Invalid demand weights: {0}")]
    InvalidWeights(String),

    #[error("Shift probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
}

/// Draws new demand levels for the market-shift job.
#[derive(Debug, Clone)]
pub struct DemandSampler {
    index: WeightedIndex<f64>,
    shift_probability: f64,
}

impl DemandSampler {
    pub fn new(weights: &DemandWeights, shift_probability: f64) -> Result<Self, DemandError> {
        if !(0.0..=1.0).contains(&shift_probability) {
            return Err(DemandError::InvalidProbability(shift_probability));
        }
        let index = WeightedIndex::new([weights.low, weights.medium, weights.high, weights.very_high])
            .map_err(|e| DemandError::InvalidWeights(e.to_string()))?;
        Ok(Self {
            index,
            shift_probability,
        })
    }

    pub fn shift_probability(&self) -> f64 {
        self.shift_probability
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> DemandLevel {
        DemandLevel::ALL[self.index.sample(rng)]
    }

    /// `Some(new level)` with probability `shift_probability`, otherwise `None`.
    pub fn maybe_shift<R: Rng>(&self, rng: &mut R) -> Option<DemandLevel> {
        if rng.gen_bool(self.shift_probability) {
            Some(self.sample(rng))
        } else {
            None
        }
    }
}
