//! Score weights and per-signal breakdown
//!
//! A request's score is the sum of three weighted signals:
//! - Speed: `ln(1 + duration_secs)`, dampened so very slow requests do not dominate
//! - Percentile: rank of the duration within its scope's history, passed through linearly
//! - Age: minutes since the scope was last stored

use crate::error::{Result, ScorerError};
use crate::types::ScopeKey;
use serde::{Deserialize, Serialize};

/// Multiplier for the speed signal
pub const SPEED_WEIGHT: f64 = 0.25;

/// Multiplier for the age signal (per minute)
pub const AGE_WEIGHT: f64 = 0.25;

/// Multiplier for the percentile signal
pub const PERCENTILE_WEIGHT: f64 = 1.0;

/// Score returned for requests with no resolvable scope
///
/// Every computed score is non-negative for non-negative inputs, so this
/// always ranks last.
pub const UNKNOWN_SCORE: f64 = -1.0;

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Applied to `ln(1 + duration_secs)`
    pub speed: f64,

    /// Applied to age in minutes
    pub age: f64,

    /// Applied to the percentile value
    pub percentile: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            speed: SPEED_WEIGHT,
            age: AGE_WEIGHT,
            percentile: PERCENTILE_WEIGHT,
        }
    }
}

impl ScoreWeights {
    /// Weighted speed signal
    pub fn speed_score(&self, duration_secs: f64) -> f64 {
        (1.0 + duration_secs).ln() * self.speed
    }

    /// Weighted percentile signal
    pub fn percentile_score(&self, percentile: f64) -> f64 {
        percentile * self.percentile
    }

    /// Weighted age signal
    pub fn age_score(&self, age_secs: f64) -> f64 {
        (age_secs / 60.0) * self.age
    }

    /// Reject weights that would break score monotonicity
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("speed", self.speed),
            ("age", self.age),
            ("percentile", self.percentile),
        ] {
            if !value.is_finite() {
                return Err(ScorerError::InvalidConfig(format!(
                    "weights.{} must be finite",
                    name
                )));
            }
            if value < 0.0 {
                return Err(ScorerError::InvalidConfig(format!(
                    "weights.{} must not be negative",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Individual signal contributions for one scored request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub key: ScopeKey,
    pub speed: f64,
    pub percentile: f64,
    pub age: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Combine weighted signals
    pub fn new(key: ScopeKey, speed: f64, percentile: f64, age: f64) -> Self {
        Self {
            key,
            speed,
            percentile,
            age,
            total: speed + percentile + age,
        }
    }

    /// Fixed breakdown for the unknown scope
    pub fn unknown() -> Self {
        Self {
            key: ScopeKey::Unknown,
            speed: 0.0,
            percentile: 0.0,
            age: 0.0,
            total: UNKNOWN_SCORE,
        }
    }
}
