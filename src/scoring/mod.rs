//! Request interestingness scoring
//!
//! Components:
//! - weights: signal weights, constants and per-signal breakdown
//! - clock: time sources (system and manual)
//! - recency: bounded last-stored map per scope
//! - scorer: `RequestScorer`, combining the three signals

pub mod clock;
pub mod recency;
pub mod scorer;
pub mod weights;

pub use clock::{Clock, ManualClock, SystemClock};
pub use recency::LastSeen;
pub use scorer::RequestScorer;
pub use weights::{
    ScoreBreakdown, ScoreWeights, AGE_WEIGHT, PERCENTILE_WEIGHT, SPEED_WEIGHT, UNKNOWN_SCORE,
};
