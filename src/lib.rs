//! Request Scorer - interestingness ranking for sampled request traces
//!
//! A monitoring agent sees far more completed requests than it can keep in
//! detail. This crate gives each request a comparable score so the caller can
//! keep the most interesting ones within its budget:
//! - Speed: slow requests score higher, logarithmically dampened
//! - Percentile: requests that are slow *for their scope* score higher
//! - Age: scopes that have not been stored for a while score higher
//!
//! # Architecture
//!
//! - **Types**: `ScopeKey`, the `ScoredRequest` trait, `RequestRecord`
//! - **Scoring**: `RequestScorer` and its weights, clock and recency map
//! - **Histogram**: the `PercentileProvider` seam and an in-process implementation
//! - **Config**: layered TOML/environment configuration
//!
//! # Example
//!
//! ```
//! use request_scorer::{RequestHistograms, RequestRecord, RequestScorer};
//! use std::sync::Arc;
//!
//! let histograms = Arc::new(RequestHistograms::default());
//! let scorer = RequestScorer::new(histograms.clone());
//!
//! let request = RequestRecord::named("Controller/users/index", 1.2).unwrap();
//! histograms.add("Controller/users/index", 1.2);
//!
//! let score = scorer.score(&request);
//! assert!(score >= 0.0);
//!
//! // The caller decided to keep this one
//! scorer.stored(&request);
//! ```

pub mod config;
pub mod error;
pub mod histogram;
pub mod scoring;
pub mod types;

// Re-export commonly used types
pub use crate::config::ScorerConfig;
pub use error::{Result, ScorerError};
pub use histogram::{ApproximateHistogram, PercentileProvider, RequestHistograms};
pub use scoring::{
    Clock, ManualClock, RequestScorer, ScoreBreakdown, ScoreWeights, SystemClock, UNKNOWN_SCORE,
};
pub use types::{RequestRecord, ScopeKey, ScoredRequest};
