//! Request scorer
//!
//! Ranks completed requests by how interesting they are to keep in detail.
//! The score is a local estimate only; candidates from separate processes are
//! reconciled elsewhere, so a high local score does not guarantee retention.

use super::clock::{Clock, SystemClock};
use super::recency::LastSeen;
use super::weights::{ScoreBreakdown, ScoreWeights};
use crate::config::ScorerConfig;
use crate::error::Result;
use crate::histogram::PercentileProvider;
use crate::types::{ScopeKey, ScoredRequest};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Scores requests and tracks when each scope was last stored
///
/// `score` only reads the recency map; `stored` is the single mutator. Safe to
/// share across threads behind an `Arc`.
pub struct RequestScorer {
    percentiles: Arc<dyn PercentileProvider>,
    clock: Arc<dyn Clock>,
    weights: ScoreWeights,
    zero_time: DateTime<Utc>,
    last_seen: RwLock<LastSeen>,
}

impl RequestScorer {
    /// Create a scorer with default weights and the system clock
    pub fn new(percentiles: Arc<dyn PercentileProvider>) -> Self {
        Self::with_clock(percentiles, &ScorerConfig::default(), Arc::new(SystemClock))
    }

    /// Create a scorer from validated configuration
    pub fn from_config(
        percentiles: Arc<dyn PercentileProvider>,
        config: &ScorerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_clock(percentiles, config, Arc::new(SystemClock)))
    }

    /// Create a scorer with an explicit time source
    pub fn with_clock(
        percentiles: Arc<dyn PercentileProvider>,
        config: &ScorerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let zero_time = clock.now();
        debug!(
            "Request scorer started at {} (weights: {:?}, max tracked keys: {:?})",
            zero_time, config.weights, config.max_tracked_keys
        );

        Self {
            percentiles,
            clock,
            weights: config.weights,
            zero_time,
            last_seen: RwLock::new(LastSeen::with_capacity(config.key_capacity())),
        }
    }

    /// Score a request
    ///
    /// Requests without a resolvable scope always get `UNKNOWN_SCORE`.
    pub fn score<R: ScoredRequest + ?Sized>(&self, request: &R) -> f64 {
        self.score_breakdown(request).total
    }

    /// Score a request, keeping each signal's contribution
    pub fn score_breakdown<R: ScoredRequest + ?Sized>(&self, request: &R) -> ScoreBreakdown {
        let key = ScopeKey::of(request);
        if key.is_unknown() {
            trace!("Request has no scope, using sentinel score");
            return ScoreBreakdown::unknown();
        }

        let duration_secs = request.total_duration().as_secs_f64();
        let age_secs = seconds(self.age_of(&key));
        let percentile = self
            .percentiles
            .approximate_percentile_of(key.as_str(), duration_secs);

        let breakdown = ScoreBreakdown::new(
            key,
            self.weights.speed_score(duration_secs),
            self.weights.percentile_score(percentile),
            self.weights.age_score(age_secs),
        );

        debug!(
            scope = %breakdown.key,
            duration_secs,
            percentile,
            age_secs,
            score = breakdown.total,
            "Scored request"
        );
        breakdown
    }

    /// Record that a request was kept for detailed analysis
    pub fn stored<R: ScoredRequest + ?Sized>(&self, request: &R) {
        let key = ScopeKey::of(request);
        let now = self.clock.now();
        let stamp = self.write_last_seen().record(key.clone(), now);
        trace!("Marked {} as stored at {}", key, stamp);
    }

    /// Time since `key` was last stored, or since scorer start if never
    ///
    /// Never negative, even when the clock has stepped backwards.
    pub fn age_of(&self, key: &ScopeKey) -> Duration {
        let last = self.read_last_seen().get_or(key, self.zero_time);
        let age = self.clock.now().signed_duration_since(last);
        age.max(Duration::zero())
    }

    /// Explicitly recorded store time for `key`
    pub fn last_seen(&self, key: &ScopeKey) -> Option<DateTime<Utc>> {
        self.read_last_seen().get(key)
    }

    /// Number of scopes with a recorded store time
    pub fn tracked_keys(&self) -> usize {
        self.read_last_seen().len()
    }

    /// When this scorer was created
    pub fn zero_time(&self) -> DateTime<Utc> {
        self.zero_time
    }

    /// Time since this scorer was created
    pub fn uptime(&self) -> Duration {
        self.clock
            .now()
            .signed_duration_since(self.zero_time)
            .max(Duration::zero())
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    fn read_last_seen(&self) -> RwLockReadGuard<'_, LastSeen> {
        self.last_seen.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_last_seen(&self) -> RwLockWriteGuard<'_, LastSeen> {
        self.last_seen.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn seconds(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => duration.num_seconds() as f64,
    }
}

impl std::fmt::Debug for RequestScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScorer")
            .field("weights", &self.weights)
            .field("zero_time", &self.zero_time)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}
