//! Core data types for request scoring
//!
//! Defines the classification key that identifies a category of requests, the
//! trait a completed request must implement to be scored, and a plain record
//! type used by the CLI and tests.

use crate::error::{Result, ScorerError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name used for requests whose scope cannot be resolved
pub const UNKNOWN_SCOPE: &str = "unknown";

/// Classification key for a category of requests
///
/// Usually the legacy name of the request's scope layer (e.g. an endpoint
/// name). Requests without a resolvable scope share the `Unknown` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKey {
    /// A resolved scope name
    Named(String),

    /// No scope could be derived
    Unknown,
}

impl ScopeKey {
    /// Build a key from an optional scope name
    ///
    /// Blank names are treated the same as a missing scope.
    pub fn from_scope(scope: Option<&str>) -> Self {
        match scope {
            Some(name) if !name.trim().is_empty() => ScopeKey::Named(name.to_string()),
            _ => ScopeKey::Unknown,
        }
    }

    /// Derive the key for a request
    pub fn of<R: ScoredRequest + ?Sized>(request: &R) -> Self {
        Self::from_scope(request.scope_name())
    }

    /// Check if this is the unknown sentinel
    pub fn is_unknown(&self) -> bool {
        matches!(self, ScopeKey::Unknown)
    }

    /// Key as passed to percentile providers
    pub fn as_str(&self) -> &str {
        match self {
            ScopeKey::Named(name) => name,
            ScopeKey::Unknown => UNKNOWN_SCOPE,
        }
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed request that can be scored
pub trait ScoredRequest {
    /// Stable legacy name of the request's scope layer, if one exists
    fn scope_name(&self) -> Option<&str>;

    /// Total elapsed time of the request
    fn total_duration(&self) -> Duration;
}

impl<R: ScoredRequest + ?Sized> ScoredRequest for &R {
    fn scope_name(&self) -> Option<&str> {
        (**self).scope_name()
    }

    fn total_duration(&self) -> Duration {
        (**self).total_duration()
    }
}

/// Plain request record
///
/// One line of a request log: scope name and duration in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Scope layer name, absent when unresolved
    #[serde(default)]
    pub scope: Option<String>,

    /// Total duration in seconds
    pub duration: f64,
}

impl RequestRecord {
    /// Create a record, rejecting negative or non-finite durations
    pub fn new(scope: Option<String>, duration: f64) -> Result<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(ScorerError::InvalidDuration(duration));
        }
        Ok(Self { scope, duration })
    }

    /// Record for a named scope
    pub fn named(scope: impl Into<String>, duration: f64) -> Result<Self> {
        Self::new(Some(scope.into()), duration)
    }

    /// Record without a scope
    pub fn unscoped(duration: f64) -> Result<Self> {
        Self::new(None, duration)
    }

    /// Classification key of this record
    pub fn key(&self) -> ScopeKey {
        ScopeKey::of(self)
    }
}

impl ScoredRequest for RequestRecord {
    fn scope_name(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    fn total_duration(&self) -> Duration {
        // Deserialized records skip `new`: negative and NaN become zero, huge values saturate
        if self.duration.is_nan() || self.duration <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.duration).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_key_from_scope() {
        assert_eq!(
            ScopeKey::from_scope(Some("Controller/users/index")),
            ScopeKey::Named("Controller/users/index".to_string())
        );
        assert_eq!(ScopeKey::from_scope(None), ScopeKey::Unknown);
        assert_eq!(ScopeKey::from_scope(Some("")), ScopeKey::Unknown);
        assert_eq!(ScopeKey::from_scope(Some("   ")), ScopeKey::Unknown);
    }

    #[test]
    fn test_scope_key_display() {
        assert_eq!(ScopeKey::Unknown.to_string(), "unknown");
        assert_eq!(
            ScopeKey::Named("Job/mailer".to_string()).to_string(),
            "Job/mailer"
        );
        assert!(ScopeKey::Unknown.is_unknown());
        assert!(!ScopeKey::Named("x".to_string()).is_unknown());
    }

    #[test]
    fn test_record_rejects_bad_durations() {
        assert!(matches!(
            RequestRecord::named("a", -0.1),
            Err(ScorerError::InvalidDuration(_))
        ));
        assert!(RequestRecord::named("a", f64::NAN).is_err());
        assert!(RequestRecord::named("a", f64::INFINITY).is_err());
        assert!(RequestRecord::named("a", 0.0).is_ok());
    }

    #[test]
    fn test_record_deserialization() {
        let record: RequestRecord =
            serde_json::from_str(r#"{"scope": "Controller/home", "duration": 0.25}"#).unwrap();
        assert_eq!(record.key(), ScopeKey::Named("Controller/home".to_string()));
        assert_eq!(record.total_duration(), Duration::from_millis(250));

        let record: RequestRecord = serde_json::from_str(r#"{"duration": 1.0}"#).unwrap();
        assert!(record.key().is_unknown());
    }

    #[test]
    fn test_negative_deserialized_duration_is_zero() {
        let record: RequestRecord =
            serde_json::from_str(r#"{"scope": "a", "duration": -3.0}"#).unwrap();
        assert_eq!(record.total_duration(), Duration::ZERO);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let record = RequestRecord::named("a", 1e20).unwrap();
        assert_eq!(record.total_duration(), Duration::MAX);

        let shorter = RequestRecord::named("a", 1e19).unwrap();
        assert!(shorter.total_duration() <= record.total_duration());
        assert!(shorter.total_duration() > Duration::ZERO);
    }

    #[test]
    fn test_key_derivation_through_reference() {
        let record = RequestRecord::named("Controller/a", 1.0).unwrap();
        let by_ref: &RequestRecord = &record;
        assert_eq!(ScopeKey::of(&by_ref), record.key());
    }
}
