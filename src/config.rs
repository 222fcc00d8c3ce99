//! Scorer configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `REQUEST_SCORER__`. Nested keys use a
//! double underscore, e.g. `REQUEST_SCORER__WEIGHTS__AGE=0.5`.
//!
//! ```toml
//! max_tracked_keys = 10000
//! histogram_bins = 20
//!
//! [weights]
//! speed = 0.25
//! age = 0.25
//! percentile = 1.0
//! ```

use crate::error::{Result, ScorerError};
use crate::histogram::DEFAULT_MAX_BINS;
use crate::scoring::weights::ScoreWeights;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "REQUEST_SCORER";

/// Default cap on scopes tracked by the recency map
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

/// Request scorer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Maximum scopes with a recorded store time (0 = unbounded)
    pub max_tracked_keys: usize,

    /// Centroid bins per scope histogram
    pub histogram_bins: usize,

    /// Signal weights
    pub weights: ScoreWeights,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            histogram_bins: DEFAULT_MAX_BINS,
            weights: ScoreWeights::default(),
        }
    }
}

impl ScorerConfig {
    /// Load defaults, an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading scorer config from {}", path.display());
            builder = builder
                .add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ScorerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file, without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ScorerConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ScorerError::InvalidConfig(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if self.histogram_bins == 0 {
            return Err(ScorerError::InvalidConfig(
                "histogram_bins must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Recency map capacity, `None` when unbounded
    pub fn key_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.max_tracked_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use tempfile::Builder;

    const AGE_VAR: &str = "REQUEST_SCORER__WEIGHTS__AGE";
    const KEYS_VAR: &str = "REQUEST_SCORER__MAX_TRACKED_KEYS";

    fn clear_env() {
        env::remove_var(AGE_VAR);
        env::remove_var(KEYS_VAR);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ScorerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_tracked_keys, 10_000);
        assert_eq!(config.key_capacity(), NonZeroUsize::new(10_000));
    }

    #[test]
    fn test_zero_keys_means_unbounded() {
        let config = ScorerConfig {
            max_tracked_keys: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.key_capacity(), None);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ScorerConfig::from_toml("[weights]\nage = 0.5\n").unwrap();
        assert_eq!(config.weights.age, 0.5);
        assert_eq!(config.weights.speed, 0.25);
        assert_eq!(config.weights.percentile, 1.0);
        assert_eq!(config.histogram_bins, 20);
    }

    #[test]
    fn test_validate_zero_bins() {
        let result = ScorerConfig::from_toml("histogram_bins = 0\n");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("histogram_bins must be at least 1"));
    }

    #[test]
    fn test_validate_negative_weight() {
        let result = ScorerConfig::from_toml("[weights]\nspeed = -1.0\n");
        assert!(matches!(result, Err(ScorerError::InvalidConfig(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ScorerConfig::default();
        config.weights.percentile = 2.0;
        config.max_tracked_keys = 500;

        let rendered = config.to_toml().unwrap();
        assert_eq!(ScorerConfig::from_toml(&rendered).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_sources() {
        clear_env();
        let config = ScorerConfig::load(None).unwrap();
        assert_eq!(config, ScorerConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_file_then_env() {
        clear_env();
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_tracked_keys = 64\n\n[weights]\nage = 0.75\nspeed = 0.5").unwrap();

        let config = ScorerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_tracked_keys, 64);
        assert_eq!(config.weights.age, 0.75);
        assert_eq!(config.weights.speed, 0.5);

        env::set_var(AGE_VAR, "1.5");
        let config = ScorerConfig::load(Some(file.path())).unwrap();
        clear_env();

        assert_eq!(config.weights.age, 1.5);
        assert_eq!(config.weights.speed, 0.5);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_env() {
        clear_env();
        env::set_var(AGE_VAR, "-2.0");
        let result = ScorerConfig::load(None);
        clear_env();

        assert!(matches!(result, Err(ScorerError::InvalidConfig(_))));
    }

    #[test]
    #[serial]
    fn test_load_missing_file() {
        clear_env();
        let result = ScorerConfig::load(Some(Path::new("/nonexistent/scorer.toml")));
        assert!(matches!(result, Err(ScorerError::Config(_))));
    }
}
