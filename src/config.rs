use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::predictor::PredictorSettings;
use crate::tiering::{ScoringWeights, TierThresholds};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 100.0;
pub const DEFAULT_CATEGORY: &str = "OC";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime configuration. Paths and request defaults come from the
/// environment; algorithm constants keep their `Default` values.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    pub search_radius_km: f64,
    /// Category used when a request names none, and the threshold fallback.
    pub default_category: String,
    pub predictor: PredictorSettings,
    pub tiers: TierThresholds,
    pub weights: ScoringWeights,
    pub telemetry: TelemetryConfig,
}

/// Tracing controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            default_category: DEFAULT_CATEGORY.to_string(),
            predictor: PredictorSettings::default(),
            tiers: TierThresholds::default(),
            weights: ScoringWeights::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("ENGINE_SEARCH_RADIUS_KM must be positive, got {0}")]
    NonPositiveRadius(f64),
    #[error("ENGINE_DEFAULT_POOL_SIZE must be positive")]
    ZeroPoolSize,
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl EngineConfig {
    /// Read `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("ENGINE_DATA_DIR") {
            config.data_dir = PathBuf::from(non_empty("ENGINE_DATA_DIR", dir)?);
        }
        if let Some(dir) = lookup("ENGINE_MODEL_DIR") {
            config.model_dir = PathBuf::from(non_empty("ENGINE_MODEL_DIR", dir)?);
        }
        if let Some(raw) = lookup("ENGINE_SEARCH_RADIUS_KM") {
            let radius: f64 = parse_number("ENGINE_SEARCH_RADIUS_KM", &raw)?;
            if !radius.is_finite() || radius <= 0.0 {
                return Err(ConfigError::NonPositiveRadius(radius));
            }
            config.search_radius_km = radius;
        }
        if let Some(category) = lookup("ENGINE_DEFAULT_CATEGORY") {
            config.default_category = non_empty("ENGINE_DEFAULT_CATEGORY", category)?.to_uppercase();
        }
        if let Some(raw) = lookup("ENGINE_DEFAULT_POOL_SIZE") {
            let pool: u64 = parse_number("ENGINE_DEFAULT_POOL_SIZE", &raw)?;
            if pool == 0 {
                return Err(ConfigError::ZeroPoolSize);
            }
            config.predictor.default_pool_size = pool;
        }
        if let Some(level) = lookup("ENGINE_LOG_LEVEL") {
            config.telemetry.log_level = non_empty("ENGINE_LOG_LEVEL", level)?;
        }

        Ok(config)
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(key));
    }
    Ok(trimmed.to_string())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = EngineConfig::from_lookup(lookup(&[])).expect("defaults load");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.search_radius_km, 100.0);
        assert_eq!(config.default_category, "OC");
        assert_eq!(config.predictor.default_pool_size, 200_000);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("ENGINE_DATA_DIR", "/srv/data"),
            ("ENGINE_SEARCH_RADIUS_KM", "42.5"),
            ("ENGINE_DEFAULT_CATEGORY", "bc"),
            ("ENGINE_DEFAULT_POOL_SIZE", "150000"),
        ]))
        .expect("config loads");
        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.search_radius_km, 42.5);
        assert_eq!(config.default_category, "BC");
        assert_eq!(config.predictor.default_pool_size, 150_000);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = EngineConfig::from_lookup(lookup(&[("ENGINE_SEARCH_RADIUS_KM", "far")]))
            .expect_err("radius must parse");
        assert!(matches!(err, ConfigError::InvalidNumber { key: "ENGINE_SEARCH_RADIUS_KM", .. }));

        let err = EngineConfig::from_lookup(lookup(&[("ENGINE_SEARCH_RADIUS_KM", "0")]))
            .expect_err("radius must be positive");
        assert_eq!(err, ConfigError::NonPositiveRadius(0.0));

        let err = EngineConfig::from_lookup(lookup(&[("ENGINE_DEFAULT_POOL_SIZE", "0")]))
            .expect_err("pool must be positive");
        assert_eq!(err, ConfigError::ZeroPoolSize);
    }

    #[test]
    fn from_env_reads_process_environment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::set_var("ENGINE_MODEL_DIR", "/tmp/engine-models");
        let config = EngineConfig::from_env().expect("config loads");
        env::remove_var("ENGINE_MODEL_DIR");
        assert_eq!(config.model_dir, PathBuf::from("/tmp/engine-models"));
    }
}
