// ============================================================================
// Engine Configuration
// Defaults the field engine falls back to when a caller doesn't choose
// ============================================================================

use crate::error::{Result, UnitFieldError};
use crate::ops::{ErrorMode, SamplingMode};
use once_cell::sync::Lazy;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Floating Storage
// ============================================================================

/// Storage for range components without a discretization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FloatStorage {
    /// 64-bit floats
    #[default]
    Double,
    /// 32-bit floats, half the memory
    Float,
}

impl FromStr for FloatStorage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double" | "f64" => Ok(FloatStorage::Double),
            "float" | "f32" => Ok(FloatStorage::Float),
            other => Err(format!("unknown storage '{other}'")),
        }
    }
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Engine-wide defaults
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Storage used for undiscretized range components
    pub default_storage: FloatStorage,

    /// Resampling mode when none is given
    pub sampling_mode: SamplingMode,

    /// Error propagation when none is given
    pub error_mode: ErrorMode,

    /// Sample count from which per-component work runs on scoped threads
    pub parallel_threshold: usize,

    /// Neighbours used for derivatives over irregular domains
    pub derivative_neighbors: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<EngineConfig> = Lazy::new(|| match EngineConfig::from_env() {
    Ok(config) => config,
    Err(e) => {
        tracing::warn!(error = %e, "ignoring environment engine configuration");
        EngineConfig::new()
    }
});

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            default_storage: FloatStorage::Double,
            sampling_mode: SamplingMode::WeightedAverage,
            error_mode: ErrorMode::Independent,
            parallel_threshold: 65_536,
            derivative_neighbors: 6,
        }
    }

    /// Process-wide defaults, read from the environment on first use.
    pub fn global() -> &'static EngineConfig {
        &GLOBAL
    }

    /// Builder method: Set default floating storage
    pub fn with_storage(mut self, storage: FloatStorage) -> Self {
        self.default_storage = storage;
        self
    }

    /// Builder method: Set default resampling mode
    pub fn with_sampling_mode(mut self, mode: SamplingMode) -> Self {
        self.sampling_mode = mode;
        self
    }

    /// Builder method: Set default error propagation
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Builder method: Set the parallel dispatch threshold
    pub fn with_parallel_threshold(mut self, samples: usize) -> Self {
        self.parallel_threshold = samples;
        self
    }

    /// Builder method: Set irregular-derivative neighbour count
    pub fn with_derivative_neighbors(mut self, neighbors: usize) -> Self {
        self.derivative_neighbors = neighbors;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.derivative_neighbors < 2 {
            return Err("Derivative neighbours must be at least 2".to_string());
        }
        if self.parallel_threshold == 0 {
            return Err("Parallel threshold must be positive".to_string());
        }
        Ok(())
    }

    /// Defaults overridden by `UNITFIELD_*` environment variables.
    ///
    /// # Errors
    /// `Config` for an unparsable or invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn read<T: FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Result<Option<T>>
        where
            T::Err: std::fmt::Display,
        {
            match lookup(key) {
                None => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<T>()
                    .map(Some)
                    .map_err(|e| UnitFieldError::Config(format!("{key}={raw}: {e}"))),
            }
        }

        let mut config = Self::new();
        if let Some(v) = read(&lookup, "UNITFIELD_STORAGE")? {
            config.default_storage = v;
        }
        if let Some(v) = read(&lookup, "UNITFIELD_SAMPLING")? {
            config.sampling_mode = v;
        }
        if let Some(v) = read(&lookup, "UNITFIELD_ERRORS")? {
            config.error_mode = v;
        }
        if let Some(v) = read(&lookup, "UNITFIELD_PARALLEL_THRESHOLD")? {
            config.parallel_threshold = v;
        }
        if let Some(v) = read(&lookup, "UNITFIELD_DERIVATIVE_NEIGHBORS")? {
            config.derivative_neighbors = v;
        }
        config.validate().map_err(UnitFieldError::Config)?;
        Ok(config)
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

impl EngineConfig {
    /// Float storage for undiscretized components
    pub fn compact() -> Self {
        Self::new().with_storage(FloatStorage::Float)
    }

    /// Double storage, nearest-neighbour resampling, single-threaded
    pub fn exact() -> Self {
        Self::new()
            .with_storage(FloatStorage::Double)
            .with_sampling_mode(SamplingMode::NearestNeighbor)
            .with_parallel_threshold(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.default_storage, FloatStorage::Double);
        assert_eq!(config.sampling_mode, SamplingMode::WeightedAverage);
        assert_eq!(config.error_mode, ErrorMode::Independent);
        assert_eq!(config.parallel_threshold, 65_536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_presets() {
        let config = EngineConfig::new().with_derivative_neighbors(1);
        assert!(config.validate().is_err());
        assert_eq!(EngineConfig::compact().default_storage, FloatStorage::Float);
        let exact = EngineConfig::exact();
        assert_eq!(exact.sampling_mode, SamplingMode::NearestNeighbor);
        assert_eq!(exact.parallel_threshold, usize::MAX);
    }

    #[test]
    fn test_environment_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("UNITFIELD_STORAGE", "float"),
            ("UNITFIELD_ERRORS", "dependent"),
            ("UNITFIELD_PARALLEL_THRESHOLD", " 1024 "),
        ]))
        .unwrap();
        assert_eq!(config.default_storage, FloatStorage::Float);
        assert_eq!(config.error_mode, ErrorMode::Dependent);
        assert_eq!(config.parallel_threshold, 1024);
        assert_eq!(config.sampling_mode, SamplingMode::WeightedAverage);
    }

    #[test]
    fn test_environment_errors() {
        for pairs in [
            [("UNITFIELD_SAMPLING", "cubic")],
            [("UNITFIELD_PARALLEL_THRESHOLD", "lots")],
            [("UNITFIELD_DERIVATIVE_NEIGHBORS", "1")],
        ] {
            assert!(matches!(
                EngineConfig::from_lookup(lookup(&pairs)),
                Err(UnitFieldError::Config(_))
            ));
        }
    }
}
