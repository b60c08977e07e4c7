//! Model builder configuration types.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the finite model search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FmbConfig {
    /// Domain size every sort starts from
    pub start_size: u32,
    pub enumeration_strategy: EnumerationStrategy,
    /// Fraction of a sort's size used as the canonicity window
    pub symmetry_ratio: f32,
    pub widget_order: WidgetOrder,
    pub symbol_order: SymbolOrder,
    /// Bound sorts without non-constant functions by their constant count
    pub detect_sort_bounds: bool,
    /// Remember popped nogood generators instead of discarding them
    pub keep_old_generators: bool,
    /// Every `size_weight_ratio + 1`-th contour step weighs sorts by raw size
    pub size_weight_ratio: u32,
    #[serde(with = "duration_secs")]
    pub time_limit: Duration,
}

/// How the next candidate size vector is chosen after an UNSAT round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationStrategy {
    /// Priority queue of nogood generators ordered by clause count
    #[default]
    NogoodPriority,
    /// Integer constraint search minimizing the sum of sizes
    ConstraintSolver,
    /// Marker-per-size encoding; grow one sort from the failed markers
    Contour,
}

/// Ranking of grounded terms used by symmetry breaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetOrder {
    /// Each function across all sizes, then the next function
    #[default]
    FunctionFirst,
    /// For each size, every function with all arguments set to that size
    ArgumentFirst,
    /// Arguments walk the diagonal `1 + ((size + index) mod n)`
    Diagonal,
}

/// Ordering of constants and functions inside each sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolOrder {
    /// First-occurrence order, usage counted on the flattened clauses
    #[default]
    Occurrence,
    /// Usage counted on the flattened clauses, most used first
    Usage,
    /// Usage counts supplied by preprocessing, most used first
    PreprocessedUsage,
}

impl Default for FmbConfig {
    fn default() -> Self {
        FmbConfig {
            start_size: 1,
            enumeration_strategy: EnumerationStrategy::default(),
            symmetry_ratio: 1.0,
            widget_order: WidgetOrder::default(),
            symbol_order: SymbolOrder::default(),
            detect_sort_bounds: false,
            keep_old_generators: false,
            size_weight_ratio: 1,
            time_limit: Duration::from_secs(60),
        }
    }
}

impl FmbConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_size == 0 {
            return Err(ConfigError::ZeroStartSize);
        }
        if !self.symmetry_ratio.is_finite() || self.symmetry_ratio < 0.0 {
            return Err(ConfigError::InvalidSymmetryRatio(self.symmetry_ratio));
        }
        Ok(())
    }

    /// Read a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: FmbConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("time limit must be non-negative"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FmbConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_size, 1);
        assert_eq!(config.enumeration_strategy, EnumerationStrategy::NogoodPriority);
    }

    #[test]
    fn test_partial_json() {
        let config = FmbConfig::from_json_str(
            r#"{"start_size": 2, "enumeration_strategy": "contour", "time_limit": 1.5}"#,
        )
        .unwrap();
        assert_eq!(config.start_size, 2);
        assert_eq!(config.enumeration_strategy, EnumerationStrategy::Contour);
        assert_eq!(config.time_limit, Duration::from_millis(1500));
        assert_eq!(config.widget_order, WidgetOrder::FunctionFirst);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            FmbConfig::from_json_str(r#"{"start_size": 0}"#),
            Err(ConfigError::ZeroStartSize)
        ));
        assert!(matches!(
            FmbConfig::from_json_str(r#"{"symmetry_ratio": -1.0}"#),
            Err(ConfigError::InvalidSymmetryRatio(_))
        ));
        assert!(matches!(
            FmbConfig::from_json_str("{not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
