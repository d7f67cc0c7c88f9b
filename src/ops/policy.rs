// ============================================================================
// Evaluation Policies
// Error-propagation and resampling modes selected by the caller
// ============================================================================

use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How error estimates combine under a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorMode {
    /// Square root of the sum of squares (uncorrelated inputs)
    #[default]
    Independent,
    /// Sum of absolute magnitudes (conservative bound)
    Dependent,
    /// Skip propagation; results carry no estimate
    NoErrors,
}

/// How a field is evaluated at positions between its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SamplingMode {
    /// Take the closest sample's packed code unchanged
    NearestNeighbor,
    /// Interpolate between neighbouring samples
    #[default]
    WeightedAverage,
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(ErrorMode::Independent),
            "dependent" => Ok(ErrorMode::Dependent),
            "none" | "no_errors" => Ok(ErrorMode::NoErrors),
            other => Err(format!("unknown error mode '{other}'")),
        }
    }
}

impl FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" | "nearest_neighbor" => Ok(SamplingMode::NearestNeighbor),
            "weighted" | "weighted_average" => Ok(SamplingMode::WeightedAverage),
            other => Err(format!("unknown sampling mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("Dependent".parse::<ErrorMode>().unwrap(), ErrorMode::Dependent);
        assert_eq!("none".parse::<ErrorMode>().unwrap(), ErrorMode::NoErrors);
        assert_eq!(
            "nearest".parse::<SamplingMode>().unwrap(),
            SamplingMode::NearestNeighbor
        );
        assert!("cubic".parse::<SamplingMode>().is_err());
    }
}
