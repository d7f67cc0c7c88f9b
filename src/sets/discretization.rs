// ============================================================================
// Discretizations
// Finite ordered enumerations of representable range values
// ============================================================================

use crate::error::{Result, UnitFieldError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A finite, ordered set of values a range component may take.
///
/// Supplying one for a component lets the field engine store quantized
/// indices instead of floating values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Discretization {
    /// `count` evenly spaced values from `first` to `last` inclusive
    Linear { first: f64, last: f64, count: usize },
    /// The integers `0..count`
    Integer { count: usize },
    /// Strictly increasing explicit values
    Explicit(Vec<f64>),
}

impl Discretization {
    /// Evenly spaced values.
    ///
    /// # Errors
    /// `Discretization` for a zero count, non-finite bounds, or a
    /// single-value set whose bounds differ.
    pub fn linear(first: f64, last: f64, count: usize) -> Result<Self> {
        if count == 0 || !first.is_finite() || !last.is_finite() {
            return Err(UnitFieldError::discretization(format!(
                "invalid linear discretization {first}..{last} x {count}"
            )));
        }
        if count == 1 && first != last {
            return Err(UnitFieldError::discretization(
                "single-value linear discretization needs first == last",
            ));
        }
        Ok(Discretization::Linear { first, last, count })
    }

    pub fn integer(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(UnitFieldError::discretization("integer discretization needs count > 0"));
        }
        Ok(Discretization::Integer { count })
    }

    /// Explicit values; must be finite and strictly increasing.
    pub fn explicit(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return Err(UnitFieldError::discretization(
                "explicit discretization needs finite values",
            ));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(UnitFieldError::discretization(
                "explicit discretization must be strictly increasing",
            ));
        }
        Ok(Discretization::Explicit(values))
    }

    /// Number of representable values
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Discretization::Linear { count, .. } | Discretization::Integer { count } => *count,
            Discretization::Explicit(values) => values.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spacing between consecutive values (mean spacing for explicit sets).
    pub fn step(&self) -> f64 {
        match self {
            Discretization::Linear { first, last, count } => {
                if *count > 1 {
                    (last - first) / (*count - 1) as f64
                } else {
                    0.0
                }
            }
            Discretization::Integer { .. } => 1.0,
            Discretization::Explicit(values) => {
                if values.len() > 1 {
                    (values[values.len() - 1] - values[0]) / (values.len() - 1) as f64
                } else {
                    0.0
                }
            }
        }
    }

    /// The value with the given index.
    ///
    /// # Errors
    /// `Discretization` when `index >= len()`.
    pub fn value_at(&self, index: usize) -> Result<f64> {
        if index >= self.len() {
            return Err(UnitFieldError::discretization(format!(
                "index {index} outside discretization of length {}",
                self.len()
            )));
        }
        Ok(match self {
            Discretization::Linear { first, .. } => first + index as f64 * self.step(),
            Discretization::Integer { .. } => index as f64,
            Discretization::Explicit(values) => values[index],
        })
    }

    /// Index of the representable value nearest to `value`; `None` for NaN.
    ///
    /// # Errors
    /// `Discretization` when `value` lies more than half a step outside the
    /// enumerated values.
    pub fn index_of(&self, value: f64) -> Result<Option<usize>> {
        if value.is_nan() {
            return Ok(None);
        }
        let out_of_range = || {
            UnitFieldError::discretization(format!("value {value} outside discretization {self:?}"))
        };
        match self {
            Discretization::Linear { first, count, .. } => {
                let step = self.step();
                let position = if step == 0.0 {
                    if value == *first {
                        0.0
                    } else {
                        return Err(out_of_range());
                    }
                } else {
                    ((value - first) / step + 0.5).floor()
                };
                if position < 0.0 || position >= *count as f64 {
                    return Err(out_of_range());
                }
                Ok(Some(position as usize))
            }
            Discretization::Integer { count } => {
                let position = (value + 0.5).floor();
                if position < 0.0 || position >= *count as f64 {
                    return Err(out_of_range());
                }
                Ok(Some(position as usize))
            }
            Discretization::Explicit(values) => {
                let n = values.len();
                if n == 1 {
                    return if value == values[0] { Ok(Some(0)) } else { Err(out_of_range()) };
                }
                let low = values[0] - 0.5 * (values[1] - values[0]);
                let high = values[n - 1] + 0.5 * (values[n - 1] - values[n - 2]);
                if value < low || value >= high {
                    return Err(out_of_range());
                }
                let upper = values.partition_point(|v| *v < value);
                let index = if upper == 0 {
                    0
                } else if upper == n {
                    n - 1
                } else if value - values[upper - 1] < values[upper] - value {
                    upper - 1
                } else {
                    upper
                };
                Ok(Some(index))
            }
        }
    }
}
