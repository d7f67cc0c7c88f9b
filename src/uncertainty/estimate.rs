// ============================================================================
// Error Estimates
// Mean/half-width uncertainty records and their propagation through operators
// ============================================================================
//
// The propagation formulas are first-order: each operand contributes its
// error magnitude times the partial derivative of the operator at the
// operands' means. Derivatives are clamped into [0.01, 100] so that a mean
// near a singularity does not explode the estimate.
// ============================================================================

use crate::error::Result;
use crate::ops::{BinaryOp, ErrorMode, UnaryOp, DEGREES_TO_RADIANS, RADIANS_TO_DEGREES};
use crate::units::Unit;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DERIVATIVE_LOW_LIMIT: f64 = 0.01;
const DERIVATIVE_HI_LIMIT: f64 = 1.0 / DERIVATIVE_LOW_LIMIT;

#[inline]
fn clamp_derivative(factor: f64) -> f64 {
    let factor = if factor.is_nan() { 1.0 } else { factor };
    factor.clamp(DERIVATIVE_LOW_LIMIT, DERIVATIVE_HI_LIMIT)
}

#[inline]
fn floor_derivative(factor: f64) -> f64 {
    DERIVATIVE_LOW_LIMIT.max(factor.abs())
}

/// Combine two error terms under `mode`.
///
/// Independent terms add in quadrature, dependent ones linearly, so the
/// independent result never exceeds the dependent one.
#[inline]
pub fn combine_errors(am: f64, bm: f64, mode: ErrorMode) -> f64 {
    match mode {
        ErrorMode::Independent => (am * am + bm * bm).sqrt(),
        ErrorMode::Dependent => am.abs() + bm.abs(),
        ErrorMode::NoErrors => f64::NAN,
    }
}

/// An immutable (mean, error, unit) uncertainty record.
///
/// `count` is the number of non-missing values that went into the mean. A
/// NaN error marks the estimate as missing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorEstimate {
    mean: f64,
    error: f64,
    count: u64,
    unit: Option<Unit>,
}

impl ErrorEstimate {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Estimate for a single value with a known half-width.
    pub fn new(value: f64, error: f64, unit: Option<Unit>) -> Self {
        if value.is_nan() {
            return Self::missing(unit);
        }
        Self {
            mean: value,
            error: error.abs(),
            count: 1,
            unit,
        }
    }

    /// Estimate with an explicit sample count.
    pub fn with_count(mean: f64, error: f64, count: u64, unit: Option<Unit>) -> Self {
        if mean.is_nan() || error.is_nan() || count == 0 {
            return Self::missing(unit);
        }
        Self {
            mean,
            error: error.abs(),
            count,
            unit,
        }
    }

    pub fn missing(unit: Option<Unit>) -> Self {
        Self {
            mean: f64::NAN,
            error: f64::NAN,
            count: 0,
            unit,
        }
    }

    /// Estimate for a column of values sharing one half-width; the mean is
    /// taken over the non-missing entries.
    pub fn from_values(values: &[f64], error: f64, unit: Option<Unit>) -> Self {
        match mean_of(values.iter().copied()) {
            Some((mean, count)) => Self::with_count(mean, error, count, unit),
            None => Self::missing(unit),
        }
    }

    /// Single-precision variant of [`ErrorEstimate::from_values`].
    pub fn from_floats(values: &[f32], error: f64, unit: Option<Unit>) -> Self {
        match mean_of(values.iter().map(|v| f64::from(*v))) {
            Some((mean, count)) => Self::with_count(mean, error, count, unit),
            None => Self::missing(unit),
        }
    }

    /// Estimate for the result `value` of `a op b`.
    pub fn from_binary(
        value: f64,
        unit: Option<Unit>,
        op: BinaryOp,
        a: &ErrorEstimate,
        b: &ErrorEstimate,
        mode: ErrorMode,
    ) -> Result<Self> {
        if value.is_nan() {
            return Ok(Self::missing(unit));
        }
        let error = binary_error(op, value, a, b, mode)?;
        Ok(Self::with_count(value, error, 1, unit))
    }

    /// Estimate for a column of results of `a op b`.
    pub fn from_binary_values(
        values: &[f64],
        unit: Option<Unit>,
        op: BinaryOp,
        a: &ErrorEstimate,
        b: &ErrorEstimate,
        mode: ErrorMode,
    ) -> Result<Self> {
        match mean_of(values.iter().copied()) {
            Some((mean, count)) => {
                let error = binary_error(op, mean, a, b, mode)?;
                Ok(Self::with_count(mean, error, count, unit))
            }
            None => Ok(Self::missing(unit)),
        }
    }

    /// Estimate for the result `value` of `op(a)`.
    pub fn from_unary(
        value: f64,
        unit: Option<Unit>,
        op: UnaryOp,
        a: &ErrorEstimate,
        mode: ErrorMode,
    ) -> Self {
        if value.is_nan() {
            return Self::missing(unit);
        }
        let error = unary_error(op, value, a, mode);
        Self::with_count(value, error, 1, unit)
    }

    /// Estimate for a column of results of `op(a)`.
    pub fn from_unary_values(
        values: &[f64],
        unit: Option<Unit>,
        op: UnaryOp,
        a: &ErrorEstimate,
        mode: ErrorMode,
    ) -> Self {
        match mean_of(values.iter().copied()) {
            Some((mean, count)) => {
                let error = unary_error(op, mean, a, mode);
                Self::with_count(mean, error, count, unit)
            }
            None => Self::missing(unit),
        }
    }

    /// Fold one sample's estimate into a running field estimate, weighting
    /// by the number of values each side represents.
    pub fn merge_sample(
        field: Option<&ErrorEstimate>,
        sample: Option<&ErrorEstimate>,
        value: f64,
        increment: u64,
    ) -> Result<Self> {
        let (fe, fm, nf, fu) = match field {
            Some(f) => (f.error, f.mean, f.count, f.unit.clone()),
            None => (f64::NAN, f64::NAN, 0, None),
        };
        let ns = if value.is_nan() { 0 } else { 1 };
        let (es, ms, su) = match sample {
            None => (f64::NAN, f64::NAN, None),
            Some(s) => match (&fu, &s.unit) {
                (Some(to), Some(from)) if to != from => (
                    s.error * to.derivative_factor(from)?.abs(),
                    to.to_this(value, from)?,
                    s.unit.clone(),
                ),
                _ => (s.error, value, s.unit.clone()),
            },
        };

        let unit = if field.is_some() { fu } else { su };
        let count = nf + increment;
        if count == 0 {
            return Ok(Self::missing(unit));
        }
        let mut error = 0.0;
        let mut mean = 0.0;
        if !fe.is_nan() {
            error += nf as f64 * fe;
        }
        if !fm.is_nan() {
            mean += nf as f64 * fm;
        }
        if !es.is_nan() {
            error += ns as f64 * es;
        }
        if !ms.is_nan() {
            mean += ns as f64 * ms;
        }
        Ok(Self {
            mean: mean / count as f64,
            error: error / count as f64,
            count,
            unit,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.error.is_nan()
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Half-width of the uncertainty band
    #[inline]
    pub fn error_value(&self) -> f64 {
        self.error
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Re-express in `target`. The mean is converted; the half-width is
    /// scaled by the derivative of the conversion, so offsets cancel.
    pub fn convert_to(&self, target: &Unit) -> Result<Self> {
        let from = match &self.unit {
            Some(u) => u,
            None => {
                return Ok(Self {
                    unit: Some(target.clone()),
                    ..self.clone()
                })
            }
        };
        let factor = target.derivative_factor(from)?;
        Ok(Self {
            mean: target.to_this(self.mean, from)?,
            error: self.error * factor.abs(),
            count: self.count,
            unit: Some(target.clone()),
        })
    }

    /// Same mean and count, replaced half-width.
    pub fn with_error(&self, error: f64) -> Self {
        Self {
            error: error.abs(),
            ..self.clone()
        }
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<(f64, u64)> {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| (sum / count as f64, count))
}

// ============================================================================
// Propagation
// ============================================================================

/// Propagated half-width for `a op b` whose result mean is `mean`.
///
/// Returns NaN when either input is missing or `mode` is `NoErrors`. When
/// the operands carry different units, `b` is first re-expressed in `a`'s.
pub fn binary_error(
    op: BinaryOp,
    mean: f64,
    a: &ErrorEstimate,
    b: &ErrorEstimate,
    mode: ErrorMode,
) -> Result<f64> {
    if a.is_missing() || b.is_missing() || mode == ErrorMode::NoErrors {
        return Ok(f64::NAN);
    }
    let (b_mean, b_error) = match (&a.unit, &b.unit) {
        (Some(au), Some(bu)) if au != bu => (
            au.to_this(b.mean, bu)?,
            (au.to_this(b.mean + 0.5 * b.error, bu)? - au.to_this(b.mean - 0.5 * b.error, bu)?)
                .abs(),
        ),
        _ => (b.mean, b.error),
    };

    let (am, bm) = match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::InvSubtract
        | BinaryOp::Max
        | BinaryOp::Min => (a.error, b_error),
        BinaryOp::Multiply => (a.error * b_mean, b_error * b_mean),
        BinaryOp::Divide => {
            let factor = floor_derivative(b_mean);
            (a.error / factor, b_error * mean / factor)
        }
        BinaryOp::InvDivide => {
            let factor = floor_derivative(a.mean);
            (b_error / factor, a.error * mean / factor)
        }
        BinaryOp::Pow => {
            let am = a.error * mean.abs() * (b_mean / floor_derivative(a.mean));
            let bm = b_error * mean.abs() * clamp_derivative(a.mean.abs().ln());
            (am, bm)
        }
        BinaryOp::InvPow => {
            let am = a.error * mean.abs() * clamp_derivative(b_mean.abs().ln());
            let bm = b_error * mean.abs() * (a.mean / floor_derivative(b_mean));
            (am, bm)
        }
        BinaryOp::Atan2 | BinaryOp::Atan2Degrees => {
            let factor = DERIVATIVE_HI_LIMIT.min(1.0 + mean * mean) / floor_derivative(b_mean);
            (a.error * factor, b_error * mean * factor)
        }
        BinaryOp::InvAtan2 | BinaryOp::InvAtan2Degrees => {
            let factor = DERIVATIVE_HI_LIMIT.min(1.0 + mean * mean) / floor_derivative(a.mean);
            (a.error * mean * factor, b_error * factor)
        }
        BinaryOp::Remainder => (a.error, b_error * a.mean / floor_derivative(b_mean)),
        BinaryOp::InvRemainder => (a.error * b_mean / floor_derivative(a.mean), b_error),
    };
    Ok(combine_errors(am, bm, mode))
}

/// Propagated half-width for `op(a)` whose result mean is `mean`.
///
/// Independent and dependent modes coincide for a single operand.
pub fn unary_error(op: UnaryOp, mean: f64, a: &ErrorEstimate, mode: ErrorMode) -> f64 {
    if a.is_missing() || mode == ErrorMode::NoErrors {
        return f64::NAN;
    }
    let e = a.error;
    match op {
        UnaryOp::Abs
        | UnaryOp::Ceil
        | UnaryOp::Floor
        | UnaryOp::Rint
        | UnaryOp::Round
        | UnaryOp::Negate
        | UnaryOp::Nop => e,
        UnaryOp::Acos | UnaryOp::Asin => e / clamp_derivative((1.0 - a.mean * a.mean).sqrt()),
        UnaryOp::AcosDegrees | UnaryOp::AsinDegrees => {
            e * RADIANS_TO_DEGREES / clamp_derivative((1.0 - a.mean * a.mean).sqrt())
        }
        UnaryOp::Atan => e / DERIVATIVE_HI_LIMIT.min(1.0 + a.mean * a.mean),
        UnaryOp::AtanDegrees => {
            e * RADIANS_TO_DEGREES / DERIVATIVE_HI_LIMIT.min(1.0 + a.mean * a.mean)
        }
        UnaryOp::Cos | UnaryOp::Sin => e * clamp_derivative((1.0 - mean * mean).sqrt()),
        UnaryOp::CosDegrees | UnaryOp::SinDegrees => {
            e * DEGREES_TO_RADIANS * clamp_derivative((1.0 - mean * mean).sqrt())
        }
        UnaryOp::Exp => e * mean.abs(),
        UnaryOp::Log => e / clamp_derivative(a.mean.abs()),
        UnaryOp::Sqrt => e / clamp_derivative(2.0 * mean.abs()),
        UnaryOp::Tan => e * DERIVATIVE_HI_LIMIT.min(1.0 + mean * mean),
        UnaryOp::TanDegrees => e * DEGREES_TO_RADIANS * DERIVATIVE_HI_LIMIT.min(1.0 + mean * mean),
    }
}

impl fmt::Display for ErrorEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: f64| {
            if v.is_nan() {
                "missing".to_string()
            } else {
                v.to_string()
            }
        };
        write!(
            f,
            "count = {}  error = {}  mean = {}",
            self.count,
            show(self.error),
            show(self.mean)
        )
    }
}
