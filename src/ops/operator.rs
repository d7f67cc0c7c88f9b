// ============================================================================
// Operators
// The binary and unary operator sets shared by scalars and fields
// ============================================================================

use std::f64::consts::PI;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const RADIANS_TO_DEGREES: f64 = 180.0 / PI;
pub const DEGREES_TO_RADIANS: f64 = PI / 180.0;

/// Binary arithmetic operators.
///
/// `Inv*` variants swap the operands: `a.binary(b, InvSubtract)` is `b - a`.
/// Unit handling is decided by the left operand either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
    Add,
    Subtract,
    InvSubtract,
    Multiply,
    Divide,
    InvDivide,
    Pow,
    InvPow,
    Max,
    Min,
    Atan2,
    Atan2Degrees,
    InvAtan2,
    InvAtan2Degrees,
    Remainder,
    InvRemainder,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    Abs,
    Acos,
    AcosDegrees,
    Asin,
    AsinDegrees,
    Atan,
    AtanDegrees,
    Ceil,
    Cos,
    CosDegrees,
    Exp,
    Floor,
    Log,
    Rint,
    Round,
    Sin,
    SinDegrees,
    Sqrt,
    Tan,
    TanDegrees,
    Negate,
    Nop,
}

#[inline]
fn nan_aware(a: f64, b: f64, pick: impl Fn(f64, f64) -> f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        pick(a, b)
    }
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::InvSubtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::InvDivide,
        BinaryOp::Pow,
        BinaryOp::InvPow,
        BinaryOp::Max,
        BinaryOp::Min,
        BinaryOp::Atan2,
        BinaryOp::Atan2Degrees,
        BinaryOp::InvAtan2,
        BinaryOp::InvAtan2Degrees,
        BinaryOp::Remainder,
        BinaryOp::InvRemainder,
    ];

    /// Apply to two values already expressed in compatible units.
    /// NaN in either operand yields NaN.
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::InvSubtract => b - a,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            BinaryOp::InvDivide => b / a,
            BinaryOp::Pow => nan_aware(a, b, f64::powf),
            BinaryOp::InvPow => nan_aware(b, a, f64::powf),
            BinaryOp::Max => nan_aware(a, b, f64::max),
            BinaryOp::Min => nan_aware(a, b, f64::min),
            BinaryOp::Atan2 => a.atan2(b),
            BinaryOp::Atan2Degrees => a.atan2(b) * RADIANS_TO_DEGREES,
            BinaryOp::InvAtan2 => b.atan2(a),
            BinaryOp::InvAtan2Degrees => b.atan2(a) * RADIANS_TO_DEGREES,
            BinaryOp::Remainder => a % b,
            BinaryOp::InvRemainder => b % a,
        }
    }

    /// The operator that gives the same result with the operands swapped.
    pub fn invert(self) -> Self {
        match self {
            BinaryOp::Add => BinaryOp::Add,
            BinaryOp::Subtract => BinaryOp::InvSubtract,
            BinaryOp::InvSubtract => BinaryOp::Subtract,
            BinaryOp::Multiply => BinaryOp::Multiply,
            BinaryOp::Divide => BinaryOp::InvDivide,
            BinaryOp::InvDivide => BinaryOp::Divide,
            BinaryOp::Pow => BinaryOp::InvPow,
            BinaryOp::InvPow => BinaryOp::Pow,
            BinaryOp::Max => BinaryOp::Max,
            BinaryOp::Min => BinaryOp::Min,
            BinaryOp::Atan2 => BinaryOp::InvAtan2,
            BinaryOp::Atan2Degrees => BinaryOp::InvAtan2Degrees,
            BinaryOp::InvAtan2 => BinaryOp::Atan2,
            BinaryOp::InvAtan2Degrees => BinaryOp::Atan2Degrees,
            BinaryOp::Remainder => BinaryOp::InvRemainder,
            BinaryOp::InvRemainder => BinaryOp::Remainder,
        }
    }

    /// Operators whose unit mismatch degrades to an absent unit instead of
    /// failing.
    #[inline]
    pub fn is_additive(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::InvSubtract
                | BinaryOp::Max
                | BinaryOp::Min
        )
    }

    #[inline]
    pub fn is_atan2(self) -> bool {
        matches!(
            self,
            BinaryOp::Atan2
                | BinaryOp::Atan2Degrees
                | BinaryOp::InvAtan2
                | BinaryOp::InvAtan2Degrees
        )
    }
}

impl UnaryOp {
    /// Evaluate. Degree variants take or return degrees.
    #[inline]
    pub fn apply(self, a: f64) -> f64 {
        match self {
            UnaryOp::Abs => a.abs(),
            UnaryOp::Acos => a.acos(),
            UnaryOp::AcosDegrees => a.acos() * RADIANS_TO_DEGREES,
            UnaryOp::Asin => a.asin(),
            UnaryOp::AsinDegrees => a.asin() * RADIANS_TO_DEGREES,
            UnaryOp::Atan => a.atan(),
            UnaryOp::AtanDegrees => a.atan() * RADIANS_TO_DEGREES,
            UnaryOp::Ceil => a.ceil(),
            UnaryOp::Cos => a.cos(),
            UnaryOp::CosDegrees => (a * DEGREES_TO_RADIANS).cos(),
            UnaryOp::Exp => a.exp(),
            UnaryOp::Floor => a.floor(),
            UnaryOp::Log => a.ln(),
            UnaryOp::Rint => a.round_ties_even(),
            // Half-up rounding, matching floor(x + 0.5)
            UnaryOp::Round => (a + 0.5).floor(),
            UnaryOp::Sin => a.sin(),
            UnaryOp::SinDegrees => (a * DEGREES_TO_RADIANS).sin(),
            UnaryOp::Sqrt => a.sqrt(),
            UnaryOp::Tan => a.tan(),
            UnaryOp::TanDegrees => (a * DEGREES_TO_RADIANS).tan(),
            UnaryOp::Negate => -a,
            UnaryOp::Nop => a,
        }
    }

    /// Forward trigonometric functions (cos, sin, tan in either angle unit).
    #[inline]
    pub fn is_trigonometric(self) -> bool {
        matches!(
            self,
            UnaryOp::Cos
                | UnaryOp::CosDegrees
                | UnaryOp::Sin
                | UnaryOp::SinDegrees
                | UnaryOp::Tan
                | UnaryOp::TanDegrees
        )
    }

    /// The variant that expects its operand in degrees.
    pub fn degree_variant(self) -> Self {
        match self {
            UnaryOp::Cos => UnaryOp::CosDegrees,
            UnaryOp::Sin => UnaryOp::SinDegrees,
            UnaryOp::Tan => UnaryOp::TanDegrees,
            other => other,
        }
    }

    /// Inverse trigonometric functions, which produce an angle.
    #[inline]
    pub fn is_inverse_trigonometric(self) -> bool {
        matches!(
            self,
            UnaryOp::Acos
                | UnaryOp::AcosDegrees
                | UnaryOp::Asin
                | UnaryOp::AsinDegrees
                | UnaryOp::Atan
                | UnaryOp::AtanDegrees
        )
    }

    #[inline]
    pub fn yields_degrees(self) -> bool {
        matches!(
            self,
            UnaryOp::AcosDegrees | UnaryOp::AsinDegrees | UnaryOp::AtanDegrees
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
