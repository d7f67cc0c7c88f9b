// ============================================================================
// Operator Rule Table
// Unit inference per operator, shared by the scalar kernel, the type system
// and the field engine
// ============================================================================
//
// A rule says which unit each operand's values must be converted into
// before the operator is applied, and which unit the result carries. Every
// consumer applies the same rule so scalar and columnar arithmetic cannot
// drift apart.
// ============================================================================

use super::operator::{BinaryOp, UnaryOp};
use crate::error::{Result, UnitFieldError};
use crate::units::{catalog, Unit};
use tracing::debug;

/// Unit plan for one binary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryUnitRule {
    /// Convert left values into this unit first (`None`: use as is)
    pub left_target: Option<Unit>,
    /// Convert right values into this unit first (`None`: use as is)
    pub right_target: Option<Unit>,
    /// Unit of the result (`None`: unknown)
    pub result: Option<Unit>,
    /// True when inconvertible units on an additive operator degraded the
    /// result to an absent unit
    pub degraded: bool,
}

impl BinaryUnitRule {
    fn plain(result: Option<Unit>) -> Self {
        Self {
            left_target: None,
            right_target: None,
            result,
            degraded: false,
        }
    }
}

/// Unit plan for one unary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryUnitRule {
    /// Convert operand values into this unit first
    pub source_target: Option<Unit>,
    /// Operator actually evaluated (trig functions follow the angle unit)
    pub effective: UnaryOp,
    /// Unit of the result
    pub result: Option<Unit>,
}

fn absolute_of(unit: Option<&Unit>) -> Option<Unit> {
    unit.map(Unit::absolute)
}

/// Decide conversions and the result unit for `left op right`.
///
/// # Errors
/// - `IncompatibleUnitOperation` when multiply/divide meet an offset unit
/// - `IncompatibleUnitOperation` when atan2/remainder operands are both
///   concrete and inconvertible
///
/// Additive operators never fail: inconvertible units yield an absent
/// result unit and `degraded = true`.
pub fn binary_units(
    op: BinaryOp,
    left: Option<&Unit>,
    right: Option<&Unit>,
) -> Result<BinaryUnitRule> {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::InvSubtract
        | BinaryOp::Max
        | BinaryOp::Min => {
            Ok(additive_units(left, right))
        }
        BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::InvDivide => {
            let result = match (left, right) {
                (Some(l), Some(r)) => Some(match op {
                    BinaryOp::Multiply => l.multiply(r)?,
                    BinaryOp::Divide => l.divide(r)?,
                    _ => r.divide(l)?,
                }),
                _ => None,
            };
            Ok(BinaryUnitRule::plain(result))
        }
        BinaryOp::Pow | BinaryOp::InvPow => {
            let (base, exponent) = if op == BinaryOp::Pow { (left, right) } else { (right, left) };
            let base_target = base.filter(|u| u.is_offset()).map(Unit::absolute);
            let exponent_target = exponent
                .filter(|u| u.is_offset() && !base.is_some_and(Unit::is_wildcard))
                .map(Unit::absolute);
            let result = base
                .filter(|u| u.is_wildcard() || u.is_dimensionless())
                .map(Unit::absolute);
            let (left_target, right_target) = if op == BinaryOp::Pow {
                (base_target, exponent_target)
            } else {
                (exponent_target, base_target)
            };
            Ok(BinaryUnitRule {
                left_target,
                right_target,
                result,
                degraded: false,
            })
        }
        BinaryOp::Atan2
        | BinaryOp::Atan2Degrees
        | BinaryOp::InvAtan2
        | BinaryOp::InvAtan2Degrees
        | BinaryOp::Remainder
        | BinaryOp::InvRemainder => {
            let mut rule = BinaryUnitRule::plain(left.cloned());
            if let (Some(l), Some(r)) = (left, right) {
                let out = l.absolute();
                if !out.is_convertible(r) {
                    return Err(UnitFieldError::incompatible(format!(
                        "{op} needs convertible units, got {l} and {r}"
                    )));
                }
                rule.left_target = Some(out.clone());
                rule.right_target = Some(out.clone());
                rule.result = Some(out);
            }
            rule.result = match op {
                BinaryOp::Atan2 | BinaryOp::InvAtan2 => Some(catalog::radian()),
                BinaryOp::Atan2Degrees | BinaryOp::InvAtan2Degrees => Some(catalog::degree()),
                _ => rule.result,
            };
            Ok(rule)
        }
    }
}

fn additive_units(left: Option<&Unit>, right: Option<&Unit>) -> BinaryUnitRule {
    match (left, right) {
        (None, _) | (_, None) => BinaryUnitRule::plain(None),
        (Some(Unit::Wildcard), r) => BinaryUnitRule::plain(absolute_of(r)),
        (l, Some(Unit::Wildcard)) => BinaryUnitRule::plain(absolute_of(l)),
        (Some(l), Some(r)) => {
            let out = l.absolute();
            if out.is_convertible(r) {
                BinaryUnitRule {
                    left_target: Some(out.clone()),
                    right_target: Some(out.clone()),
                    result: Some(out),
                    degraded: false,
                }
            } else {
                debug!(left = %l, right = %r, "inconvertible units, result unit dropped");
                BinaryUnitRule {
                    degraded: true,
                    ..BinaryUnitRule::plain(None)
                }
            }
        }
    }
}

/// Decide conversions and the result unit for `op(operand)`.
///
/// A dimensionless operand is evaluated in the unit "1", anything else in
/// its absolute form. Forward trig functions follow an angle unit; other
/// transcendental functions destroy a dimensionful unit.
pub fn unary_units(op: UnaryOp, unit: Option<&Unit>) -> UnaryUnitRule {
    let dimensionless = catalog::dimensionless();
    let source = unit.map(|u| {
        if !u.is_wildcard() && dimensionless.is_convertible(u) {
            dimensionless.clone()
        } else {
            u.absolute()
        }
    });
    let is_dimensionless = source.as_ref().is_some_and(|u| !u.is_wildcard() && *u == dimensionless);
    let keep_if_dimensionless = || if is_dimensionless { source.clone() } else { None };

    let mut effective = op;
    let result = match op {
        UnaryOp::Abs
        | UnaryOp::Ceil
        | UnaryOp::Floor
        | UnaryOp::Rint
        | UnaryOp::Round
        | UnaryOp::Negate
        | UnaryOp::Nop => source.clone(),
        UnaryOp::Acos | UnaryOp::Asin | UnaryOp::Atan => Some(catalog::radian()),
        UnaryOp::AcosDegrees | UnaryOp::AsinDegrees | UnaryOp::AtanDegrees => {
            Some(catalog::degree())
        }
        UnaryOp::Cos | UnaryOp::Sin | UnaryOp::Tan => {
            if catalog::is_degree(source.as_ref()) {
                effective = op.degree_variant();
            }
            keep_if_dimensionless()
        }
        UnaryOp::CosDegrees | UnaryOp::SinDegrees | UnaryOp::TanDegrees => {
            if source.as_ref().is_some_and(|u| !u.is_wildcard() && *u == catalog::radian()) {
                effective = match op {
                    UnaryOp::CosDegrees => UnaryOp::Cos,
                    UnaryOp::SinDegrees => UnaryOp::Sin,
                    _ => UnaryOp::Tan,
                };
            }
            keep_if_dimensionless()
        }
        UnaryOp::Exp | UnaryOp::Log => keep_if_dimensionless(),
        UnaryOp::Sqrt => source.as_ref().and_then(|u| u.root(2).ok()),
    };

    UnaryUnitRule {
        source_target: source,
        effective,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_converts_into_left_absolute() {
        let k = catalog::kelvin();
        let f = catalog::fahrenheit();
        let rule = binary_units(BinaryOp::Add, Some(&k), Some(&f)).unwrap();
        assert_eq!(rule.result, Some(k.clone()));
        assert_eq!(rule.right_target, Some(k));
        assert!(!rule.degraded);
    }

    #[test]
    fn test_additive_degrades_on_mismatch() {
        let (meter, second) = (catalog::meter(), catalog::second());
        let rule = binary_units(BinaryOp::Subtract, Some(&meter), Some(&second)).unwrap();
        assert!(rule.degraded);
        assert_eq!(rule.result, None);
        assert_eq!(rule.right_target, None);
    }

    #[test]
    fn test_multiply_is_strict_on_offset_units() {
        let c = catalog::celsius();
        let m = catalog::meter();
        assert!(matches!(
            binary_units(BinaryOp::Multiply, Some(&c), Some(&m)),
            Err(UnitFieldError::IncompatibleUnitOperation(_))
        ));
        let rule = binary_units(BinaryOp::Divide, Some(&m), Some(&catalog::second())).unwrap();
        assert_eq!(rule.result.unwrap().to_string(), "m.s-1");
        let rule = binary_units(BinaryOp::Multiply, None, Some(&m)).unwrap();
        assert_eq!(rule.result, None);
    }

    #[test]
    fn test_pow_keeps_only_dimensionless() {
        let one = catalog::dimensionless();
        let rule = binary_units(BinaryOp::Pow, Some(&one), None).unwrap();
        assert_eq!(rule.result, Some(one));
        let rule = binary_units(BinaryOp::Pow, Some(&catalog::meter()), None).unwrap();
        assert_eq!(rule.result, None);
    }

    #[test]
    fn test_atan2_and_remainder() {
        let m = catalog::meter();
        let km = m.scale(1000.0).unwrap();
        let rule = binary_units(BinaryOp::Atan2Degrees, Some(&m), Some(&km)).unwrap();
        assert_eq!(rule.result, Some(catalog::degree()));
        assert_eq!(rule.right_target, Some(m.clone()));
        let rule = binary_units(BinaryOp::Remainder, Some(&km), Some(&m)).unwrap();
        assert_eq!(rule.result, Some(km));
        assert!(binary_units(BinaryOp::Remainder, Some(&m), Some(&catalog::second())).is_err());
    }

    #[test]
    fn test_trig_follows_degrees() {
        let rule = unary_units(UnaryOp::Sin, Some(&catalog::degree()));
        assert_eq!(rule.effective, UnaryOp::SinDegrees);
        assert_eq!(rule.result, None);

        let rule = unary_units(UnaryOp::Cos, Some(&catalog::dimensionless()));
        assert_eq!(rule.effective, UnaryOp::Cos);
        assert_eq!(rule.result, Some(catalog::dimensionless()));

        let rule = unary_units(UnaryOp::CosDegrees, Some(&catalog::radian()));
        assert_eq!(rule.effective, UnaryOp::Cos);
    }

    #[test]
    fn test_negate_uses_absolute_unit() {
        let rule = unary_units(UnaryOp::Negate, Some(&catalog::celsius()));
        assert_eq!(rule.result, Some(catalog::kelvin()));
        assert_eq!(rule.source_target, Some(catalog::kelvin()));
    }

    #[test]
    fn test_sqrt_takes_root() {
        let m = catalog::meter();
        let area = m.multiply(&m).unwrap();
        assert_eq!(unary_units(UnaryOp::Sqrt, Some(&area)).result, Some(m));
        assert_eq!(unary_units(UnaryOp::Exp, Some(&catalog::meter())).result, None);
    }
}
