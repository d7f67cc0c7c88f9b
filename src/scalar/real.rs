// ============================================================================
// Real
// A typed scalar quantity with its unit and optional error estimate
// ============================================================================

use crate::error::{Result, UnitFieldError};
use crate::ops::{binary_units, unary_units, BinaryOp, ErrorMode, UnaryOp};
use crate::types::{MathType, NamePool, RealType};
use crate::uncertainty::ErrorEstimate;
use crate::units::{can_convert, convert_values, unit_label, Unit};
use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable (type, value, unit, error) quantity. A NaN value is
/// missing; its error is then meaningless.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Real {
    real_type: RealType,
    value: f64,
    unit: Option<Unit>,
    error: Option<ErrorEstimate>,
}

impl Real {
    /// A value in the type's default unit.
    pub fn new(real_type: RealType, value: f64) -> Self {
        let unit = real_type.default_unit().cloned();
        Self {
            real_type,
            value,
            unit,
            error: None,
        }
    }

    /// A value in an explicit unit.
    ///
    /// # Errors
    /// `UnitConversion` when the type has a default unit that `unit` cannot
    /// be converted to.
    pub fn with_unit(real_type: RealType, value: f64, unit: Option<Unit>) -> Result<Self> {
        if let (Some(default), Some(given)) = (real_type.default_unit(), unit.as_ref()) {
            if !default.is_convertible(given) {
                return Err(UnitFieldError::conversion(format!(
                    "{given} is not convertible to the default unit {default} of {real_type}"
                )));
            }
        }
        Ok(Self {
            real_type,
            value,
            unit,
            error: None,
        })
    }

    pub fn missing(real_type: RealType) -> Self {
        Self::new(real_type, f64::NAN)
    }

    /// Attach an error half-width.
    pub fn with_error(mut self, error: f64) -> Self {
        self.error = Some(ErrorEstimate::new(self.value, error, self.unit.clone()));
        self
    }

    /// Attach a prepared error estimate.
    pub fn with_estimate(mut self, estimate: ErrorEstimate) -> Self {
        self.error = Some(estimate);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn real_type(&self) -> &RealType {
        &self.real_type
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    #[inline]
    pub fn error(&self) -> Option<&ErrorEstimate> {
        self.error.as_ref()
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.value.is_nan()
    }

    /// The value re-expressed in `unit`.
    ///
    /// # Errors
    /// `UnitConversion` when the units are not convertible.
    pub fn value_in(&self, unit: &Unit) -> Result<f64> {
        match &self.unit {
            Some(own) => unit.to_this(self.value, own),
            None if unit.is_wildcard() => Ok(self.value),
            None => Err(UnitFieldError::conversion(format!(
                "{} has no unit to convert to {unit}",
                self.real_type
            ))),
        }
    }

    /// Order two quantities after expressing `other` in this one's unit.
    /// `None` when either is missing.
    pub fn compare(&self, other: &Real) -> Result<Option<Ordering>> {
        if !can_convert(self.unit(), other.unit()) {
            return Err(UnitFieldError::conversion(format!(
                "cannot compare {} with {}",
                unit_label(self.unit()),
                unit_label(other.unit())
            )));
        }
        let theirs = convert_values(&[other.value], other.unit(), self.unit())?[0];
        Ok(self.value.partial_cmp(&theirs))
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// `self op other` carrying `result_type`, which the caller obtained
    /// from [`MathType::binary`].
    ///
    /// Operands are first converted into the units the operator rule
    /// dictates; additive operators on inconvertible units fall back to an
    /// unconverted, unit-less result.
    ///
    /// # Errors
    /// `IncompatibleUnitOperation` for multiply/divide on an offset unit or
    /// atan2/remainder across inconvertible units.
    pub fn binary(
        &self,
        other: &Real,
        op: BinaryOp,
        result_type: &RealType,
        errors: ErrorMode,
    ) -> Result<Real> {
        let rule = binary_units(op, self.unit(), other.unit())?;
        let (a, a_error) = express(self, rule.left_target.as_ref())?;
        let (b, b_error) = express(other, rule.right_target.as_ref())?;
        let value = op.apply(a, b);

        let error = match (a_error, b_error) {
            (Some(ea), Some(eb)) if errors != ErrorMode::NoErrors => {
                let unit = rule.result.clone();
                Some(ErrorEstimate::from_binary(value, unit, op, &ea, &eb, errors)?)
            }
            _ => None,
        };

        Ok(Real {
            real_type: result_type.clone(),
            value,
            unit: rule.result,
            error,
        })
    }

    /// `op(self)` carrying `result_type`.
    ///
    /// Angles in degrees are fed to forward trig functions through their
    /// degree variants; offset units are evaluated in their absolute form.
    pub fn unary(&self, op: UnaryOp, result_type: &RealType, errors: ErrorMode) -> Result<Real> {
        let rule = unary_units(op, self.unit());
        let (a, a_error) = express(self, rule.source_target.as_ref())?;
        let value = rule.effective.apply(a);
        let error = match a_error {
            Some(ea) if errors != ErrorMode::NoErrors => Some(ErrorEstimate::from_unary(
                value,
                rule.result.clone(),
                rule.effective,
                &ea,
                errors,
            )),
            _ => None,
        };
        Ok(Real {
            real_type: result_type.clone(),
            value,
            unit: rule.result,
            error,
        })
    }

    /// Infer the result type through `names`, then apply
    /// [`Real::binary`].
    pub fn compute(
        &self,
        other: &Real,
        op: BinaryOp,
        names: &mut NamePool,
        errors: ErrorMode,
    ) -> Result<Real> {
        let inferred = MathType::Real(self.real_type.clone()).binary(
            &MathType::Real(other.real_type.clone()),
            op,
            names,
        )?;
        let result_type = real_result(inferred)?;
        self.binary(other, op, &result_type, errors)
    }

    /// Infer the result type through `names`, then apply [`Real::unary`].
    pub fn compute_unary(
        &self,
        op: UnaryOp,
        names: &mut NamePool,
        errors: ErrorMode,
    ) -> Result<Real> {
        let inferred = MathType::Real(self.real_type.clone()).unary(op, names)?;
        let result_type = real_result(inferred)?;
        self.unary(op, &result_type, errors)
    }
}

fn real_result(inferred: MathType) -> Result<RealType> {
    match inferred {
        MathType::Real(r) => Ok(r),
        other => Err(UnitFieldError::malformed(format!(
            "expected a real result type, got {other}"
        ))),
    }
}

/// Value and error of `real` expressed in `target` (unchanged for `None`).
fn express(real: &Real, target: Option<&Unit>) -> Result<(f64, Option<ErrorEstimate>)> {
    match (target, real.unit()) {
        (Some(t), Some(u)) if t != u => {
            let value = t.to_this(real.value, u)?;
            let error = real.error.as_ref().map(|e| e.convert_to(t)).transpose()?;
            Ok((value, error))
        }
        _ => Ok((real.value, real.error.clone())),
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing() {
            return write!(f, "{}: missing", self.real_type);
        }
        match &self.unit {
            Some(u) => write!(f, "{}: {} {}", self.real_type, self.value, u),
            None => write!(f, "{}: {}", self.real_type, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;
    use crate::units::catalog;

    fn real(name: &str, unit: Option<Unit>) -> RealType {
        RealType::new(name, unit, false).unwrap()
    }

    #[test]
    fn test_kelvin_plus_fahrenheit() {
        let t = real("AirTemp", Some(catalog::kelvin()));
        let f = real("AirTempF", Some(catalog::fahrenheit()));
        let sum = Real::new(t.clone(), 300.0)
            .binary(&Real::new(f, 32.0), BinaryOp::Add, &t, ErrorMode::Independent)
            .unwrap();
        assert!((sum.value() - 573.15).abs() < 1e-9);
        assert_eq!(sum.unit(), Some(&catalog::kelvin()));
    }

    #[test]
    fn test_errors_convert_before_combining() {
        let t = real("SoilTemp", Some(catalog::kelvin()));
        let c = real("SoilTempC", Some(catalog::celsius()));
        let a = Real::new(t.clone(), 280.0).with_error(0.3);
        let b = Real::new(c, 5.0).with_error(0.4);
        let sum = a.binary(&b, BinaryOp::Add, &t, ErrorMode::Independent).unwrap();
        assert!((sum.value() - 558.15).abs() < 1e-9);
        assert!((sum.error().unwrap().error_value() - 0.5).abs() < 1e-9);
        let dep = a.binary(&b, BinaryOp::Add, &t, ErrorMode::Dependent).unwrap();
        assert!((dep.error().unwrap().error_value() - 0.7).abs() < 1e-9);
        let none = a.binary(&b, BinaryOp::Add, &t, ErrorMode::NoErrors).unwrap();
        assert!(none.error().is_none());
    }

    #[test]
    fn test_inconvertible_add_degrades() {
        let mut names = NamePool::with_registry(TypeRegistry::new());
        let a = Real::new(real("Span", Some(catalog::meter())), 2.0);
        let b = Real::new(real("Delay", Some(catalog::second())), 3.0);
        let sum = a.compute(&b, BinaryOp::Add, &mut names, ErrorMode::Independent).unwrap();
        assert_eq!(sum.value(), 5.0);
        assert!(sum.unit().is_none());
        assert!(sum.real_type().default_unit().is_none());
    }

    #[test]
    fn test_multiply_offset_unit_fails() {
        let mut names = NamePool::with_registry(TypeRegistry::new());
        let a = Real::new(real("CabinTemp", Some(catalog::celsius())), 20.0);
        let b = Real::new(real("Stretch", Some(catalog::meter())), 3.0);
        assert!(matches!(
            a.compute(&b, BinaryOp::Multiply, &mut names, ErrorMode::Independent),
            Err(UnitFieldError::IncompatibleUnitOperation(_))
        ));
    }

    #[test]
    fn test_divide_yields_quotient_unit() {
        let mut names = NamePool::with_registry(TypeRegistry::new());
        let d = Real::new(real("Distance", Some(catalog::meter())), 10.0);
        let t = Real::new(real("Elapsed", Some(catalog::second())), 4.0);
        let v = d.compute(&t, BinaryOp::Divide, &mut names, ErrorMode::Independent).unwrap();
        assert_eq!(v.value(), 2.5);
        assert_eq!(v.unit().unwrap().to_string(), "m.s-1");
    }

    #[test]
    fn test_trig_on_degrees() {
        let mut names = NamePool::with_registry(TypeRegistry::new());
        let angle = Real::new(real("Heading", Some(catalog::degree())), 90.0);
        let s = angle.compute_unary(UnaryOp::Sin, &mut names, ErrorMode::Independent).unwrap();
        assert!((s.value() - 1.0).abs() < 1e-12);
        assert!(s.unit().is_none());
    }

    #[test]
    fn test_negate_uses_absolute_unit() {
        let t = real("Dew", Some(catalog::celsius()));
        let n = Real::new(t.clone(), 10.0)
            .unary(UnaryOp::Negate, &t, ErrorMode::Independent)
            .unwrap();
        assert!((n.value() + 283.15).abs() < 1e-9);
        assert_eq!(n.unit(), Some(&catalog::kelvin()));
    }

    #[test]
    fn test_value_in_and_compare() {
        let t = real("Water", Some(catalog::kelvin()));
        let f = real("WaterF", Some(catalog::fahrenheit()));
        let boiling = Real::new(t.clone(), 373.15);
        assert!((boiling.value_in(&catalog::celsius()).unwrap() - 100.0).abs() < 1e-9);
        let warm = Real::new(f, 100.0);
        assert_eq!(boiling.compare(&warm).unwrap(), Some(Ordering::Greater));
        assert_eq!(Real::missing(t).compare(&warm).unwrap(), None);
        let stiff = real("Stiff", Some(catalog::meter()));
        assert!(Real::with_unit(stiff, 1.0, Some(catalog::second())).is_err());
    }
}
