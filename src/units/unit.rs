// ============================================================================
// Unit Algebra
// Base, derived, scaled, offset and wildcard units with exact conversion
// ============================================================================
//
// Every concrete unit reduces to a canonical triple:
//
//     value_in_base = (value + offset) * scale
//
// over a product of base dimensions with rational exponents. Conversion,
// convertibility and equality are all decided on that triple; names and
// symbols are presentation only.
// ============================================================================

use super::exponent::Exponent;
use crate::error::{Result, UnitFieldError};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const REL_TOLERANCE: f64 = 1e-12;

#[inline]
fn approx_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= REL_TOLERANCE * a.abs().max(b.abs())
}

// ============================================================================
// Building Blocks
// ============================================================================

/// An independent physical dimension such as length or time.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BaseUnit {
    quantity: Arc<str>,
    symbol: Arc<str>,
}

impl BaseUnit {
    pub fn new(quantity: &str, symbol: &str) -> Self {
        Self {
            quantity: Arc::from(quantity),
            symbol: Arc::from(symbol),
        }
    }

    /// Physical quantity name ("length")
    #[inline]
    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    /// Unit symbol ("m")
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// One base dimension raised to an exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Factor {
    pub base: Arc<str>,
    pub exponent: Exponent,
}

/// Product of base dimensions. The empty product is dimensionless.
///
/// Factors are kept sorted by base symbol with zero exponents removed so
/// that structural comparison is a plain slice comparison.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DerivedUnit {
    factors: SmallVec<[Factor; 4]>,
    name: Option<Arc<str>>,
}

impl DerivedUnit {
    /// Build from arbitrary (possibly repeated) factors.
    pub fn from_factors<I>(factors: I) -> Self
    where
        I: IntoIterator<Item = (Arc<str>, Exponent)>,
    {
        let mut merged: SmallVec<[Factor; 4]> = SmallVec::new();
        for (base, exponent) in factors {
            match merged.iter_mut().find(|f| f.base == base) {
                Some(existing) => existing.exponent = existing.exponent + exponent,
                None => merged.push(Factor { base, exponent }),
            }
        }
        merged.retain(|f| !f.exponent.is_zero());
        merged.sort_by(|a, b| a.base.cmp(&b.base));
        Self {
            factors: merged,
            name: None,
        }
    }

    pub fn dimensionless() -> Self {
        Self::default()
    }

    #[inline]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    #[inline]
    pub fn is_dimensionless(&self) -> bool {
        self.factors.is_empty()
    }

    fn same_dimensions(&self, other: &DerivedUnit) -> bool {
        self.factors == other.factors
    }

    fn product(&self, other: &DerivedUnit) -> DerivedUnit {
        Self::from_factors(
            self.factors
                .iter()
                .chain(other.factors.iter())
                .map(|f| (f.base.clone(), f.exponent)),
        )
    }

    fn quotient(&self, other: &DerivedUnit) -> DerivedUnit {
        Self::from_factors(
            self.factors
                .iter()
                .map(|f| (f.base.clone(), f.exponent))
                .chain(other.factors.iter().map(|f| (f.base.clone(), -f.exponent))),
        )
    }

    fn raised(&self, power: Exponent) -> DerivedUnit {
        Self::from_factors(
            self.factors
                .iter()
                .map(|f| (f.base.clone(), f.exponent * power)),
        )
    }

    fn dimension_string(&self) -> String {
        if self.factors.is_empty() {
            return "1".to_string();
        }
        self.factors
            .iter()
            .map(|f| {
                if f.exponent == Exponent::ONE {
                    f.base.to_string()
                } else {
                    format!("{}{}", f.base, f.exponent)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Linear multiple of a derived unit.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScaledUnit {
    amount: f64,
    unit: DerivedUnit,
    name: Option<Arc<str>>,
}

impl ScaledUnit {
    #[inline]
    pub fn amount(&self) -> f64 {
        self.amount
    }

    #[inline]
    pub fn derived(&self) -> &DerivedUnit {
        &self.unit
    }
}

/// Affine shift of a scaled unit; temperature scales are the usual example.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OffsetUnit {
    offset: f64,
    unit: ScaledUnit,
    name: Option<Arc<str>>,
}

impl OffsetUnit {
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[inline]
    pub fn scaled(&self) -> &ScaledUnit {
        &self.unit
    }
}

// ============================================================================
// Unit
// ============================================================================

/// An immutable physical unit.
///
/// An absent unit ("unknown") is represented by `Option<Unit>::None` at the
/// call sites that allow it; see [`can_convert`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    /// Convertible with anything, absorbed by multiply/divide
    Wildcard,
    Base(BaseUnit),
    Derived(DerivedUnit),
    Scaled(ScaledUnit),
    Offset(OffsetUnit),
}

impl Unit {
    // ========================================================================
    // Construction
    // ========================================================================

    pub fn base(quantity: &str, symbol: &str) -> Self {
        Unit::Base(BaseUnit::new(quantity, symbol))
    }

    pub fn dimensionless() -> Self {
        Unit::Derived(DerivedUnit::dimensionless())
    }

    /// Attach a display name. Base units keep their symbol.
    pub fn named(self, name: &str) -> Self {
        let name = Some(Arc::from(name));
        match self {
            Unit::Derived(mut d) => {
                d.name = name;
                Unit::Derived(d)
            }
            Unit::Scaled(mut s) => {
                s.name = name;
                Unit::Scaled(s)
            }
            Unit::Offset(mut o) => {
                o.name = name;
                Unit::Offset(o)
            }
            other => other,
        }
    }

    fn linear(scale: f64, dims: DerivedUnit) -> Self {
        if scale == 1.0 {
            Unit::Derived(dims)
        } else {
            Unit::Scaled(ScaledUnit {
                amount: scale,
                unit: dims,
                name: None,
            })
        }
    }

    // ========================================================================
    // Canonical Form
    // ========================================================================

    /// Base dimensions; `None` for the wildcard.
    pub fn dimensions(&self) -> Option<DerivedUnit> {
        match self {
            Unit::Wildcard => None,
            Unit::Base(b) => Some(DerivedUnit::from_factors([(
                b.symbol.clone(),
                Exponent::ONE,
            )])),
            Unit::Derived(d) => Some(DerivedUnit {
                factors: d.factors.clone(),
                name: None,
            }),
            Unit::Scaled(s) => Some(DerivedUnit {
                factors: s.unit.factors.clone(),
                name: None,
            }),
            Unit::Offset(o) => Some(DerivedUnit {
                factors: o.unit.unit.factors.clone(),
                name: None,
            }),
        }
    }

    /// Multiplier from this unit to its base dimensions.
    #[inline]
    pub fn scale_factor(&self) -> f64 {
        match self {
            Unit::Scaled(s) => s.amount,
            Unit::Offset(o) => o.unit.amount,
            _ => 1.0,
        }
    }

    /// Additive shift applied before scaling.
    #[inline]
    pub fn offset(&self) -> f64 {
        match self {
            Unit::Offset(o) => o.offset,
            _ => 0.0,
        }
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Unit::Wildcard)
    }

    #[inline]
    pub fn is_offset(&self) -> bool {
        matches!(self, Unit::Offset(_))
    }

    /// True for a linear unit with no base dimensions.
    pub fn is_dimensionless(&self) -> bool {
        !self.is_offset()
            && self
                .dimensions()
                .map(|d| d.is_dimensionless())
                .unwrap_or(false)
    }

    /// The linear form of this unit: an offset unit loses its shift.
    pub fn absolute(&self) -> Unit {
        match self {
            Unit::Offset(o) => Unit::Scaled(o.unit.clone()),
            other => other.clone(),
        }
    }

    // ========================================================================
    // Algebra
    // ========================================================================

    /// Product of two units.
    ///
    /// # Errors
    /// `IncompatibleUnitOperation` when either operand is an offset unit.
    pub fn multiply(&self, other: &Unit) -> Result<Unit> {
        self.combine(other, "multiply", |a, b| a.product(b), |a, b| a * b)
    }

    /// Quotient of two units.
    ///
    /// # Errors
    /// `IncompatibleUnitOperation` when either operand is an offset unit.
    pub fn divide(&self, other: &Unit) -> Result<Unit> {
        self.combine(other, "divide", |a, b| a.quotient(b), |a, b| a / b)
    }

    fn combine(
        &self,
        other: &Unit,
        op: &str,
        dims: impl Fn(&DerivedUnit, &DerivedUnit) -> DerivedUnit,
        scale: impl Fn(f64, f64) -> f64,
    ) -> Result<Unit> {
        if self.is_offset() || other.is_offset() {
            return Err(UnitFieldError::incompatible(format!(
                "cannot {op} offset units {self} and {other}"
            )));
        }
        match (self.dimensions(), other.dimensions()) {
            (None, None) => Ok(Unit::Wildcard),
            (None, Some(_)) => {
                if op == "divide" {
                    other.pow_int(-1)
                } else {
                    Ok(other.clone())
                }
            }
            (Some(_), None) => Ok(self.clone()),
            (Some(a), Some(b)) => Ok(Unit::linear(
                scale(self.scale_factor(), other.scale_factor()),
                dims(&a, &b),
            )),
        }
    }

    /// Raise to a rational power.
    ///
    /// # Errors
    /// `IncompatibleUnitOperation` for offset units.
    pub fn pow(&self, power: Exponent) -> Result<Unit> {
        match self {
            Unit::Wildcard => Ok(Unit::Wildcard),
            Unit::Offset(_) => Err(UnitFieldError::incompatible(format!(
                "cannot raise offset unit {self} to a power"
            ))),
            _ => {
                let dims = self.dimensions().unwrap_or_default();
                Ok(Unit::linear(
                    self.scale_factor().powf(power.as_f64()),
                    dims.raised(power),
                ))
            }
        }
    }

    #[inline]
    pub fn pow_int(&self, power: i32) -> Result<Unit> {
        self.pow(Exponent::integer(power))
    }

    /// n-th root; `sqrt` of an area is a length.
    pub fn root(&self, n: i32) -> Result<Unit> {
        let power = Exponent::new(1, n)
            .ok_or_else(|| UnitFieldError::incompatible("zeroth root of a unit"))?;
        self.pow(power)
    }

    /// A unit `amount` times as large as this one.
    ///
    /// # Errors
    /// `IncompatibleUnitOperation` for the wildcard or a zero/non-finite amount.
    pub fn scale(&self, amount: f64) -> Result<Unit> {
        if amount == 0.0 || !amount.is_finite() {
            return Err(UnitFieldError::incompatible(format!(
                "cannot scale {self} by {amount}"
            )));
        }
        match self {
            Unit::Wildcard => Err(UnitFieldError::incompatible("cannot scale the wildcard unit")),
            Unit::Offset(o) => Ok(Unit::Offset(OffsetUnit {
                offset: o.offset / amount,
                unit: ScaledUnit {
                    amount: o.unit.amount * amount,
                    unit: o.unit.unit.clone(),
                    name: None,
                },
                name: None,
            })),
            _ => Ok(Unit::linear(
                self.scale_factor() * amount,
                self.dimensions().unwrap_or_default(),
            )),
        }
    }

    /// A unit whose zero sits at `offset` in this unit.
    ///
    /// # Errors
    /// `IncompatibleUnitOperation` for the wildcard.
    pub fn shift(&self, offset: f64) -> Result<Unit> {
        match self {
            Unit::Wildcard => Err(UnitFieldError::incompatible("cannot shift the wildcard unit")),
            Unit::Offset(o) => Ok(Unit::Offset(OffsetUnit {
                offset: o.offset + offset,
                unit: o.unit.clone(),
                name: None,
            })),
            _ => Ok(Unit::Offset(OffsetUnit {
                offset,
                unit: ScaledUnit {
                    amount: self.scale_factor(),
                    unit: self.dimensions().unwrap_or_default(),
                    name: None,
                },
                name: None,
            })),
        }
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Whether values in `other` can be expressed in this unit.
    pub fn is_convertible(&self, other: &Unit) -> bool {
        match (self.dimensions(), other.dimensions()) {
            (Some(a), Some(b)) => a.same_dimensions(&b),
            _ => true,
        }
    }

    fn check_convertible(&self, from: &Unit) -> Result<()> {
        if self.is_convertible(from) {
            Ok(())
        } else {
            Err(UnitFieldError::conversion(format!(
                "{from} is not convertible to {self}"
            )))
        }
    }

    /// Convert one value expressed in `from` into this unit.
    pub fn to_this(&self, value: f64, from: &Unit) -> Result<f64> {
        self.check_convertible(from)?;
        if self.is_wildcard() || from.is_wildcard() {
            return Ok(value);
        }
        let base = (value + from.offset()) * from.scale_factor();
        Ok(base / self.scale_factor() - self.offset())
    }

    /// Convert values expressed in `from` into this unit.
    ///
    /// # Errors
    /// `UnitConversion` when the base dimensions differ.
    pub fn convert(&self, values: &[f64], from: &Unit) -> Result<Vec<f64>> {
        let mut out = values.to_vec();
        self.convert_in_place(&mut out, from)?;
        Ok(out)
    }

    /// In-place variant of [`Unit::convert`]; NaN stays NaN.
    pub fn convert_in_place(&self, values: &mut [f64], from: &Unit) -> Result<()> {
        self.check_convertible(from)?;
        if self.is_wildcard() || from.is_wildcard() || self == from {
            return Ok(());
        }
        let (fo, fs) = (from.offset(), from.scale_factor());
        let (to, ts) = (self.offset(), self.scale_factor());
        for v in values.iter_mut() {
            *v = (*v + fo) * fs / ts - to;
        }
        Ok(())
    }

    /// Slope of the conversion from `from` into this unit. Offsets cancel
    /// for half-widths so this is all an error magnitude needs.
    pub fn derivative_factor(&self, from: &Unit) -> Result<f64> {
        self.check_convertible(from)?;
        if self.is_wildcard() || from.is_wildcard() {
            return Ok(1.0);
        }
        Ok(from.scale_factor() / self.scale_factor())
    }

    fn name(&self) -> Option<&str> {
        match self {
            Unit::Derived(d) => d.name.as_deref(),
            Unit::Scaled(s) => s.name.as_deref(),
            Unit::Offset(o) => o.name.as_deref(),
            _ => None,
        }
    }
}

// ============================================================================
// Absent-Unit Aware Helpers
// ============================================================================

/// Convertibility over optional units.
///
/// `(None, None)` is convertible, `(None, concrete)` is not, and the wildcard
/// converts with everything including an absent unit.
pub fn can_convert(a: Option<&Unit>, b: Option<&Unit>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Unit::Wildcard), _) | (_, Some(Unit::Wildcard)) => true,
        (Some(a), Some(b)) => a.is_convertible(b),
        _ => false,
    }
}

/// Convert values between optional units.
pub fn convert_values(values: &[f64], from: Option<&Unit>, to: Option<&Unit>) -> Result<Vec<f64>> {
    let mut out = values.to_vec();
    convert_values_in_place(&mut out, from, to)?;
    Ok(out)
}

pub fn convert_values_in_place(
    values: &mut [f64],
    from: Option<&Unit>,
    to: Option<&Unit>,
) -> Result<()> {
    match (from, to) {
        (Some(f), Some(t)) => t.convert_in_place(values, f),
        _ if can_convert(from, to) => Ok(()),
        _ => Err(UnitFieldError::conversion(format!(
            "{} is not convertible to {}",
            unit_label(from),
            unit_label(to)
        ))),
    }
}

/// Display helper for optional units.
pub fn unit_label(unit: Option<&Unit>) -> String {
    unit.map(|u| u.to_string())
        .unwrap_or_else(|| "null".to_string())
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        match (self.dimensions(), other.dimensions()) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                self.is_offset() == other.is_offset()
                    && a.same_dimensions(&b)
                    && approx_eq(self.scale_factor(), other.scale_factor())
                    && approx_eq(self.offset(), other.offset())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        match self {
            Unit::Wildcard => f.write_str("promiscuous"),
            Unit::Base(b) => f.write_str(&b.symbol),
            Unit::Derived(d) => f.write_str(&d.dimension_string()),
            Unit::Scaled(s) => write_scaled(f, s),
            Unit::Offset(o) => {
                f.write_str("(")?;
                match &o.unit.name {
                    Some(name) => f.write_str(name)?,
                    None if o.unit.amount == 1.0 => f.write_str(&o.unit.unit.dimension_string())?,
                    None => write_scaled(f, &o.unit)?,
                }
                write!(f, " @ {})", o.offset)
            }
        }
    }
}

fn write_scaled(f: &mut fmt::Formatter<'_>, s: &ScaledUnit) -> fmt::Result {
    if let Some(name) = &s.name {
        return f.write_str(name);
    }
    if s.unit.is_dimensionless() {
        write!(f, "{}", s.amount)
    } else {
        write!(f, "({} {})", s.amount, s.unit.dimension_string())
    }
}
