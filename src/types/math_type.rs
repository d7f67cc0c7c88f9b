// ============================================================================
// MathType
// Structural description of scalars, tuples, functions and sets, with the
// equality flavours and result-type inference for arithmetic
// ============================================================================

use super::scalar::{NamePool, RealType, TextType};
use crate::coords::CoordinateSystem;
use crate::error::{Result, UnitFieldError};
use crate::ops::{binary_units, BinaryOp, UnaryOp};
use crate::units::{can_convert, catalog, Unit};
use std::sync::Arc;

// ============================================================================
// Composite Types
// ============================================================================

/// Ordered product of RealTypes, optionally tied to a coordinate system.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(
        into = "crate::types::repr::RealTupleTypeRepr",
        try_from = "crate::types::repr::RealTupleTypeRepr"
    )
)]
pub struct RealTupleType {
    components: Vec<RealType>,
    coordinate_system: Option<Arc<CoordinateSystem>>,
    default_units: Vec<Option<Unit>>,
    vector: bool,
}

impl RealTupleType {
    /// # Errors
    /// `MalformedType` for an empty component list.
    pub fn new(components: Vec<RealType>) -> Result<Self> {
        if components.is_empty() {
            return Err(UnitFieldError::malformed("RealTupleType needs at least one component"));
        }
        let default_units = components.iter().map(|c| c.default_unit().cloned()).collect();
        Ok(Self {
            components,
            coordinate_system: None,
            default_units,
            vector: false,
        })
    }

    /// A tuple whose components form a directional vector. Vector ranges
    /// are re-projected, not just unit-converted, when their domain frame
    /// changes.
    pub fn vector(components: Vec<RealType>) -> Result<Self> {
        let mut tuple = Self::new(components)?;
        tuple.vector = true;
        Ok(tuple)
    }

    /// Attach a coordinate system.
    ///
    /// # Errors
    /// `MalformedType` when the dimensions disagree or a default unit is
    /// not convertible with the coordinate system's unit for that axis.
    pub fn with_coordinate_system(mut self, cs: Arc<CoordinateSystem>) -> Result<Self> {
        if cs.dimension() != self.dimension() {
            return Err(UnitFieldError::malformed(format!(
                "coordinate system of dimension {} attached to {}",
                cs.dimension(),
                self
            )));
        }
        for (i, (own, theirs)) in self.default_units.iter().zip(cs.coordinate_units()).enumerate() {
            if own.is_some() && theirs.is_some() && !can_convert(own.as_ref(), theirs.as_ref()) {
                return Err(UnitFieldError::malformed(format!(
                    "unit of component {i} of {self} is inconsistent with its coordinate system"
                )));
            }
        }
        self.coordinate_system = Some(cs);
        Ok(self)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn components(&self) -> &[RealType] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&RealType> {
        self.components.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }

    #[inline]
    pub fn coordinate_system(&self) -> Option<&Arc<CoordinateSystem>> {
        self.coordinate_system.as_ref()
    }

    #[inline]
    pub fn default_units(&self) -> &[Option<Unit>] {
        &self.default_units
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        self.vector
    }

    fn equals_except_name(&self, other: &RealTupleType) -> bool {
        self.dimension() == other.dimension()
    }

    fn equals_except_name_but_units(&self, other: &RealTupleType) -> bool {
        self.dimension() == other.dimension()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| can_convert(a.default_unit(), b.default_unit()))
    }
}

impl PartialEq for RealTupleType {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components && self.coordinate_system == other.coordinate_system
    }
}

/// Ordered tuple of arbitrary component types.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleType {
    components: Vec<MathType>,
}

impl TupleType {
    #[inline]
    pub fn components(&self) -> &[MathType] {
        &self.components
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.components.len()
    }
}

/// A sampled function type: domain → range.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    domain: RealTupleType,
    range: Box<MathType>,
}

impl FunctionType {
    /// # Errors
    /// `MalformedType` when the domain is not a RealType or RealTupleType,
    /// or the range is a set type.
    pub fn new(domain: MathType, range: MathType) -> Result<Self> {
        let domain = match domain {
            MathType::Real(r) => RealTupleType::new(vec![r])?,
            MathType::RealTuple(t) => t,
            other => {
                return Err(UnitFieldError::malformed(format!(
                    "function domain must be real, got {other}"
                )))
            }
        };
        if matches!(range, MathType::Set(_)) {
            return Err(UnitFieldError::malformed("function range cannot be a set type"));
        }
        Ok(Self {
            domain,
            range: Box::new(range),
        })
    }

    #[inline]
    pub fn domain(&self) -> &RealTupleType {
        &self.domain
    }

    #[inline]
    pub fn range(&self) -> &MathType {
        &self.range
    }

    #[inline]
    pub fn domain_dimension(&self) -> usize {
        self.domain.dimension()
    }

    /// True when the range holds no nested functions (or text): such
    /// functions can be stored column-wise.
    pub fn is_flat(&self) -> bool {
        match self.range.as_ref() {
            MathType::Real(_) | MathType::RealTuple(_) => true,
            MathType::Tuple(t) => t
                .components
                .iter()
                .all(|c| matches!(c, MathType::Real(_) | MathType::RealTuple(_))),
            _ => false,
        }
    }

    /// The range flattened into its RealType components.
    ///
    /// # Errors
    /// `MalformedType` when the function is not flat.
    pub fn flat_components(&self) -> Result<Vec<RealType>> {
        if !self.is_flat() {
            return Err(UnitFieldError::malformed(format!("{self} is not a flat function")));
        }
        Ok(match self.range.as_ref() {
            MathType::Real(r) => vec![r.clone()],
            MathType::RealTuple(t) => t.components.clone(),
            MathType::Tuple(t) => t
                .components
                .iter()
                .flat_map(|c| match c {
                    MathType::Real(r) => vec![r.clone()],
                    MathType::RealTuple(rt) => rt.components.clone(),
                    _ => Vec::new(),
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Per flattened component: the coordinate system of the RealTupleType
    /// it belongs to, and its index within that tuple.
    pub fn range_coordinate_systems(&self) -> Vec<Option<(Arc<CoordinateSystem>, usize)>> {
        let of_tuple = |t: &RealTupleType| -> Vec<Option<(Arc<CoordinateSystem>, usize)>> {
            (0..t.dimension())
                .map(|i| t.coordinate_system.clone().map(|cs| (cs, i)))
                .collect()
        };
        match self.range.as_ref() {
            MathType::Real(_) => vec![None],
            MathType::RealTuple(t) => of_tuple(t),
            MathType::Tuple(t) => t
                .components
                .iter()
                .flat_map(|c| match c {
                    MathType::RealTuple(rt) => of_tuple(rt),
                    _ => vec![None],
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Flattened component ranges `(start, len)` of vector RealTupleTypes
    /// inside the range.
    pub fn vector_groups(&self) -> Vec<(usize, usize)> {
        let mut groups = Vec::new();
        match self.range.as_ref() {
            MathType::RealTuple(t) if t.vector => groups.push((0, t.dimension())),
            MathType::Tuple(t) => {
                let mut offset = 0;
                for c in &t.components {
                    match c {
                        MathType::RealTuple(rt) => {
                            if rt.vector {
                                groups.push((offset, rt.dimension()));
                            }
                            offset += rt.dimension();
                        }
                        _ => offset += 1,
                    }
                }
            }
            _ => {}
        }
        groups
    }
}

/// A set of points in a real domain.
#[derive(Debug, Clone, PartialEq)]
pub struct SetType {
    domain: RealTupleType,
}

impl SetType {
    pub fn new(domain: MathType) -> Result<Self> {
        match domain {
            MathType::Real(r) => Ok(Self {
                domain: RealTupleType::new(vec![r])?,
            }),
            MathType::RealTuple(t) => Ok(Self { domain: t }),
            other => Err(UnitFieldError::malformed(format!(
                "set domain must be real, got {other}"
            ))),
        }
    }

    #[inline]
    pub fn domain(&self) -> &RealTupleType {
        &self.domain
    }
}

// ============================================================================
// MathType
// ============================================================================

/// Closed sum of every type shape the engine understands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "crate::types::repr::MathTypeRepr", try_from = "crate::types::repr::MathTypeRepr")
)]
pub enum MathType {
    Real(RealType),
    Text(TextType),
    RealTuple(RealTupleType),
    Tuple(TupleType),
    Function(FunctionType),
    Set(SetType),
}

impl MathType {
    /// Tuple of arbitrary components; an all-real tuple becomes a
    /// RealTupleType.
    ///
    /// # Errors
    /// `MalformedType` for an empty component list.
    pub fn tuple(components: Vec<MathType>) -> Result<MathType> {
        if components.is_empty() {
            return Err(UnitFieldError::malformed("tuple needs at least one component"));
        }
        if components.iter().all(|c| matches!(c, MathType::Real(_))) {
            let reals = components
                .into_iter()
                .filter_map(|c| match c {
                    MathType::Real(r) => Some(r),
                    _ => None,
                })
                .collect();
            return Ok(MathType::RealTuple(RealTupleType::new(reals)?));
        }
        Ok(MathType::Tuple(TupleType { components }))
    }

    pub fn function(domain: MathType, range: MathType) -> Result<MathType> {
        Ok(MathType::Function(FunctionType::new(domain, range)?))
    }

    pub fn set(domain: MathType) -> Result<MathType> {
        Ok(MathType::Set(SetType::new(domain)?))
    }

    pub fn as_real(&self) -> Option<&RealType> {
        match self {
            MathType::Real(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            MathType::Function(f) => Some(f),
            _ => None,
        }
    }

    // ========================================================================
    // Equality Flavours
    // ========================================================================

    /// Nominal equality (`==`): RealTypes compare by name.
    #[inline]
    pub fn equals(&self, other: &MathType) -> bool {
        self == other
    }

    /// Structural equality that ignores names and units: any two real
    /// quantities are interchangeable, tuples and functions must match in
    /// shape.
    pub fn equals_except_name(&self, other: &MathType) -> bool {
        self.structurally_equal(other, false)
    }

    /// Like [`MathType::equals_except_name`], additionally requiring the
    /// default units of corresponding reals to be convertible.
    pub fn equals_except_name_but_units(&self, other: &MathType) -> bool {
        self.structurally_equal(other, true)
    }

    fn structurally_equal(&self, other: &MathType, units: bool) -> bool {
        match (self, other) {
            (MathType::Real(a), MathType::Real(b)) => {
                !units || can_convert(a.default_unit(), b.default_unit())
            }
            (MathType::Text(_), MathType::Text(_)) => true,
            (MathType::RealTuple(a), MathType::RealTuple(b)) => {
                if units {
                    a.equals_except_name_but_units(b)
                } else {
                    a.equals_except_name(b)
                }
            }
            (MathType::Tuple(a), MathType::Tuple(b)) => {
                a.dimension() == b.dimension()
                    && a
                        .components
                        .iter()
                        .zip(&b.components)
                        .all(|(x, y)| x.structurally_equal(y, units))
            }
            (MathType::Function(a), MathType::Function(b)) => {
                let domain = MathType::RealTuple(b.domain.clone());
                MathType::RealTuple(a.domain.clone()).structurally_equal(&domain, units)
                    && a.range.structurally_equal(&b.range, units)
            }
            (MathType::Set(a), MathType::Set(b)) => {
                let domain = MathType::RealTuple(b.domain.clone());
                MathType::RealTuple(a.domain.clone()).structurally_equal(&domain, units)
            }
            _ => false,
        }
    }

    // ========================================================================
    // Result-Type Inference
    // ========================================================================

    /// Type of `self op other`. Fresh RealTypes are minted from `names`.
    ///
    /// # Errors
    /// - `MalformedType` when the shapes cannot be combined
    /// - `IncompatibleUnitOperation` for multiply/divide on offset units
    pub fn binary(&self, other: &MathType, op: BinaryOp, names: &mut NamePool) -> Result<MathType> {
        match (self, other) {
            (MathType::Real(a), MathType::Real(b)) => {
                Ok(MathType::Real(real_binary(a, b, op, names)?))
            }
            (MathType::RealTuple(a), MathType::RealTuple(b)) => {
                if a.dimension() != b.dimension() {
                    return Err(mismatch(self, other));
                }
                let reals = a
                    .components
                    .iter()
                    .zip(&b.components)
                    .map(|(x, y)| real_binary(x, y, op, names))
                    .collect::<Result<Vec<_>>>()?;
                Ok(MathType::RealTuple(RealTupleType::new(reals)?))
            }
            (MathType::RealTuple(a), MathType::Real(b)) => {
                let reals = a
                    .components
                    .iter()
                    .map(|x| real_binary(x, b, op, names))
                    .collect::<Result<Vec<_>>>()?;
                Ok(MathType::RealTuple(RealTupleType::new(reals)?))
            }
            (
                MathType::Real(_),
                MathType::RealTuple(_) | MathType::Tuple(_) | MathType::Function(_),
            ) => {
                other.binary(self, op.invert(), names)
            }
            (MathType::Tuple(a), MathType::Tuple(b)) => {
                if a.dimension() != b.dimension() {
                    return Err(mismatch(self, other));
                }
                let parts = a
                    .components
                    .iter()
                    .zip(&b.components)
                    .map(|(x, y)| x.binary(y, op, names))
                    .collect::<Result<Vec<_>>>()?;
                MathType::tuple(parts)
            }
            (MathType::Tuple(a), MathType::Real(_)) => {
                let parts = a
                    .components
                    .iter()
                    .map(|x| x.binary(other, op, names))
                    .collect::<Result<Vec<_>>>()?;
                MathType::tuple(parts)
            }
            (MathType::Function(f), MathType::Function(g)) => {
                let domain = MathType::RealTuple(g.domain.clone());
                if !MathType::RealTuple(f.domain.clone()).equals_except_name(&domain) {
                    return Err(mismatch(self, other));
                }
                let range = f.range.binary(&g.range, op, names)?;
                MathType::function(MathType::RealTuple(f.domain.clone()), range)
            }
            (MathType::Function(f), _) => {
                let range = f.range.binary(other, op, names)?;
                MathType::function(MathType::RealTuple(f.domain.clone()), range)
            }
            (MathType::RealTuple(_) | MathType::Tuple(_), MathType::Function(g)) => {
                if !g.range.equals_except_name(self) {
                    return Err(mismatch(self, other));
                }
                other.binary(self, op.invert(), names)
            }
            _ => Err(mismatch(self, other)),
        }
    }

    /// Type of `op(self)`.
    pub fn unary(&self, op: UnaryOp, names: &mut NamePool) -> Result<MathType> {
        match self {
            MathType::Real(r) => Ok(MathType::Real(real_unary(r, op, names)?)),
            MathType::RealTuple(t) => {
                let reals = t
                    .components
                    .iter()
                    .map(|c| real_unary(c, op, names))
                    .collect::<Result<Vec<_>>>()?;
                Ok(MathType::RealTuple(RealTupleType::new(reals)?))
            }
            MathType::Tuple(t) => {
                let parts = t
                    .components
                    .iter()
                    .map(|c| c.unary(op, names))
                    .collect::<Result<Vec<_>>>()?;
                MathType::tuple(parts)
            }
            MathType::Function(f) => {
                let range = f.range.unary(op, names)?;
                MathType::function(MathType::RealTuple(f.domain.clone()), range)
            }
            MathType::Text(_) | MathType::Set(_) => Err(UnitFieldError::malformed(format!(
                "{op} is not defined on {self}"
            ))),
        }
    }
}

fn mismatch(a: &MathType, b: &MathType) -> UnitFieldError {
    UnitFieldError::malformed(format!("types don't match: {a} and {b}"))
}

/// Interval flag of a binary result. Sums and differences of intervals
/// stay intervals; products mixing one interval and one point are
/// intervals.
fn binary_interval(this: &RealType, that: &RealType, op: BinaryOp) -> bool {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::InvSubtract
        | BinaryOp::Max
        | BinaryOp::Min => this.is_interval() && that.is_interval(),
        BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::InvDivide
        | BinaryOp::Remainder
        | BinaryOp::InvRemainder => this.is_interval() != that.is_interval(),
        BinaryOp::Pow => this.is_interval(),
        BinaryOp::InvPow => that.is_interval(),
        BinaryOp::Atan2
        | BinaryOp::InvAtan2
        | BinaryOp::Atan2Degrees
        | BinaryOp::InvAtan2Degrees => false,
    }
}

/// `kept` when its interval flag already matches, else a fresh type with
/// its unit.
fn keep_or_mint(kept: &RealType, interval: bool, names: &mut NamePool) -> Result<RealType> {
    if kept.is_interval() == interval {
        Ok(kept.clone())
    } else {
        names.mint_with(kept.default_unit().cloned(), interval)
    }
}

fn real_binary(
    this: &RealType,
    that: &RealType,
    op: BinaryOp,
    names: &mut NamePool,
) -> Result<RealType> {
    let this_unit = this.default_unit();
    let that_unit = that.default_unit();
    let interval = binary_interval(this, that, op);
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::InvSubtract
        | BinaryOp::Max
        | BinaryOp::Min => {
            match (this_unit, that_unit) {
                (_, Some(Unit::Wildcard)) => Ok(this.clone()),
                (Some(Unit::Wildcard), _) => Ok(that.clone()),
                (None, None) => keep_or_mint(this, interval, names),
                (Some(a), Some(b)) if a.is_convertible(b) => keep_or_mint(this, interval, names),
                // Absent against concrete, or inconvertible units, degrade
                // to a unit-less result.
                _ => names.mint_with(None, interval),
            }
        }
        BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::InvDivide => {
            match (this_unit, that_unit) {
                (None, None) => keep_or_mint(this, interval, names),
                (None, Some(Unit::Wildcard)) => Ok(this.clone()),
                (Some(Unit::Wildcard), None) => Ok(that.clone()),
                (None, Some(_)) | (Some(_), None) => names.mint_with(None, interval),
                _ => {
                    let rule = binary_units(op, this_unit, that_unit)?;
                    names.mint_with(rule.result, interval)
                }
            }
        }
        BinaryOp::Pow | BinaryOp::InvPow => match this_unit {
            None => keep_or_mint(this, interval, names),
            Some(_) => names.mint_with(None, interval),
        },
        BinaryOp::Atan2 | BinaryOp::InvAtan2 => names.mint(Some(catalog::radian())),
        BinaryOp::Atan2Degrees | BinaryOp::InvAtan2Degrees => names.mint(Some(catalog::degree())),
        BinaryOp::Remainder => keep_or_mint(this, interval, names),
        BinaryOp::InvRemainder => match this_unit {
            None => keep_or_mint(this, interval, names),
            Some(_) => keep_or_mint(that, interval, names),
        },
    }
}

fn real_unary(this: &RealType, op: UnaryOp, names: &mut NamePool) -> Result<RealType> {
    match op {
        UnaryOp::Abs
        | UnaryOp::Ceil
        | UnaryOp::Floor
        | UnaryOp::Rint
        | UnaryOp::Round
        | UnaryOp::Negate
        | UnaryOp::Nop => Ok(this.clone()),
        UnaryOp::Acos | UnaryOp::Asin | UnaryOp::Atan => names.mint(Some(catalog::radian())),
        UnaryOp::AcosDegrees | UnaryOp::AsinDegrees | UnaryOp::AtanDegrees => {
            names.mint(Some(catalog::degree()))
        }
        // the remaining functions clear the interval flag
        UnaryOp::Cos
        | UnaryOp::CosDegrees
        | UnaryOp::Sin
        | UnaryOp::SinDegrees
        | UnaryOp::Tan
        | UnaryOp::TanDegrees
        | UnaryOp::Sqrt
        | UnaryOp::Exp
        | UnaryOp::Log => match this.default_unit() {
            None => keep_or_mint(this, false, names),
            Some(u) => {
                let keep = !u.is_wildcard() && *u == catalog::dimensionless();
                names.mint(keep.then(|| u.clone()))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn pool() -> NamePool {
        NamePool::with_registry(TypeRegistry::new())
    }

    fn real(name: &str, unit: Option<Unit>) -> RealType {
        RealType::new(name, unit, false).unwrap()
    }

    #[test]
    fn test_equality_flavours() {
        let a = MathType::Real(real("Alpha", None));
        let a2 = MathType::Real(real("Alpha", Some(catalog::meter())));
        let b = MathType::Real(real("Beta", None));
        assert!(a.equals(&a2));
        assert!(!a.equals(&b));
        assert!(a.equals_except_name(&b));
        assert!(a.equals_except_name_but_units(&b));
        assert!(!a2.equals_except_name_but_units(&b));
    }

    #[test]
    fn test_tuple_normalizes_to_real_tuple() {
        let t = MathType::tuple(vec![
            MathType::Real(real("X", None)),
            MathType::Real(real("Y", None)),
        ])
        .unwrap();
        assert!(matches!(t, MathType::RealTuple(ref rt) if rt.dimension() == 2));
        assert!(MathType::tuple(vec![]).is_err());
    }

    #[test]
    fn test_function_flatness() {
        let x = MathType::Real(real("X", None));
        let v = MathType::Real(real("V", None));
        let flat = FunctionType::new(x.clone(), v.clone()).unwrap();
        assert!(flat.is_flat());
        let nested = FunctionType::new(
            x.clone(),
            MathType::tuple(vec![v.clone(), MathType::Function(flat.clone())]).unwrap(),
        )
        .unwrap();
        assert!(!nested.is_flat());
        assert!(nested.flat_components().is_err());
        assert!(FunctionType::new(MathType::Text(TextType::new("T").unwrap()), v).is_err());
    }

    #[test]
    fn test_add_keeps_left_type_when_convertible() {
        let mut names = pool();
        let t = MathType::Real(real("Temp", Some(catalog::kelvin())));
        let f = MathType::Real(real("TempF", Some(catalog::fahrenheit())));
        assert_eq!(t.binary(&f, BinaryOp::Add, &mut names).unwrap(), t);
    }

    #[test]
    fn test_add_inconvertible_mints_unitless_type() {
        let mut names = pool();
        let a = MathType::Real(real("Len", Some(catalog::meter())));
        let b = MathType::Real(real("Dur", Some(catalog::second())));
        let result = a.binary(&b, BinaryOp::Add, &mut names).unwrap();
        let r = result.as_real().unwrap();
        assert_eq!(r.name(), "Generic_1_nullUnit");
        assert!(r.default_unit().is_none());
        let again = a.binary(&b, BinaryOp::Subtract, &mut names).unwrap();
        assert_eq!(again.as_real().unwrap().name(), "Generic_2_nullUnit");
    }

    #[test]
    fn test_absent_unit_against_concrete_mints_either_way() {
        let mut names = pool();
        let bare = MathType::Real(real("Bare", None));
        let len = MathType::Real(real("Reach", Some(catalog::meter())));

        let left = bare.binary(&len, BinaryOp::Add, &mut names).unwrap();
        let right = len.binary(&bare, BinaryOp::Add, &mut names).unwrap();
        assert_ne!(left, bare);
        assert_ne!(right, len);
        assert!(left.as_real().unwrap().default_unit().is_none());
        assert!(right.as_real().unwrap().default_unit().is_none());

        let product = bare.binary(&len, BinaryOp::Multiply, &mut names).unwrap();
        assert_ne!(product, bare);
        assert!(product.as_real().unwrap().default_unit().is_none());

        // both absent keeps the left type, the wildcard is absorbed
        let other = MathType::Real(real("AlsoBare", None));
        assert_eq!(bare.binary(&other, BinaryOp::Add, &mut names).unwrap(), bare);
        let any = MathType::Real(real("Anything", Some(catalog::wildcard())));
        assert_eq!(bare.binary(&any, BinaryOp::Add, &mut names).unwrap(), bare);
        assert_eq!(any.binary(&len, BinaryOp::Subtract, &mut names).unwrap(), len);
    }

    #[test]
    fn test_interval_flag_propagates() {
        let mut names = pool();
        let span = MathType::Real(RealType::new("Span", Some(catalog::kelvin()), true).unwrap());
        let gap = MathType::Real(RealType::new("Gap", Some(catalog::kelvin()), true).unwrap());
        let level = MathType::Real(real("Level", Some(catalog::kelvin())));

        let diff = span.binary(&gap, BinaryOp::Subtract, &mut names).unwrap();
        assert_eq!(diff, span);
        assert!(diff.as_real().unwrap().is_interval());

        // a point plus an interval is a point: a fresh non-interval type
        let shifted = span.binary(&level, BinaryOp::Add, &mut names).unwrap();
        assert_ne!(shifted, span);
        assert!(!shifted.as_real().unwrap().is_interval());
        assert_eq!(shifted.as_real().unwrap().default_unit(), Some(&catalog::kelvin()));

        let scaled = level.binary(&span, BinaryOp::Multiply, &mut names).unwrap();
        assert!(scaled.as_real().unwrap().is_interval());

        let sine = span.unary(UnaryOp::Sin, &mut names).unwrap();
        assert!(!sine.as_real().unwrap().is_interval());
        assert_eq!(span.unary(UnaryOp::Abs, &mut names).unwrap(), span);
    }

    #[test]
    fn test_multiply_and_divide_units() {
        let mut names = pool();
        let a = MathType::Real(real("Dist", Some(catalog::meter())));
        let b = MathType::Real(real("Time", Some(catalog::second())));
        let speed = a.binary(&b, BinaryOp::Divide, &mut names).unwrap();
        let speed = speed.as_real().unwrap();
        assert_eq!(speed.name(), "Generic_1_m_s_1");
        assert_eq!(speed.default_unit().unwrap().to_string(), "m.s-1");

        let c = MathType::Real(real("TempC", Some(catalog::celsius())));
        assert!(matches!(
            c.binary(&a, BinaryOp::Multiply, &mut names),
            Err(UnitFieldError::IncompatibleUnitOperation(_))
        ));
    }

    #[test]
    fn test_atan2_pow_remainder() {
        let mut names = pool();
        let a = MathType::Real(real("U", Some(catalog::meter())));
        let b = MathType::Real(real("W", Some(catalog::meter())));
        let angle = a.binary(&b, BinaryOp::Atan2Degrees, &mut names).unwrap();
        assert_eq!(angle.as_real().unwrap().default_unit(), Some(&catalog::degree()));
        let p = a.binary(&b, BinaryOp::Pow, &mut names).unwrap();
        assert!(p.as_real().unwrap().default_unit().is_none());
        assert_eq!(a.binary(&b, BinaryOp::Remainder, &mut names).unwrap(), a);
    }

    #[test]
    fn test_function_binary_distributes_over_range() {
        let mut names = pool();
        let x = MathType::Real(real("X", None));
        let v = MathType::Real(real("V", Some(catalog::meter())));
        let w = MathType::Real(real("Wid", Some(catalog::meter())));
        let f = MathType::function(x.clone(), v.clone()).unwrap();
        let result = f.binary(&w, BinaryOp::Multiply, &mut names).unwrap();
        let range = result.as_function().unwrap().range().as_real().unwrap().clone();
        assert_eq!(range.default_unit().unwrap().to_string(), "m2");

        // scalar on the left is handled by inverting the operator
        let left = w.binary(&f, BinaryOp::Subtract, &mut names).unwrap();
        assert!(left.as_function().is_some());
    }

    #[test]
    fn test_unary_types() {
        let mut names = pool();
        let a = MathType::Real(real("Ang", Some(catalog::degree())));
        let s = a.unary(UnaryOp::Sin, &mut names).unwrap();
        assert!(s.as_real().unwrap().default_unit().is_none());
        let n = a.unary(UnaryOp::Negate, &mut names).unwrap();
        assert_eq!(n, a);
        let ratio = MathType::Real(real("Ratio", Some(catalog::dimensionless())));
        let e = ratio.unary(UnaryOp::Exp, &mut names).unwrap();
        assert_eq!(e.as_real().unwrap().default_unit(), Some(&catalog::dimensionless()));
    }
}
