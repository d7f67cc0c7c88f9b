// ============================================================================
// RealTuple
// Fixed-length tuple of Reals sharing an optional coordinate system
// ============================================================================

use super::real::Real;
use crate::coords::{transform_coordinates, CoordinateSystem, Frame};
use crate::error::{Result, UnitFieldError};
use crate::ops::{BinaryOp, ErrorMode, UnaryOp};
use crate::types::{MathType, NamePool, RealTupleType};
use crate::units::Unit;
use std::fmt;
use std::sync::Arc;

/// A point in a RealTupleType's space.
#[derive(Debug, Clone, PartialEq)]
pub struct RealTuple {
    tuple_type: RealTupleType,
    components: Vec<Real>,
    coordinate_system: Option<Arc<CoordinateSystem>>,
}

impl RealTuple {
    /// # Errors
    /// `MalformedType` when the component count or a component type does
    /// not match `tuple_type`.
    pub fn new(tuple_type: RealTupleType, components: Vec<Real>) -> Result<Self> {
        if components.len() != tuple_type.dimension() {
            return Err(UnitFieldError::malformed(format!(
                "{} components for {}",
                components.len(),
                tuple_type
            )));
        }
        if let Some((i, c)) = components
            .iter()
            .enumerate()
            .find(|(i, c)| Some(c.real_type()) != tuple_type.component(*i))
        {
            return Err(UnitFieldError::malformed(format!(
                "component {i} has type {} in {tuple_type}",
                c.real_type()
            )));
        }
        let coordinate_system = tuple_type.coordinate_system().cloned();
        Ok(Self {
            tuple_type,
            components,
            coordinate_system,
        })
    }

    /// Values in the component types' default units.
    pub fn from_values(tuple_type: RealTupleType, values: &[f64]) -> Result<Self> {
        if values.len() != tuple_type.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} values for {}",
                values.len(),
                tuple_type
            )));
        }
        let components = tuple_type
            .components()
            .iter()
            .zip(values)
            .map(|(t, v)| Real::new(t.clone(), *v))
            .collect();
        Self::new(tuple_type, components)
    }

    /// Every component missing.
    pub fn missing(tuple_type: RealTupleType) -> Self {
        let components = tuple_type.components().iter().cloned().map(Real::missing).collect();
        let coordinate_system = tuple_type.coordinate_system().cloned();
        Self {
            tuple_type,
            components,
            coordinate_system,
        }
    }

    /// Override the coordinate system the components are expressed in.
    pub fn with_coordinate_system(mut self, cs: Option<Arc<CoordinateSystem>>) -> Result<Self> {
        if let Some(cs) = &cs {
            if cs.dimension() != self.dimension() {
                return Err(UnitFieldError::malformed(format!(
                    "coordinate system of dimension {} for {}",
                    cs.dimension(),
                    self.tuple_type
                )));
            }
        }
        self.coordinate_system = cs;
        Ok(self)
    }

    #[inline]
    pub fn tuple_type(&self) -> &RealTupleType {
        &self.tuple_type
    }

    #[inline]
    pub fn components(&self) -> &[Real] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&Real> {
        self.components.get(index)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn coordinate_system(&self) -> Option<&Arc<CoordinateSystem>> {
        self.coordinate_system.as_ref()
    }

    pub fn values(&self) -> Vec<f64> {
        self.components.iter().map(Real::value).collect()
    }

    pub fn units(&self) -> Vec<Option<Unit>> {
        self.components.iter().map(|c| c.unit().cloned()).collect()
    }

    /// True when any component is missing
    pub fn is_missing(&self) -> bool {
        self.components.iter().any(Real::is_missing)
    }

    /// `other`'s components moved into this tuple's coordinate system and
    /// units; errors are carried unchanged.
    fn aligned(&self, other: &RealTuple) -> Result<Vec<Real>> {
        if self.coordinate_system == other.coordinate_system {
            return Ok(other.components.clone());
        }
        let own_units = self.units();
        let their_units = other.units();
        let columns: Vec<Vec<f64>> = other.values().into_iter().map(|v| vec![v]).collect();
        let moved = transform_coordinates(
            Frame::new(self.coordinate_system.as_deref(), &own_units),
            Frame::new(other.coordinate_system.as_deref(), &their_units),
            &columns,
        )?;
        self.components
            .iter()
            .zip(&other.components)
            .zip(moved)
            .map(|((mine, theirs), column)| {
                let unit = mine.unit().cloned();
                let real = Real::with_unit(theirs.real_type().clone(), column[0], unit.clone())
                    .or_else(|_| Real::with_unit(mine.real_type().clone(), column[0], unit))?;
                Ok(match theirs.error() {
                    Some(e) => real.with_estimate(e.clone()),
                    None => real,
                })
            })
            .collect()
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Componentwise `self op other`, after moving `other` into this
    /// tuple's coordinate frame.
    ///
    /// # Errors
    /// `ShapeMismatch` for tuples of different dimension.
    pub fn binary(
        &self,
        other: &RealTuple,
        op: BinaryOp,
        result_type: &RealTupleType,
        errors: ErrorMode,
    ) -> Result<RealTuple> {
        if other.dimension() != self.dimension() || result_type.dimension() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} {op} {} into {result_type}",
                self.tuple_type, other.tuple_type
            )));
        }
        let theirs = self.aligned(other)?;
        let components = self
            .components
            .iter()
            .zip(&theirs)
            .zip(result_type.components())
            .map(|((a, b), t)| a.binary(b, op, t, errors))
            .collect::<Result<Vec<_>>>()?;
        Ok(RealTuple {
            tuple_type: result_type.clone(),
            components,
            coordinate_system: self.coordinate_system.clone(),
        })
    }

    /// `self op other` with the scalar broadcast over every component.
    pub fn binary_real(
        &self,
        other: &Real,
        op: BinaryOp,
        result_type: &RealTupleType,
        errors: ErrorMode,
    ) -> Result<RealTuple> {
        if result_type.dimension() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} {op} scalar into {result_type}",
                self.tuple_type
            )));
        }
        let components = self
            .components
            .iter()
            .zip(result_type.components())
            .map(|(a, t)| a.binary(other, op, t, errors))
            .collect::<Result<Vec<_>>>()?;
        Ok(RealTuple {
            tuple_type: result_type.clone(),
            components,
            coordinate_system: self.coordinate_system.clone(),
        })
    }

    /// Componentwise `op(self)`.
    pub fn unary(
        &self,
        op: UnaryOp,
        result_type: &RealTupleType,
        errors: ErrorMode,
    ) -> Result<RealTuple> {
        if result_type.dimension() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{op}({}) into {result_type}",
                self.tuple_type
            )));
        }
        let components = self
            .components
            .iter()
            .zip(result_type.components())
            .map(|(a, t)| a.unary(op, t, errors))
            .collect::<Result<Vec<_>>>()?;
        Ok(RealTuple {
            tuple_type: result_type.clone(),
            components,
            coordinate_system: self.coordinate_system.clone(),
        })
    }

    /// Infer the result type through `names`, then apply
    /// [`RealTuple::binary`].
    pub fn compute(
        &self,
        other: &RealTuple,
        op: BinaryOp,
        names: &mut NamePool,
        errors: ErrorMode,
    ) -> Result<RealTuple> {
        let inferred = MathType::RealTuple(self.tuple_type.clone()).binary(
            &MathType::RealTuple(other.tuple_type.clone()),
            op,
            names,
        )?;
        match inferred {
            MathType::RealTuple(t) => self.binary(other, op, &t, errors),
            other => Err(UnitFieldError::malformed(format!(
                "expected a tuple result type, got {other}"
            ))),
        }
    }
}

impl fmt::Display for RealTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| if c.is_missing() { "missing".to_string() } else { c.value().to_string() })
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}
