// ============================================================================
// Field Arithmetic
// Vectorized binary and unary operators over flat fields
// ============================================================================
//
// Each component goes through the same operator rule table as the scalar
// kernel: operands are converted into the rule's target units, the operator
// runs over the unpacked doubles and the rule's result unit is attached.
// Results are always stored as doubles.
// ============================================================================

use super::flat_field::{FieldParts, FlatField};
use super::parallel::map_components;
use super::storage::PackedColumn;
use crate::coords::{transform_coordinates, transform_errors, CoordinateSystem, Frame};
use crate::error::{Result, UnitFieldError};
use crate::ops::{binary_units, unary_units, BinaryOp, ErrorMode, SamplingMode, UnaryOp};
use crate::scalar::{Real, RealTuple};
use crate::types::{FunctionType, MathType, NamePool};
use crate::uncertainty::ErrorEstimate;
use crate::units::Unit;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Right-hand side of a field operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Field(&'a FlatField),
    Real(&'a Real),
    Tuple(&'a RealTuple),
}

impl<'a> From<&'a FlatField> for Operand<'a> {
    fn from(field: &'a FlatField) -> Self {
        Operand::Field(field)
    }
}

impl<'a> From<&'a Real> for Operand<'a> {
    fn from(real: &'a Real) -> Self {
        Operand::Real(real)
    }
}

impl<'a> From<&'a RealTuple> for Operand<'a> {
    fn from(tuple: &'a RealTuple) -> Self {
        Operand::Tuple(tuple)
    }
}

impl Operand<'_> {
    fn math_type(&self) -> MathType {
        match self {
            Operand::Field(f) => MathType::Function(f.function_type().clone()),
            Operand::Real(r) => MathType::Real(r.real_type().clone()),
            Operand::Tuple(t) => MathType::RealTuple(t.tuple_type().clone()),
        }
    }

    fn is_missing(&self) -> bool {
        match self {
            Operand::Field(f) => f.is_missing(),
            Operand::Real(r) => r.is_missing(),
            Operand::Tuple(t) => t.components().iter().all(Real::is_missing),
        }
    }
}

/// Values of one right-hand component
enum Values {
    Column(Vec<f64>),
    Scalar(f64),
}

struct Column {
    values: Values,
    unit: Option<Unit>,
    error: Option<ErrorEstimate>,
}

/// `values` (in `unit`) and their error re-expressed in `target`; no
/// conversion when there is no target.
fn express(
    values: &[f64],
    unit: Option<&Unit>,
    error: Option<&ErrorEstimate>,
    target: Option<&Unit>,
) -> Result<(Vec<f64>, Option<ErrorEstimate>)> {
    match (target, unit) {
        (Some(t), Some(u)) if t != u => {
            let converted = t.convert(values, u)?;
            let error = error.map(|e| e.convert_to(t)).transpose()?;
            Ok((converted, error))
        }
        _ => Ok((values.to_vec(), error.cloned())),
    }
}

fn usable(error: Option<ErrorEstimate>) -> Option<ErrorEstimate> {
    error.filter(|e| !e.is_missing())
}

impl FlatField {
    /// All-missing double columns for a result of `function_type`.
    fn missing_result(
        &self,
        function_type: &FunctionType,
        units: Vec<Option<Unit>>,
    ) -> Result<FlatField> {
        let n = units.len();
        let length = self.length();
        FlatField::from_parts(FieldParts {
            function_type: function_type.clone(),
            domain: Arc::clone(&self.domain),
            range_units: units,
            range_cs: self.range_cs.clone(),
            discretizations: vec![None; n],
            columns: (0..n).map(|_| PackedColumn::Double(vec![f64::NAN; length])).collect(),
            errors: vec![None; n],
            config: self.config.clone(),
        })
    }

    fn computed_result(
        &self,
        function_type: &FunctionType,
        results: Vec<(Vec<f64>, Option<Unit>, Option<ErrorEstimate>)>,
    ) -> Result<FlatField> {
        let n = results.len();
        let mut range_units = Vec::with_capacity(n);
        let mut columns = Vec::with_capacity(n);
        let mut errors = Vec::with_capacity(n);
        for (values, unit, error) in results {
            columns.push(PackedColumn::Double(values));
            range_units.push(unit);
            errors.push(error);
        }
        FlatField::from_parts(FieldParts {
            function_type: function_type.clone(),
            domain: Arc::clone(&self.domain),
            range_units,
            range_cs: self.range_cs.clone(),
            discretizations: vec![None; n],
            columns,
            errors,
            config: self.config.clone(),
        })
    }

    fn check_result_type(&self, result_type: &FunctionType) -> Result<()> {
        let count = result_type.flat_components()?.len();
        if count != self.components.len()
            || result_type.domain_dimension() != self.domain.dimension()
        {
            return Err(UnitFieldError::shape(format!(
                "result type {result_type} does not fit {}",
                self.function_type
            )));
        }
        Ok(())
    }

    /// Range groups, with their component spans, whose coordinate system
    /// differs from a tuple operand's.
    fn reframed_groups(&self, cs: Option<&Arc<CoordinateSystem>>) -> Vec<(usize, Range<usize>)> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(g, _)| cs != self.range_cs[*g].as_ref())
            .map(|(g, &(start, len))| (g, start..start + len))
            .collect()
    }

    /// Range groups laid out alike in both fields but in different
    /// coordinate systems.
    fn reframed_field_groups(&self, other: &FlatField) -> Vec<(usize, Range<usize>)> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(g, group)| {
                other.groups.get(*g) == Some(*group) && other.range_cs[*g] != self.range_cs[*g]
            })
            .map(|(g, &(start, len))| (g, start..start + len))
            .collect()
    }

    /// Operand units as they reach the operator: components moved into this
    /// field's coordinate systems take this field's units.
    ///
    /// # Errors
    /// `ShapeMismatch` when the operand's component count differs, or when
    /// a tuple with a coordinate system meets more than one range group.
    fn operand_units(&self, other: Operand<'_>) -> Result<Vec<Option<Unit>>> {
        let n = self.components.len();
        let (mut units, reframed) = match other {
            Operand::Real(r) => return Ok(vec![r.unit().cloned(); n]),
            Operand::Tuple(t) => {
                if t.dimension() != n {
                    return Err(UnitFieldError::shape(format!(
                        "{}-component tuple against {n} range components",
                        t.dimension()
                    )));
                }
                if t.coordinate_system().is_some() && self.groups.len() > 1 {
                    return Err(UnitFieldError::shape(format!(
                        "tuple with a coordinate system against {} range groups",
                        self.groups.len()
                    )));
                }
                (t.units(), self.reframed_groups(t.coordinate_system()))
            }
            Operand::Field(f) => {
                if f.component_count() != n {
                    return Err(UnitFieldError::shape(format!(
                        "{} range components against {n}",
                        f.component_count()
                    )));
                }
                (f.range_units.clone(), self.reframed_field_groups(f))
            }
        };
        for (_, span) in reframed {
            units[span.clone()].clone_from_slice(&self.range_units[span]);
        }
        Ok(units)
    }

    /// Right-hand columns sampled on this field's domain, in this field's
    /// range coordinate systems.
    fn operand_columns(
        &self,
        other: Operand<'_>,
        sampling: SamplingMode,
        errors: ErrorMode,
    ) -> Result<Vec<Column>> {
        let n = self.components.len();
        match other {
            Operand::Real(r) => Ok((0..n)
                .map(|_| Column {
                    values: Values::Scalar(r.value()),
                    unit: r.unit().cloned(),
                    error: r.error().cloned(),
                })
                .collect()),
            Operand::Tuple(t) => {
                let tuple_cs = t.coordinate_system();
                let mut values = t.values();
                let mut units = t.units();
                for (g, span) in self.reframed_groups(tuple_cs) {
                    let columns: Vec<Vec<f64>> =
                        values[span.clone()].iter().map(|v| vec![*v]).collect();
                    let from_units = units[span.clone()].to_vec();
                    let moved = transform_coordinates(
                        Frame::new(self.range_cs[g].as_deref(), &self.range_units[span.clone()]),
                        Frame::new(tuple_cs.map(|cs| cs.as_ref()), &from_units),
                        &columns,
                    )?;
                    for (i, column) in moved.into_iter().enumerate() {
                        values[span.start + i] = column[0];
                        units[span.start + i] = self.range_units[span.start + i].clone();
                    }
                }
                Ok(values
                    .into_iter()
                    .zip(units)
                    .zip(t.components())
                    .map(|((v, unit), c)| Column {
                        values: Values::Scalar(v),
                        unit,
                        error: c.error().cloned(),
                    })
                    .collect())
            }
            Operand::Field(f) => {
                let resampled;
                let source = if f.domain.same_samples(&self.domain) {
                    f
                } else {
                    debug!(samples = self.length(), "resampling right operand onto left domain");
                    resampled = f.resample(&self.domain, sampling, errors)?;
                    &resampled
                };
                let mut values = source.values()?;
                let mut units = source.range_units.clone();
                let mut errs = source.range_errors();

                for (g, span) in self.reframed_field_groups(source) {
                    let start = span.start;
                    let to_units = &self.range_units[span.clone()];
                    let to = Frame::new(self.range_cs[g].as_deref(), to_units);
                    let from_units = units[span.clone()].to_vec();
                    let from = Frame::new(source.range_cs[g].as_deref(), &from_units);
                    let moved = transform_coordinates(to, from, &values[span.clone()])?;
                    let group_errors: Option<Vec<ErrorEstimate>> =
                        errs[span.clone()].iter().cloned().collect();
                    let moved_errors = group_errors
                        .map(|e| transform_errors(to, from, &e))
                        .transpose()?;
                    for (i, column) in moved.into_iter().enumerate() {
                        values[start + i] = column;
                        units[start + i] = self.range_units[start + i].clone();
                        errs[start + i] = moved_errors.as_ref().map(|e| e[i].clone());
                    }
                }

                Ok(values
                    .into_iter()
                    .zip(units)
                    .zip(errs)
                    .map(|((v, unit), error)| Column {
                        values: Values::Column(v),
                        unit,
                        error,
                    })
                    .collect())
            }
        }
    }

    // ========================================================================
    // Binary Operators
    // ========================================================================

    /// `self op other` sampled on this field's domain, carrying
    /// `result_type` (usually from [`MathType::binary`]).
    ///
    /// A field operand over a different domain is resampled with
    /// `sampling` first. When either side is entirely missing the result is
    /// entirely missing and no arithmetic runs.
    ///
    /// # Errors
    /// - `ShapeMismatch` when component counts disagree
    /// - `IncompatibleUnitOperation` for operators the unit rules reject
    pub fn binary<'a>(
        &self,
        other: impl Into<Operand<'a>>,
        op: BinaryOp,
        result_type: &FunctionType,
        sampling: SamplingMode,
        errors: ErrorMode,
    ) -> Result<FlatField> {
        let other = other.into();
        self.check_result_type(result_type)?;
        let n = self.components.len();

        let units = self.operand_units(other)?;
        // unit rules are checked even when no arithmetic runs
        let result_units = self
            .range_units
            .iter()
            .zip(&units)
            .map(|(l, r)| binary_units(op, l.as_ref(), r.as_ref()).map(|rule| rule.result))
            .collect::<Result<Vec<_>>>()?;

        if self.is_missing() || other.is_missing() {
            debug!(op = %op, "operand entirely missing, skipping arithmetic");
            return self.missing_result(result_type, result_units);
        }

        let right = self.operand_columns(other, sampling, errors)?;
        let left_values = self.values()?;
        let left_errors = self.range_errors();
        debug!(op = %op, samples = self.length(), components = n, "field binary");

        let results = map_components(n, self.length(), &self.config, |k| {
            let rule = binary_units(op, self.range_units[k].as_ref(), right[k].unit.as_ref())?;
            let (a, ea) = express(
                &left_values[k],
                self.range_units[k].as_ref(),
                left_errors[k].as_ref(),
                rule.left_target.as_ref(),
            )?;
            let column = &right[k];
            let values: Vec<f64> = match &column.values {
                Values::Column(b) => {
                    let target = rule.right_target.as_ref();
                    let (b, _) = express(b, column.unit.as_ref(), None, target)?;
                    a.iter().zip(&b).map(|(x, y)| op.apply(*x, *y)).collect()
                }
                Values::Scalar(s) => {
                    let target = rule.right_target.as_ref();
                    let (b, _) = express(&[*s], column.unit.as_ref(), None, target)?;
                    a.iter().map(|x| op.apply(*x, b[0])).collect()
                }
            };
            let eb = match (&column.error, &column.unit, &rule.right_target) {
                (Some(e), Some(u), Some(t)) if u != t => Some(e.convert_to(t)?),
                (e, _, _) => e.clone(),
            };
            let error = match (usable(ea), usable(eb)) {
                (Some(ea), Some(eb)) if errors != ErrorMode::NoErrors => {
                    let unit = rule.result.clone();
                    Some(ErrorEstimate::from_binary_values(&values, unit, op, &ea, &eb, errors)?)
                }
                _ => None,
            };
            Ok((values, rule.result, error))
        })?;
        self.computed_result(result_type, results)
    }

    /// Infer the result type through `names`, then apply
    /// [`FlatField::binary`] with explicit modes.
    pub fn compute_with<'a>(
        &self,
        other: impl Into<Operand<'a>>,
        op: BinaryOp,
        names: &mut NamePool,
        sampling: SamplingMode,
        errors: ErrorMode,
    ) -> Result<FlatField> {
        let other = other.into();
        let inferred =
            MathType::Function(self.function_type.clone()).binary(&other.math_type(), op, names)?;
        match inferred {
            MathType::Function(result_type) => {
                self.binary(other, op, &result_type, sampling, errors)
            }
            unexpected => Err(UnitFieldError::malformed(format!(
                "expected a function result type, got {unexpected}"
            ))),
        }
    }

    /// [`FlatField::compute_with`] using this field's configured modes.
    pub fn compute<'a>(
        &self,
        other: impl Into<Operand<'a>>,
        op: BinaryOp,
        names: &mut NamePool,
    ) -> Result<FlatField> {
        self.compute_with(other, op, names, self.config.sampling_mode, self.config.error_mode)
    }

    // ========================================================================
    // Unary Operators
    // ========================================================================

    /// `op(self)` carrying `result_type`.
    pub fn unary(
        &self,
        op: UnaryOp,
        result_type: &FunctionType,
        errors: ErrorMode,
    ) -> Result<FlatField> {
        self.check_result_type(result_type)?;
        let n = self.components.len();
        if self.is_missing() {
            let units = self
                .range_units
                .iter()
                .map(|u| unary_units(op, u.as_ref()).result)
                .collect();
            return self.missing_result(result_type, units);
        }

        let values = self.values()?;
        let source_errors = self.range_errors();
        debug!(op = %op, samples = self.length(), components = n, "field unary");
        let results = map_components(n, self.length(), &self.config, |k| {
            let rule = unary_units(op, self.range_units[k].as_ref());
            let (a, ea) = express(
                &values[k],
                self.range_units[k].as_ref(),
                source_errors[k].as_ref(),
                rule.source_target.as_ref(),
            )?;
            let out: Vec<f64> = a.iter().map(|x| rule.effective.apply(*x)).collect();
            let error = match usable(ea) {
                Some(ea) if errors != ErrorMode::NoErrors => Some(ErrorEstimate::from_unary_values(
                    &out,
                    rule.result.clone(),
                    rule.effective,
                    &ea,
                    errors,
                )),
                _ => None,
            };
            Ok((out, rule.result, error))
        })?;
        self.computed_result(result_type, results)
    }

    /// Infer the result type through `names`, then apply
    /// [`FlatField::unary`] with this field's configured error mode.
    pub fn compute_unary(&self, op: UnaryOp, names: &mut NamePool) -> Result<FlatField> {
        match MathType::Function(self.function_type.clone()).unary(op, names)? {
            MathType::Function(result_type) => self.unary(op, &result_type, self.config.error_mode),
            unexpected => Err(UnitFieldError::malformed(format!(
                "expected a function result type, got {unexpected}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::coords::CoordinateSystem;
    use crate::field::StorageCode;
    use crate::sets::{Discretization, DomainSet, Linear1D};
    use crate::types::{RealTupleType, RealType, TypeRegistry};
    use crate::units::catalog;
    use std::f64::consts::PI;

    fn axis() -> RealType {
        RealType::new("ArithX", Some(catalog::meter()), false).unwrap()
    }

    fn lattice(length: usize) -> DomainSet {
        DomainSet::linear(
            RealTupleType::new(vec![axis()]).unwrap(),
            vec![Linear1D::new(0.0, (length - 1) as f64, length).unwrap()],
        )
        .unwrap()
    }

    fn scalar_type(name: &str, unit: Unit) -> FunctionType {
        FunctionType::new(
            MathType::Real(axis()),
            MathType::Real(RealType::new(name, Some(unit), false).unwrap()),
        )
        .unwrap()
    }

    fn field(name: &str, unit: Unit, values: Vec<f64>) -> FlatField {
        let f = FlatField::new(scalar_type(name, unit), lattice(values.len())).unwrap();
        f.set_samples(&[values], None).unwrap();
        f
    }

    fn pool() -> NamePool {
        NamePool::with_registry(TypeRegistry::new())
    }

    #[test]
    fn test_add_converts_right_operand() {
        let kelvin = field("ArithTempK", catalog::kelvin(), vec![300.0, 310.0]);
        let celsius = field("ArithTempC", catalog::celsius(), vec![0.0, 10.0]);
        let sum = kelvin.compute(&celsius, BinaryOp::Add, &mut pool()).unwrap();
        let values = sum.values().unwrap();
        assert!((values[0][0] - 573.15).abs() < 1e-9);
        assert!((values[0][1] - 593.15).abs() < 1e-9);
        assert_eq!(sum.range_units()[0], Some(catalog::kelvin()));
        assert_eq!(sum.storage_codes(), &[StorageCode::Double]);
    }

    #[test]
    fn test_quantized_operands_give_double_result() {
        let ft = scalar_type("ArithCount", Unit::dimensionless());
        let counts = FlatField::builder(ft, lattice(3))
            .discretization(0, Discretization::integer(100).unwrap())
            .build()
            .unwrap();
        counts.set_samples(&[vec![1.0, 2.0, 3.0]], None).unwrap();
        assert_eq!(counts.storage_codes(), &[StorageCode::Byte]);
        let ratio = RealType::new("ArithHalf", Some(Unit::dimensionless()), false).unwrap();
        let half = counts
            .compute(&Real::new(ratio, 0.5), BinaryOp::Multiply, &mut pool())
            .unwrap();
        assert_eq!(half.storage_codes(), &[StorageCode::Double]);
        assert_eq!(half.values().unwrap(), vec![vec![0.5, 1.0, 1.5]]);
    }

    #[test]
    fn test_missing_operand_short_circuits() {
        let present = field("ArithPresent", catalog::meter(), vec![1.0, 2.0]);
        let absent =
            FlatField::new(scalar_type("ArithAbsent", catalog::meter()), lattice(2)).unwrap();
        for op in [BinaryOp::Add, BinaryOp::Multiply, BinaryOp::Divide, BinaryOp::Max] {
            let out = present.compute(&absent, op, &mut pool()).unwrap();
            assert!(out.is_missing());
            assert_eq!(out.length(), 2);
            assert!(out.values().unwrap()[0].iter().all(|v| v.is_nan()));
        }
        let out = absent.compute(&present, BinaryOp::Subtract, &mut pool()).unwrap();
        assert!(out.is_missing());
    }

    #[test]
    fn test_offset_multiply_is_rejected() {
        let celsius = field("ArithHotC", catalog::celsius(), vec![1.0, 2.0]);
        let other = field("ArithHotC2", catalog::celsius(), vec![1.0, 2.0]);
        assert!(matches!(
            celsius.binary(
                &other,
                BinaryOp::Multiply,
                celsius.function_type(),
                SamplingMode::WeightedAverage,
                ErrorMode::Independent
            ),
            Err(UnitFieldError::IncompatibleUnitOperation(_))
        ));
    }

    #[test]
    fn test_errors_propagate_through_add() {
        let a = field("ArithErrA", catalog::meter(), vec![1.0, 3.0]);
        let b = field("ArithErrB", catalog::meter(), vec![1.0, 1.0]);
        let error_a = ErrorEstimate::new(2.0, 3.0, Some(catalog::meter()));
        a.set_samples(&[vec![1.0, 3.0]], Some(vec![error_a])).unwrap();
        let error_b = ErrorEstimate::new(1.0, 4.0, Some(catalog::meter()));
        b.set_samples(&[vec![1.0, 1.0]], Some(vec![error_b])).unwrap();
        let add = |mode| {
            let weighted = SamplingMode::WeightedAverage;
            a.binary(&b, BinaryOp::Add, a.function_type(), weighted, mode)
        };
        let independent = add(ErrorMode::Independent).unwrap();
        let dependent = add(ErrorMode::Dependent).unwrap();
        let ei = independent.range_errors()[0].clone().unwrap();
        let ed = dependent.range_errors()[0].clone().unwrap();
        assert!((ei.error_value() - 5.0).abs() < 1e-12);
        assert!((ed.error_value() - 7.0).abs() < 1e-12);
        assert!((ei.mean() - 3.0).abs() < 1e-12);
        let none = add(ErrorMode::NoErrors).unwrap();
        assert!(none.range_errors()[0].is_none());
    }

    #[test]
    fn test_other_domain_is_resampled() {
        let coarse = field("ArithCoarse", catalog::meter(), vec![0.0, 10.0]);
        let fine_domain = DomainSet::linear(
            RealTupleType::new(vec![axis()]).unwrap(),
            vec![Linear1D::new(0.0, 1.0, 3).unwrap()],
        )
        .unwrap();
        let fine = FlatField::new(scalar_type("ArithFine", catalog::meter()), fine_domain).unwrap();
        fine.set_samples(&[vec![1.0, 1.0, 1.0]], None).unwrap();
        let sum = fine.compute(&coarse, BinaryOp::Add, &mut pool()).unwrap();
        assert_eq!(sum.values().unwrap(), vec![vec![1.0, 6.0, 11.0]]);
    }

    #[test]
    fn test_unary_and_parallel_agree() {
        let angles = field("ArithAngle", catalog::degree(), vec![0.0, 90.0, 180.0]);
        let sines = angles.compute_unary(UnaryOp::Sin, &mut pool()).unwrap();
        let values = sines.values().unwrap();
        assert!(values[0][0].abs() < 1e-12);
        assert!((values[0][1] - 1.0).abs() < 1e-12);

        let wind = RealTupleType::new(vec![
            RealType::new("ArithU", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithV", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap();
        let ft = FunctionType::new(MathType::Real(axis()), MathType::RealTuple(wind)).unwrap();
        let serial = FlatField::builder(ft.clone(), lattice(3))
            .config(EngineConfig::exact())
            .build()
            .unwrap();
        let threaded = FlatField::builder(ft, lattice(3))
            .config(EngineConfig::new().with_parallel_threshold(1))
            .build()
            .unwrap();
        for f in [&serial, &threaded] {
            f.set_samples(&[vec![-1.0, 2.0, -3.0], vec![4.0, -5.0, 6.0]], None).unwrap();
        }
        let a = serial.compute_unary(UnaryOp::Abs, &mut pool()).unwrap();
        let b = threaded.compute_unary(UnaryOp::Abs, &mut pool()).unwrap();
        assert_eq!(a.values().unwrap(), b.values().unwrap());
        assert_eq!(a.values().unwrap()[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_tuple_operand_in_other_frame() {
        let cartesian = RealTupleType::new(vec![
            RealType::new("ArithEast", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithNorth", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap();
        let polar = RealTupleType::new(vec![
            RealType::new("ArithRange", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithBearing", Some(catalog::radian()), false).unwrap(),
        ])
        .unwrap()
        .with_coordinate_system(Arc::new(CoordinateSystem::polar(cartesian.clone()).unwrap()))
        .unwrap();
        let range = MathType::RealTuple(cartesian.clone());
        let ft = FunctionType::new(MathType::Real(axis()), range).unwrap();
        let positions = FlatField::new(ft.clone(), lattice(2)).unwrap();
        positions.set_samples(&[vec![0.0, 1.0], vec![0.0, 1.0]], None).unwrap();
        let offset = RealTuple::from_values(polar, &[2.0, PI / 2.0]).unwrap();
        let moved = positions
            .binary(&offset, BinaryOp::Add, &ft, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap();
        let values = moved.values().unwrap();
        assert!((values[0][1] - 1.0).abs() < 1e-12);
        assert!((values[1][1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_operand_is_still_validated() {
        let present = field("ArithKnown", catalog::meter(), vec![1.0, 2.0]);
        let pair = RealTupleType::new(vec![
            RealType::new("ArithLeft", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithRight", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap();
        let wide_type =
            FunctionType::new(MathType::Real(axis()), MathType::RealTuple(pair)).unwrap();
        let wide = FlatField::new(wide_type, lattice(2)).unwrap();
        assert!(wide.is_missing());
        assert!(matches!(
            present.binary(
                &wide,
                BinaryOp::Add,
                present.function_type(),
                SamplingMode::WeightedAverage,
                ErrorMode::Independent
            ),
            Err(UnitFieldError::ShapeMismatch(_))
        ));

        let warm = field("ArithWarmC", catalog::celsius(), vec![1.0, 2.0]);
        let unset =
            FlatField::new(scalar_type("ArithUnsetC", catalog::celsius()), lattice(2)).unwrap();
        assert!(matches!(
            warm.binary(
                &unset,
                BinaryOp::Multiply,
                warm.function_type(),
                SamplingMode::WeightedAverage,
                ErrorMode::Independent
            ),
            Err(UnitFieldError::IncompatibleUnitOperation(_))
        ));
    }

    #[test]
    fn test_tuple_operand_against_several_range_groups() {
        let cartesian = RealTupleType::new(vec![
            RealType::new("ArithGridX", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithGridY", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap();
        let polar = RealTupleType::new(vec![
            RealType::new("ArithRadius", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithAzimuth", Some(catalog::radian()), false).unwrap(),
        ])
        .unwrap()
        .with_coordinate_system(Arc::new(CoordinateSystem::polar(cartesian).unwrap()))
        .unwrap();
        let heat = RealType::new("ArithHeat", Some(catalog::kelvin()), false).unwrap();
        let members = vec![MathType::RealTuple(polar), MathType::Real(heat.clone())];
        let range = MathType::tuple(members).unwrap();
        let ft = FunctionType::new(MathType::Real(axis()), range).unwrap();
        let field = FlatField::new(ft.clone(), lattice(1)).unwrap();
        assert_eq!(field.range_groups(), &[(0, 2), (2, 1)]);
        field.set_samples(&[vec![1.0], vec![0.0], vec![280.0]], None).unwrap();

        // a plain tuple is reference coordinates for the polar group only
        let plain = RealTupleType::new(vec![
            RealType::new("ArithShiftX", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithShiftY", Some(catalog::meter()), false).unwrap(),
            heat,
        ])
        .unwrap();
        let shift = RealTuple::from_values(plain, &[0.0, 1.0, 5.0]).unwrap();
        let moved = field
            .binary(&shift, BinaryOp::Add, &ft, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap();
        let values = moved.values().unwrap();
        assert!((values[0][0] - 2.0).abs() < 1e-12);
        assert!((values[1][0] - PI / 2.0).abs() < 1e-12);
        assert!((values[2][0] - 285.0).abs() < 1e-12);

        let space = RealTupleType::new(vec![
            RealType::new("ArithSpaceX", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithSpaceY", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithSpaceZ", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap();
        let cylinder = RealTupleType::new(vec![
            RealType::new("ArithCylR", Some(catalog::meter()), false).unwrap(),
            RealType::new("ArithCylT", Some(catalog::radian()), false).unwrap(),
            RealType::new("ArithCylZ", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap()
        .with_coordinate_system(Arc::new(CoordinateSystem::cylindrical(space).unwrap()))
        .unwrap();
        let framed = RealTuple::from_values(cylinder, &[1.0, 0.0, 0.0]).unwrap();
        assert!(matches!(
            field.binary(
                &framed,
                BinaryOp::Add,
                &ft,
                SamplingMode::WeightedAverage,
                ErrorMode::NoErrors
            ),
            Err(UnitFieldError::ShapeMismatch(_))
        ));
    }
}
