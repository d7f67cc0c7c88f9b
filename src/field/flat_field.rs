// ============================================================================
// Flat Field
// Columnar sampling of a flat function over a domain set
// ============================================================================
//
// One packed column per flattened range component, each with its own unit,
// storage code, optional discretization and optional error estimate. Range
// RealTupleTypes form groups that share one coordinate system.
//
// The columns, errors and the "any present" flag sit behind a single
// RwLock: sample setters swap them in one write scope, so readers never see
// a mix of old and new columns.
// ============================================================================

use super::parallel::map_components;
use super::storage::{PackedColumn, StorageCode};
use crate::config::{EngineConfig, FloatStorage};
use crate::coords::CoordinateSystem;
use crate::error::{Result, UnitFieldError};
use crate::scalar::Real;
use crate::sets::{Discretization, DomainSet};
use crate::types::{FunctionType, MathType, RealType};
use crate::uncertainty::ErrorEstimate;
use crate::units::{convert_values, unit_label, Unit};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Mutable content of a field
#[derive(Debug, Clone)]
pub(super) struct FieldState {
    pub(super) columns: Vec<PackedColumn>,
    pub(super) errors: Vec<Option<ErrorEstimate>>,
    pub(super) any_present: bool,
}

/// Everything a derived field is assembled from.
pub(super) struct FieldParts {
    pub(super) function_type: FunctionType,
    pub(super) domain: Arc<DomainSet>,
    pub(super) range_units: Vec<Option<Unit>>,
    pub(super) range_cs: Vec<Option<Arc<CoordinateSystem>>>,
    pub(super) discretizations: Vec<Option<Discretization>>,
    pub(super) columns: Vec<PackedColumn>,
    pub(super) errors: Vec<Option<ErrorEstimate>>,
    pub(super) config: EngineConfig,
}

/// A flat function sampled at every point of its domain set.
pub struct FlatField {
    pub(super) function_type: FunctionType,
    pub(super) domain: Arc<DomainSet>,
    pub(super) components: Vec<RealType>,
    pub(super) groups: Vec<(usize, usize)>,
    pub(super) range_units: Vec<Option<Unit>>,
    pub(super) range_cs: Vec<Option<Arc<CoordinateSystem>>>,
    pub(super) discretizations: Vec<Option<Discretization>>,
    pub(super) codes: Vec<StorageCode>,
    pub(super) config: EngineConfig,
    pub(super) state: RwLock<FieldState>,
}

/// `(start, len)` of each range member in flattened component order.
pub(super) fn range_groups(range: &MathType) -> Vec<(usize, usize)> {
    match range {
        MathType::RealTuple(t) => vec![(0, t.dimension())],
        MathType::Tuple(t) => {
            let mut offset = 0;
            t.components()
                .iter()
                .map(|c| {
                    let len = match c {
                        MathType::RealTuple(rt) => rt.dimension(),
                        _ => 1,
                    };
                    let group = (offset, len);
                    offset += len;
                    group
                })
                .collect()
        }
        _ => vec![(0, 1)],
    }
}

fn default_coordinate_systems(
    function_type: &FunctionType,
    groups: &[(usize, usize)],
) -> Vec<Option<Arc<CoordinateSystem>>> {
    let per_component = function_type.range_coordinate_systems();
    groups
        .iter()
        .map(|(start, _)| per_component.get(*start).cloned().flatten().map(|(cs, _)| cs))
        .collect()
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`FlatField`]
pub struct FlatFieldBuilder {
    function_type: FunctionType,
    domain: Arc<DomainSet>,
    range_units: Option<Vec<Option<Unit>>>,
    discretizations: Vec<(usize, Discretization)>,
    coordinate_systems: Vec<(usize, Option<Arc<CoordinateSystem>>)>,
    storage: Option<FloatStorage>,
    config: Option<EngineConfig>,
}

impl FlatFieldBuilder {
    /// Builder method: Set the units range values are expressed in
    pub fn range_units(mut self, units: Vec<Option<Unit>>) -> Self {
        self.range_units = Some(units);
        self
    }

    /// Builder method: Quantize component `component` over `discretization`
    pub fn discretization(mut self, component: usize, discretization: Discretization) -> Self {
        self.discretizations.push((component, discretization));
        self
    }

    /// Builder method: Set the coordinate system of range member `group`
    pub fn coordinate_system(mut self, group: usize, cs: Option<Arc<CoordinateSystem>>) -> Self {
        self.coordinate_systems.push((group, cs));
        self
    }

    /// Builder method: Set storage for undiscretized components
    pub fn float_storage(mut self, storage: FloatStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Builder method: Use an engine configuration other than the global one
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Allocate an all-missing field.
    ///
    /// # Errors
    /// - `MalformedType` when the function is not flat or a coordinate
    ///   system does not fit its range member
    /// - `ShapeMismatch` when the domain set's dimension, the unit count or
    ///   a component/group index disagree with the function type
    /// - `UnitConversion` when a range unit is not convertible to its
    ///   component's default unit
    pub fn build(self) -> Result<FlatField> {
        let function_type = self.function_type;
        let components = function_type.flat_components()?;
        let n = components.len();
        if self.domain.dimension() != function_type.domain_dimension() {
            return Err(UnitFieldError::shape(format!(
                "{}-D domain set for {function_type}",
                self.domain.dimension()
            )));
        }

        let range_units = match self.range_units {
            Some(units) => {
                if units.len() != n {
                    return Err(UnitFieldError::shape(format!(
                        "{} range units for {n} components",
                        units.len()
                    )));
                }
                for (c, u) in components.iter().zip(&units) {
                    if let (Some(default), Some(given)) = (c.default_unit(), u.as_ref()) {
                        if !default.is_convertible(given) {
                            return Err(UnitFieldError::conversion(format!(
                                "{given} is not convertible to {default} of {c}"
                            )));
                        }
                    }
                }
                units
            }
            None => components.iter().map(|c| c.default_unit().cloned()).collect(),
        };

        let mut discretizations: Vec<Option<Discretization>> =
            components.iter().map(|c| c.default_discretization().cloned()).collect();
        for (k, d) in self.discretizations {
            let slot = discretizations.get_mut(k).ok_or_else(|| {
                UnitFieldError::shape(format!("discretization for component {k} of {n}"))
            })?;
            *slot = Some(d);
        }

        let groups = range_groups(function_type.range());
        let mut range_cs = default_coordinate_systems(&function_type, &groups);
        for (g, cs) in self.coordinate_systems {
            let (_, len) = *groups.get(g).ok_or_else(|| {
                UnitFieldError::shape(format!("coordinate system for range member {g}"))
            })?;
            if let Some(cs) = &cs {
                if cs.dimension() != len {
                    return Err(UnitFieldError::malformed(format!(
                        "coordinate system of dimension {} for a {len}-component range member",
                        cs.dimension()
                    )));
                }
            }
            range_cs[g] = cs;
        }

        let config = self.config.unwrap_or_else(|| EngineConfig::global().clone());
        let storage = self.storage.unwrap_or(config.default_storage);
        let codes: Vec<StorageCode> = discretizations
            .iter()
            .map(|d| StorageCode::for_discretization(d.as_ref(), storage))
            .collect();

        let length = self.domain.length();
        debug!(
            function = %function_type,
            samples = length,
            codes = ?codes,
            "field allocated"
        );
        let state = FieldState {
            columns: codes.iter().map(|c| PackedColumn::missing(*c, length)).collect(),
            errors: vec![None; n],
            any_present: false,
        };
        Ok(FlatField {
            function_type,
            domain: self.domain,
            components,
            groups,
            range_units,
            range_cs,
            discretizations,
            codes,
            config,
            state: RwLock::new(state),
        })
    }
}

impl FlatField {
    /// Start building a field of `function_type` over `domain`.
    pub fn builder(
        function_type: FunctionType,
        domain: impl Into<Arc<DomainSet>>,
    ) -> FlatFieldBuilder {
        FlatFieldBuilder {
            function_type,
            domain: domain.into(),
            range_units: None,
            discretizations: Vec::new(),
            coordinate_systems: Vec::new(),
            storage: None,
            config: None,
        }
    }

    /// Shorthand for an all-missing field with every default.
    pub fn new(function_type: FunctionType, domain: impl Into<Arc<DomainSet>>) -> Result<Self> {
        Self::builder(function_type, domain).build()
    }

    /// Assemble a field from computed columns.
    pub(super) fn from_parts(parts: FieldParts) -> Result<Self> {
        let components = parts.function_type.flat_components()?;
        let n = components.len();
        let length = parts.domain.length();
        if parts.columns.len() != n
            || parts.range_units.len() != n
            || parts.discretizations.len() != n
            || parts.errors.len() != n
        {
            return Err(UnitFieldError::shape(format!(
                "{} columns for {n} components of {}",
                parts.columns.len(),
                parts.function_type
            )));
        }
        if let Some(bad) = parts.columns.iter().find(|c| c.len() != length) {
            return Err(UnitFieldError::shape(format!(
                "column of length {} over {length} samples",
                bad.len()
            )));
        }
        let groups = range_groups(parts.function_type.range());
        let range_cs = if parts.range_cs.len() == groups.len() {
            parts.range_cs
        } else {
            vec![None; groups.len()]
        };
        let codes = parts.columns.iter().map(PackedColumn::code).collect();
        let any_present = parts.columns.iter().any(PackedColumn::any_present);
        Ok(Self {
            function_type: parts.function_type,
            domain: parts.domain,
            components,
            groups,
            range_units: parts.range_units,
            range_cs,
            discretizations: parts.discretizations,
            codes,
            config: parts.config,
            state: RwLock::new(FieldState {
                columns: parts.columns,
                errors: parts.errors,
                any_present,
            }),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn function_type(&self) -> &FunctionType {
        &self.function_type
    }

    #[inline]
    pub fn domain(&self) -> &Arc<DomainSet> {
        &self.domain
    }

    /// Flattened range component types
    #[inline]
    pub fn components(&self) -> &[RealType] {
        &self.components
    }

    /// Number of flattened range components
    #[inline]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of samples
    #[inline]
    pub fn length(&self) -> usize {
        self.domain.length()
    }

    #[inline]
    pub fn range_units(&self) -> &[Option<Unit>] {
        &self.range_units
    }

    pub fn range_errors(&self) -> Vec<Option<ErrorEstimate>> {
        self.state.read().errors.clone()
    }

    #[inline]
    pub fn storage_codes(&self) -> &[StorageCode] {
        &self.codes
    }

    #[inline]
    pub fn discretizations(&self) -> &[Option<Discretization>] {
        &self.discretizations
    }

    /// `(start, len)` of each range member in flattened component order
    #[inline]
    pub fn range_groups(&self) -> &[(usize, usize)] {
        &self.groups
    }

    /// Coordinate system of each range member
    #[inline]
    pub fn range_coordinate_systems(&self) -> &[Option<Arc<CoordinateSystem>>] {
        &self.range_cs
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True until any component of any sample is set to a non-missing value
    pub fn is_missing(&self) -> bool {
        !self.state.read().any_present
    }

    // ========================================================================
    // Sample Input
    // ========================================================================

    fn check_columns<T>(&self, values: &[Vec<T>]) -> Result<()> {
        let length = self.length();
        if values.len() != self.components.len() {
            return Err(UnitFieldError::shape(format!(
                "{} value columns for {} components",
                values.len(),
                self.components.len()
            )));
        }
        if let Some(bad) = values.iter().find(|c| c.len() != length) {
            return Err(UnitFieldError::shape(format!(
                "value column of length {} for {length} samples",
                bad.len()
            )));
        }
        Ok(())
    }

    fn check_errors(
        &self,
        errors: Option<Vec<ErrorEstimate>>,
    ) -> Result<Vec<Option<ErrorEstimate>>> {
        match errors {
            None => Ok(vec![None; self.components.len()]),
            Some(errors) if errors.len() == self.components.len() => {
                Ok(errors.into_iter().map(Some).collect())
            }
            Some(errors) => Err(UnitFieldError::shape(format!(
                "{} error estimates for {} components",
                errors.len(),
                self.components.len()
            ))),
        }
    }

    fn store(&self, columns: Vec<PackedColumn>, errors: Vec<Option<ErrorEstimate>>) {
        let any_present = columns.iter().any(PackedColumn::any_present);
        let mut state = self.state.write();
        state.columns = columns;
        state.errors = errors;
        state.any_present = any_present;
    }

    /// Replace every sample. `values` holds one column per component in
    /// [`FlatField::range_units`]; `errors` replaces the range errors.
    ///
    /// # Errors
    /// - `ShapeMismatch` for a wrong column count or length
    /// - `Discretization` when a value lies outside its component's
    ///   discretization
    pub fn set_samples(
        &self,
        values: &[Vec<f64>],
        errors: Option<Vec<ErrorEstimate>>,
    ) -> Result<()> {
        self.check_columns(values)?;
        let errors = self.check_errors(errors)?;
        let columns = map_components(self.components.len(), self.length(), &self.config, |k| {
            PackedColumn::pack(self.codes[k], &values[k], self.discretizations[k].as_ref())
        })?;
        self.store(columns, errors);
        Ok(())
    }

    /// Single-precision variant of [`FlatField::set_samples`].
    pub fn set_float_samples(
        &self,
        values: &[Vec<f32>],
        errors: Option<Vec<ErrorEstimate>>,
    ) -> Result<()> {
        self.check_columns(values)?;
        let errors = self.check_errors(errors)?;
        let columns = map_components(self.components.len(), self.length(), &self.config, |k| {
            PackedColumn::pack_floats(self.codes[k], &values[k], self.discretizations[k].as_ref())
        })?;
        self.store(columns, errors);
        Ok(())
    }

    /// Set one sample. Given errors are folded into the range errors.
    pub fn set_sample(
        &self,
        index: usize,
        values: &[f64],
        errors: Option<&[ErrorEstimate]>,
    ) -> Result<()> {
        let n = self.components.len();
        if index >= self.length() {
            return Err(UnitFieldError::shape(format!(
                "sample {index} outside field of length {}",
                self.length()
            )));
        }
        if values.len() != n || errors.is_some_and(|e| e.len() != n) {
            return Err(UnitFieldError::shape(format!(
                "{} values for {n} components",
                values.len()
            )));
        }
        // reject before touching any column
        for (k, v) in values.iter().enumerate() {
            PackedColumn::pack(self.codes[k], &[*v], self.discretizations[k].as_ref())?;
        }

        let mut state = self.state.write();
        // merge every error before the first column is written
        let merged = match errors {
            Some(errors) => values
                .iter()
                .enumerate()
                .map(|(k, v)| {
                    let was_missing = state.columns[k].is_missing_at(index);
                    let increment = u64::from(was_missing && !v.is_nan());
                    let current = state.errors[k].as_ref();
                    ErrorEstimate::merge_sample(current, Some(&errors[k]), *v, increment).map(Some)
                })
                .collect::<Result<Vec<_>>>()?,
            None => state.errors.clone(),
        };
        for (k, v) in values.iter().enumerate() {
            state.columns[k].set(index, *v, self.discretizations[k].as_ref())?;
        }
        state.errors = merged;
        state.any_present = if values.iter().any(|v| !v.is_nan()) {
            true
        } else {
            state.columns.iter().any(PackedColumn::any_present)
        };
        Ok(())
    }

    // ========================================================================
    // Sample Output
    // ========================================================================

    /// Every component unpacked to doubles in [`FlatField::range_units`].
    pub fn values(&self) -> Result<Vec<Vec<f64>>> {
        let state = self.state.read();
        map_components(self.components.len(), self.length(), &self.config, |k| {
            state.columns[k].unpack(self.discretizations[k].as_ref())
        })
    }

    /// Every component unpacked to single precision.
    pub fn floats(&self) -> Result<Vec<Vec<f32>>> {
        let state = self.state.read();
        map_components(self.components.len(), self.length(), &self.config, |k| {
            state.columns[k].unpack_floats(self.discretizations[k].as_ref())
        })
    }

    /// Every component converted to its type's default unit.
    pub fn values_in_default_units(&self) -> Result<Vec<Vec<f64>>> {
        self.values()?
            .into_iter()
            .enumerate()
            .map(|(k, column)| {
                let target = self.components[k].default_unit();
                convert_values(&column, self.range_units[k].as_ref(), target)
            })
            .collect()
    }

    /// One component, unpacked.
    pub fn component(&self, k: usize) -> Result<Vec<f64>> {
        let state = self.state.read();
        let column = state.columns.get(k).ok_or_else(|| {
            UnitFieldError::shape(format!("component {k} of {}", self.components.len()))
        })?;
        column.unpack(self.discretizations[k].as_ref())
    }

    /// Range values of one sample.
    pub fn sample(&self, index: usize) -> Result<Vec<f64>> {
        let state = self.state.read();
        state
            .columns
            .iter()
            .zip(&self.discretizations)
            .map(|(column, d)| column.get(index, d.as_ref()))
            .collect()
    }

    /// One sample as typed quantities carrying the range errors.
    pub fn sample_reals(&self, index: usize) -> Result<Vec<Real>> {
        let values = self.sample(index)?;
        let errors = self.range_errors();
        values
            .into_iter()
            .enumerate()
            .map(|(k, v)| {
                let unit = self.range_units[k].clone();
                let real = Real::with_unit(self.components[k].clone(), v, unit)?;
                Ok(match &errors[k] {
                    Some(e) if !e.is_missing() && !real.is_missing() => {
                        real.with_error(e.error_value())
                    }
                    _ => real,
                })
            })
            .collect()
    }

    /// Minimum and maximum of each component's non-missing values.
    pub fn compute_ranges(&self) -> Result<Vec<Option<(f64, f64)>>> {
        Ok(self
            .values()?
            .iter()
            .map(|column| {
                column.iter().filter(|v| !v.is_nan()).fold(None, |acc, &v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
                })
            })
            .collect())
    }

    // ========================================================================
    // Derived Fields
    // ========================================================================

    /// A field of the same shape, storage and units with every sample
    /// missing.
    pub fn clone_missing(&self) -> FlatField {
        let length = self.length();
        FlatField {
            function_type: self.function_type.clone(),
            domain: Arc::clone(&self.domain),
            components: self.components.clone(),
            groups: self.groups.clone(),
            range_units: self.range_units.clone(),
            range_cs: self.range_cs.clone(),
            discretizations: self.discretizations.clone(),
            codes: self.codes.clone(),
            config: self.config.clone(),
            state: RwLock::new(FieldState {
                columns: self.codes.iter().map(|c| PackedColumn::missing(*c, length)).collect(),
                errors: vec![None; self.components.len()],
                any_present: false,
            }),
        }
    }

    /// A field over the same domain holding only component `k`.
    pub fn extract(&self, k: usize) -> Result<FlatField> {
        let component = self.components.get(k).ok_or_else(|| {
            UnitFieldError::shape(format!("component {k} of {}", self.components.len()))
        })?;
        let function_type = FunctionType::new(
            MathType::RealTuple(self.function_type.domain().clone()),
            MathType::Real(component.clone()),
        )?;
        let state = self.state.read();
        FlatField::from_parts(FieldParts {
            function_type,
            domain: Arc::clone(&self.domain),
            range_units: vec![self.range_units[k].clone()],
            range_cs: vec![None],
            discretizations: vec![self.discretizations[k].clone()],
            columns: vec![state.columns[k].clone()],
            errors: vec![state.errors[k].clone()],
            config: self.config.clone(),
        })
    }
}

impl Clone for FlatField {
    fn clone(&self) -> Self {
        Self {
            function_type: self.function_type.clone(),
            domain: Arc::clone(&self.domain),
            components: self.components.clone(),
            groups: self.groups.clone(),
            range_units: self.range_units.clone(),
            range_cs: self.range_cs.clone(),
            discretizations: self.discretizations.clone(),
            codes: self.codes.clone(),
            config: self.config.clone(),
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Debug for FlatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatField")
            .field("function_type", &self.function_type.to_string())
            .field("length", &self.length())
            .field("codes", &self.codes)
            .field("missing", &self.is_missing())
            .finish()
    }
}

impl fmt::Display for FlatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units: Vec<String> = self.range_units.iter().map(|u| unit_label(u.as_ref())).collect();
        write!(
            f,
            "{} [{} samples, units ({})]",
            self.function_type,
            self.length(),
            units.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::Linear1D;
    use crate::types::RealTupleType;
    use crate::units::catalog;

    fn time_domain(length: usize) -> DomainSet {
        let time = RealType::new("FieldTime", Some(catalog::second()), false).unwrap();
        let t = RealTupleType::new(vec![time]).unwrap();
        let axis = Linear1D::new(0.0, (length - 1) as f64, length).unwrap();
        DomainSet::linear(t, vec![axis]).unwrap()
    }

    fn temperature_type() -> FunctionType {
        FunctionType::new(
            MathType::Real(RealType::new("FieldTime", Some(catalog::second()), false).unwrap()),
            MathType::Real(RealType::new("FieldTemp", Some(catalog::kelvin()), false).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_build_selects_storage() {
        let field = FlatField::builder(temperature_type(), time_domain(4))
            .discretization(0, Discretization::linear(200.0, 399.0, 200).unwrap())
            .build()
            .unwrap();
        assert_eq!(field.storage_codes(), &[StorageCode::Byte]);
        assert!(field.is_missing());

        let wide = FlatField::builder(temperature_type(), time_domain(4))
            .discretization(0, Discretization::linear(0.0, 1.0, 40_000).unwrap())
            .build()
            .unwrap();
        assert_eq!(wide.storage_codes(), &[StorageCode::Short]);

        let compact = FlatField::builder(temperature_type(), time_domain(4))
            .float_storage(FloatStorage::Float)
            .build()
            .unwrap();
        assert_eq!(compact.storage_codes(), &[StorageCode::Float]);
    }

    #[test]
    fn test_build_rejects_bad_shapes() {
        let planar = RealTupleType::new(vec![
            RealType::new("FieldEast", None, false).unwrap(),
            RealType::new("FieldNorth", None, false).unwrap(),
        ])
        .unwrap();
        let set = DomainSet::linear(
            planar,
            vec![Linear1D::new(0.0, 1.0, 2).unwrap(), Linear1D::new(0.0, 1.0, 2).unwrap()],
        )
        .unwrap();
        assert!(matches!(
            FlatField::new(temperature_type(), set),
            Err(UnitFieldError::ShapeMismatch(_))
        ));
        assert!(matches!(
            FlatField::builder(temperature_type(), time_domain(3))
                .range_units(vec![Some(catalog::meter())])
                .build(),
            Err(UnitFieldError::UnitConversion(_))
        ));
    }

    #[test]
    fn test_set_and_read_samples() {
        let field = FlatField::builder(temperature_type(), time_domain(3))
            .range_units(vec![Some(catalog::celsius())])
            .build()
            .unwrap();
        field.set_samples(&[vec![0.0, f64::NAN, 100.0]], None).unwrap();
        assert!(!field.is_missing());
        let values = field.values().unwrap();
        assert_eq!(values[0][0], 0.0);
        assert!(values[0][1].is_nan());
        let kelvin = field.values_in_default_units().unwrap();
        assert!((kelvin[0][2] - 373.15).abs() < 1e-9);
        assert_eq!(field.compute_ranges().unwrap(), vec![Some((0.0, 100.0))]);
        assert!(field.set_samples(&[vec![1.0]], None).is_err());
    }

    #[test]
    fn test_quantized_samples_and_set_sample() {
        let field = FlatField::builder(temperature_type(), time_domain(3))
            .discretization(0, Discretization::integer(300).unwrap())
            .build()
            .unwrap();
        assert_eq!(field.storage_codes(), &[StorageCode::Short]);
        field.set_samples(&[vec![10.0, 20.0, 30.0]], None).unwrap();
        assert!(field.set_sample(1, &[400.0], None).is_err());
        assert_eq!(field.sample(1).unwrap(), vec![20.0]);

        let error = ErrorEstimate::new(25.0, 2.0, Some(catalog::kelvin()));
        field.set_sample(1, &[25.0], Some(&[error])).unwrap();
        assert_eq!(field.component(0).unwrap(), vec![10.0, 25.0, 30.0]);
        let merged = field.range_errors()[0].clone().unwrap();
        assert!(!merged.is_missing());
        let reals = field.sample_reals(1).unwrap();
        assert_eq!(reals[0].value(), 25.0);
        assert!(reals[0].error().is_some());
    }

    #[test]
    fn test_rejected_set_sample_leaves_field_untouched() {
        let field = FlatField::new(temperature_type(), time_domain(3)).unwrap();
        field
            .set_samples(
                &[vec![1.0, 2.0, 3.0]],
                Some(vec![ErrorEstimate::new(2.0, 0.5, Some(catalog::kelvin()))]),
            )
            .unwrap();
        let before = field.range_errors();

        let foreign = ErrorEstimate::new(5.0, 0.1, Some(catalog::meter()));
        assert!(field.set_sample(1, &[99.0], Some(&[foreign])).is_err());
        assert_eq!(field.values().unwrap(), vec![vec![1.0, 2.0, 3.0]]);
        assert_eq!(field.range_errors(), before);
        assert!(!field.is_missing());
    }

    #[test]
    fn test_missing_flag_tracks_samples() {
        let field = FlatField::new(temperature_type(), time_domain(2)).unwrap();
        field.set_sample(0, &[5.0], None).unwrap();
        assert!(!field.is_missing());
        field.set_sample(0, &[f64::NAN], None).unwrap();
        assert!(field.is_missing());
        let copy = field.clone_missing();
        assert!(copy.is_missing());
        assert_eq!(copy.length(), 2);
    }

    #[test]
    fn test_extract_and_floats() {
        let wind = RealTupleType::new(vec![
            RealType::new("FieldWindU", Some(catalog::meter()), false).unwrap(),
            RealType::new("FieldWindV", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap();
        let ft = FunctionType::new(
            MathType::Real(RealType::new("FieldTime", Some(catalog::second()), false).unwrap()),
            MathType::RealTuple(wind),
        )
        .unwrap();
        let field = FlatField::new(ft, time_domain(2)).unwrap();
        field.set_float_samples(&[vec![1.5, 2.5], vec![-1.0, -2.0]], None).unwrap();
        let v = field.extract(1).unwrap();
        assert_eq!(v.component_count(), 1);
        assert_eq!(v.values().unwrap(), vec![vec![-1.0, -2.0]]);
        assert_eq!(field.floats().unwrap()[0], vec![1.5f32, 2.5]);
        assert!(field.extract(2).is_err());
    }
}
