// ============================================================================
// Partial Derivatives
// d(range)/d(domain component) by differencing over the sample topology
// ============================================================================
//
// Lattices difference each sample's neighbours along the requested axis:
// central in the interior, one-sided at the edges. Irregular sets fit a
// weighted least-squares gradient through the nearest samples and keep the
// requested component of it; weights fall off as 1/d².
// ============================================================================

use super::flat_field::{FieldParts, FlatField};
use super::parallel::map_components;
use super::storage::PackedColumn;
use crate::coords::invert;
use crate::error::{Result, UnitFieldError};
use crate::ops::{BinaryOp, ErrorMode};
use crate::sets::Topology;
use crate::types::{FunctionType, MathType, RealTupleType, TypeRegistry};
use crate::uncertainty::ErrorEstimate;
use crate::units::Unit;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Offsets and weights of one sample's neighbours
struct Neighborhood {
    members: Vec<(usize, SmallVec<[f64; 4]>, f64)>,
}

impl Neighborhood {
    /// Weighted least-squares slope along `axis`; NaN when the valid
    /// neighbours do not span the domain.
    fn slope(&self, values: &[f64], center: f64, axis: usize, dim: usize) -> f64 {
        if center.is_nan() {
            return f64::NAN;
        }
        let mut normal = vec![0.0; dim * dim];
        let mut rhs = vec![0.0; dim];
        let mut used = 0;
        for (j, offset, w) in &self.members {
            let dv = values[*j] - center;
            if dv.is_nan() {
                continue;
            }
            used += 1;
            for r in 0..dim {
                rhs[r] += w * offset[r] * dv;
                for c in 0..dim {
                    normal[r * dim + c] += w * offset[r] * offset[c];
                }
            }
        }
        if used < dim {
            return f64::NAN;
        }
        match invert(&normal, dim) {
            Some(inverse) => (0..dim).map(|c| inverse[axis * dim + c] * rhs[c]).sum(),
            None => f64::NAN,
        }
    }
}

fn derivative_unit(range: Option<&Unit>, domain: Option<&Unit>) -> Result<Option<Unit>> {
    match (range, domain) {
        (Some(r), Some(d)) => Ok(Some(r.absolute().divide(&d.absolute())?)),
        _ => Ok(None),
    }
}

impl FlatField {
    fn neighborhoods(&self) -> Result<Vec<Neighborhood>> {
        let dim = self.domain.dimension();
        let k = self.config.derivative_neighbors.max(dim);
        let samples = self.domain.samples();
        (0..self.length())
            .map(|i| {
                let members = self
                    .domain
                    .neighbors(i, k)?
                    .into_iter()
                    .filter(|(_, d)| *d > 0.0)
                    .map(|(j, d)| {
                        let offset = samples.iter().map(|c| c[j] - c[i]).collect();
                        (j, offset, 1.0 / (d * d))
                    })
                    .collect();
                Ok(Neighborhood { members })
            })
            .collect()
    }

    /// Partial derivative of every range component with respect to the
    /// domain component named `wrt`.
    ///
    /// Result components are RealTypes named `d<range>_d<wrt>` in the
    /// global registry, in units of range unit per domain unit. Range
    /// errors are propagated as a quotient with the domain set's error
    /// along `wrt` when both are known.
    ///
    /// # Errors
    /// - `MalformedType` when no domain component is named `wrt`
    /// - `IncompatibleUnitOperation` when a derivative type is already
    ///   registered with an inconvertible unit
    pub fn derivative(&self, wrt: &str, errors: ErrorMode) -> Result<FlatField> {
        let domain_type = self.function_type.domain();
        let axis = domain_type.index_of(wrt).ok_or_else(|| {
            UnitFieldError::malformed(format!("{domain_type} has no component {wrt}"))
        })?;
        let dim = self.domain.dimension();
        let n = self.components.len();
        let length = self.length();
        let domain_unit = self.domain.units()[axis].as_ref();

        let registry = TypeRegistry::global();
        let mut units = Vec::with_capacity(n);
        let mut types = Vec::with_capacity(n);
        for (component, unit) in self.components.iter().zip(&self.range_units) {
            let unit = derivative_unit(unit.as_ref(), domain_unit)?;
            let name = format!("d{}_d{}", component.name(), wrt);
            types.push(registry.get_or_create_real(&name, unit.clone(), false)?);
            units.push(unit);
        }
        let range = if types.len() == 1 {
            MathType::Real(types[0].clone())
        } else {
            MathType::RealTuple(RealTupleType::new(types)?)
        };
        let function_type = FunctionType::new(MathType::RealTuple(domain_type.clone()), range)?;
        debug!(wrt, samples = length, lattice = self.domain.is_lattice(), "partial derivative");

        let values = self.values()?;
        let columns: Vec<Vec<f64>> = match self.domain.topology() {
            Topology::Linear(_) => map_components(n, length, &self.config, |k| {
                Ok((0..length)
                    .map(|i| match self.domain.lattice_neighbors(i, axis) {
                        Some((lo, hi, separation)) => (values[k][hi] - values[k][lo]) / separation,
                        None => f64::NAN,
                    })
                    .collect())
            })?,
            Topology::Irregular(_) => {
                let neighborhoods = self.neighborhoods()?;
                map_components(n, length, &self.config, |k| {
                    Ok(neighborhoods
                        .iter()
                        .enumerate()
                        .map(|(i, hood)| hood.slope(&values[k], values[k][i], axis, dim))
                        .collect())
                })?
            }
        };

        let range_errors = self.range_errors();
        let domain_error = self.domain.errors().map(|e| &e[axis]).filter(|e| !e.is_missing());
        let mut new_errors = vec![None; n];
        if errors != ErrorMode::NoErrors {
            if let Some(de) = domain_error {
                let de = ErrorEstimate::with_count(de.mean(), de.error_value(), de.count(), None);
                for k in 0..n {
                    if let Some(re) = range_errors[k].as_ref().filter(|e| !e.is_missing()) {
                        let (mean, error) = (re.mean(), re.error_value());
                        let re = ErrorEstimate::with_count(mean, error, re.count(), None);
                        new_errors[k] = Some(ErrorEstimate::from_binary_values(
                            &columns[k],
                            units[k].clone(),
                            BinaryOp::Divide,
                            &re,
                            &de,
                            errors,
                        )?);
                    }
                }
            }
        }

        FlatField::from_parts(FieldParts {
            function_type,
            domain: Arc::clone(&self.domain),
            range_units: units,
            range_cs: Vec::new(),
            discretizations: vec![None; n],
            columns: columns.into_iter().map(PackedColumn::Double).collect(),
            errors: new_errors,
            config: self.config.clone(),
        })
    }

    /// [`FlatField::derivative`] for each named domain component.
    pub fn derivatives(&self, wrt: &[&str], errors: ErrorMode) -> Result<Vec<FlatField>> {
        wrt.iter().map(|name| self.derivative(name, errors)).collect()
    }
}
