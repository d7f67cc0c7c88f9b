// ============================================================================
// Resampling
// Move a field onto another domain set
// ============================================================================
//
// Target positions are first moved into this field's domain frame. Nearest
// neighbour copies packed codes straight across; weighted average blends
// unpacked doubles with the domain set's interpolation stencils. Positions
// outside the support come out missing.
//
// When the target set carries position errors, each range error is widened
// by a sampling term: the field is sampled at ± half the position error
// along every axis and the spread is combined with the range error.
// ============================================================================

use super::flat_field::{FieldParts, FlatField};
use super::parallel::map_components;
use super::storage::PackedColumn;
use crate::coords::{transform_coordinates, transform_errors, transform_vectors, Frame};
use crate::error::{Result, UnitFieldError};
use crate::ops::{ErrorMode, SamplingMode};
use crate::sets::{DomainSet, Interpolation};
use crate::uncertainty::ErrorEstimate;
use std::sync::Arc;
use tracing::debug;

fn blend(values: &[f64], stencils: &[Option<Interpolation>]) -> Vec<f64> {
    stencils
        .iter()
        .map(|stencil| match stencil {
            None => f64::NAN,
            Some(s) => s.indices.iter().zip(&s.weights).map(|(i, w)| values[*i] * w).sum(),
        })
        .collect()
}

fn pick(values: &[f64], rows: &[Option<usize>]) -> Vec<f64> {
    rows.iter().map(|r| r.map_or(f64::NAN, |i| values[i])).collect()
}

impl FlatField {
    fn own_frame(&self) -> Frame<'_> {
        Frame::new(self.domain.coordinate_system().map(|cs| cs.as_ref()), self.domain.units())
    }

    /// Unpacked `source` columns evaluated at `points` (in this field's
    /// domain frame).
    fn evaluate_at(
        &self,
        source: &[Vec<f64>],
        points: &[Vec<f64>],
        sampling: SamplingMode,
    ) -> Result<Vec<Vec<f64>>> {
        Ok(match sampling {
            SamplingMode::NearestNeighbor => {
                let rows = self.domain.value_to_index(points)?;
                source.iter().map(|c| pick(c, &rows)).collect()
            }
            SamplingMode::WeightedAverage => {
                let stencils = self.domain.value_to_interp(points)?;
                source.iter().map(|c| blend(c, &stencils)).collect()
            }
        })
    }

    /// Per-component sampling spread for position errors `domain_errors`,
    /// summed or added in quadrature over the axes.
    fn sampling_spread(
        &self,
        source: &[Vec<f64>],
        domain_errors: &[ErrorEstimate],
        sampling: SamplingMode,
        errors: ErrorMode,
    ) -> Result<Vec<f64>> {
        let dim = domain_errors.len();
        let mut points = vec![vec![0.0; 2 * dim]; dim];
        for (j, column) in points.iter_mut().enumerate() {
            for i in 0..dim {
                let mean = domain_errors[j].mean();
                let half = if i == j { 0.5 * domain_errors[i].error_value() } else { 0.0 };
                column[2 * i] = mean - half;
                column[2 * i + 1] = mean + half;
            }
        }
        let spread = self.evaluate_at(source, &points, sampling)?;
        Ok(spread
            .iter()
            .map(|p| {
                let partials = (0..dim)
                    .map(|i| (p[2 * i + 1] - p[2 * i]).abs())
                    .filter(|d| !d.is_nan());
                match errors {
                    ErrorMode::Dependent => partials.sum(),
                    _ => partials.map(|d| d * d).sum::<f64>(),
                }
            })
            .collect())
    }

    /// This field sampled at every position of `target`.
    ///
    /// Returns a plain copy when `target` equals this field's domain set.
    /// Vector range members are re-projected when the target lives in a
    /// different coordinate system.
    ///
    /// # Errors
    /// - `ShapeMismatch` when the target's dimension differs
    /// - `MalformedType` when the two domain frames share no reference
    pub fn resample(
        &self,
        target: &Arc<DomainSet>,
        sampling: SamplingMode,
        errors: ErrorMode,
    ) -> Result<FlatField> {
        if target.dimension() != self.domain.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{}-D target set for a {}-D domain",
                target.dimension(),
                self.domain.dimension()
            )));
        }
        if Arc::ptr_eq(target, &self.domain) || **target == *self.domain {
            return Ok(self.clone());
        }

        let n = self.components.len();
        let length = target.length();
        debug!(mode = ?sampling, samples = length, "resampling field");

        let target_cs = target.coordinate_system().map(|cs| cs.as_ref());
        let target_frame = Frame::new(target_cs, target.units());
        let frame_changed = target.coordinate_system() != self.domain.coordinate_system();
        let positions = transform_coordinates(self.own_frame(), target_frame, &target.samples())?;

        if self.is_missing() {
            return FlatField::from_parts(FieldParts {
                function_type: self.function_type.clone(),
                domain: Arc::clone(target),
                range_units: self.range_units.clone(),
                range_cs: self.range_cs.clone(),
                discretizations: self.discretizations.clone(),
                columns: self.codes.iter().map(|c| PackedColumn::missing(*c, length)).collect(),
                errors: vec![None; n],
                config: self.config.clone(),
            });
        }

        let source = self.values()?;
        let range_errors = self.range_errors();
        let mut discretizations = self.discretizations.clone();
        let mut columns: Vec<PackedColumn> = match sampling {
            SamplingMode::NearestNeighbor => {
                let rows = self.domain.value_to_index(&positions)?;
                let state = self.state.read();
                state.columns.iter().map(|c| c.gather(&rows)).collect()
            }
            SamplingMode::WeightedAverage => {
                let stencils = self.domain.value_to_interp(&positions)?;
                let blended = map_components(n, length, &self.config, |k| {
                    Ok(blend(&source[k], &stencils))
                })?;
                blended
                    .into_iter()
                    .enumerate()
                    .map(|(k, values)| {
                        let code = self.codes[k];
                        if code.is_quantized() {
                            discretizations[k] = None;
                            Ok(PackedColumn::Double(values))
                        } else {
                            PackedColumn::pack(code, &values, None)
                        }
                    })
                    .collect::<Result<_>>()?
            }
        };

        if frame_changed {
            let dim = self.domain.dimension();
            for (start, len) in self.function_type.vector_groups() {
                if len != dim {
                    continue;
                }
                let span = start..start + len;
                let vectors = columns[span.clone()]
                    .iter()
                    .zip(&discretizations[span.clone()])
                    .map(|(c, d)| c.unpack(d.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                let moved =
                    transform_vectors(target_frame, self.own_frame(), &positions, &vectors)?;
                for (i, values) in moved.into_iter().enumerate() {
                    columns[start + i] = PackedColumn::Double(values);
                    discretizations[start + i] = None;
                }
            }
        }

        let mut new_errors = vec![None; n];
        if errors != ErrorMode::NoErrors && range_errors.iter().any(Option::is_some) {
            let spread = match target.errors() {
                Some(target_errors) => {
                    let moved = transform_errors(self.own_frame(), target_frame, target_errors)?;
                    if moved.iter().any(ErrorEstimate::is_missing) {
                        None
                    } else {
                        Some(self.sampling_spread(&source, &moved, sampling, errors)?)
                    }
                }
                None => None,
            };
            for k in 0..n {
                let Some(range_error) = range_errors[k].as_ref().filter(|e| !e.is_missing()) else {
                    continue;
                };
                let values = columns[k].unpack(discretizations[k].as_ref())?;
                let base = range_error.error_value();
                let error = match (&spread, errors) {
                    (Some(s), ErrorMode::Dependent) => base + s[k],
                    (Some(s), _) => (base * base + s[k]).sqrt(),
                    (None, _) => base,
                };
                let unit = self.range_units[k].clone();
                new_errors[k] = Some(ErrorEstimate::from_values(&values, error, unit));
            }
        }

        FlatField::from_parts(FieldParts {
            function_type: self.function_type.clone(),
            domain: Arc::clone(target),
            range_units: self.range_units.clone(),
            range_cs: self.range_cs.clone(),
            discretizations,
            columns,
            errors: new_errors,
            config: self.config.clone(),
        })
    }

    /// [`FlatField::resample`] using this field's configured modes.
    pub fn resample_to(&self, target: &Arc<DomainSet>) -> Result<FlatField> {
        self.resample(target, self.config.sampling_mode, self.config.error_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use crate::field::StorageCode;
    use crate::sets::{Discretization, Linear1D};
    use crate::types::{FunctionType, MathType, RealTupleType, RealType};
    use crate::units::catalog;
    use std::f64::consts::PI;

    fn plane(x: &str, y: &str) -> RealTupleType {
        RealTupleType::new(vec![
            RealType::new(x, Some(catalog::meter()), false).unwrap(),
            RealType::new(y, Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap()
    }

    fn grid(domain: RealTupleType, last: f64, length: usize) -> Arc<DomainSet> {
        Arc::new(
            DomainSet::linear(
                domain,
                vec![
                    Linear1D::new(0.0, last, length).unwrap(),
                    Linear1D::new(0.0, last, length).unwrap(),
                ],
            )
            .unwrap(),
        )
    }

    fn line(name: &str, first: f64, last: f64, length: usize) -> Arc<DomainSet> {
        let axis = RealType::new(name, Some(catalog::meter()), false).unwrap();
        let t = RealTupleType::new(vec![axis]).unwrap();
        Arc::new(DomainSet::linear_1d(t, first, last, length).unwrap())
    }

    fn line_field(values: Vec<f64>) -> FlatField {
        let domain = line("ResampleX", 0.0, (values.len() - 1) as f64, values.len());
        let ft = FunctionType::new(
            MathType::RealTuple(domain.set_type().clone()),
            MathType::Real(RealType::new("ResampleLevel", Some(catalog::meter()), false).unwrap()),
        )
        .unwrap();
        let field = FlatField::new(ft, domain).unwrap();
        field.set_samples(&[values], None).unwrap();
        field
    }

    fn lattice_field() -> FlatField {
        let domain = grid(plane("ResampleCol", "ResampleRow"), 3.0, 4);
        let ft = FunctionType::new(
            MathType::RealTuple(domain.set_type().clone()),
            MathType::Real(RealType::new("ResampleHeight", None, false).unwrap()),
        )
        .unwrap();
        let field = FlatField::builder(ft, domain)
            .discretization(0, Discretization::integer(64).unwrap())
            .build()
            .unwrap();
        let values: Vec<f64> = (0..16).map(|i| ((i * 7) % 16) as f64).collect();
        field.set_samples(&[values], None).unwrap();
        field
    }

    #[test]
    fn test_nearest_onto_same_positions_is_identical() {
        let field = lattice_field();
        let renamed = grid(plane("ResampleColB", "ResampleRowB"), 3.0, 4);
        assert!(*renamed != **field.domain());
        let out = field
            .resample(&renamed, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
            .unwrap();
        assert_eq!(out.storage_codes(), &[StorageCode::Byte]);
        assert_eq!(out.values().unwrap(), field.values().unwrap());

        let same = field
            .resample(field.domain(), SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
            .unwrap();
        assert_eq!(same.values().unwrap(), field.values().unwrap());
    }

    #[test]
    fn test_weighted_onto_finer_lattice_keeps_grid_points() {
        let field = lattice_field();
        let fine = grid(plane("ResampleFineCol", "ResampleFineRow"), 3.0, 7);
        let out = field
            .resample(&fine, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap();
        assert_eq!(out.storage_codes(), &[StorageCode::Double]);
        let original = field.values().unwrap();
        let resampled = out.values().unwrap();
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(resampled[0][(2 * row) * 7 + 2 * col], original[0][row * 4 + col]);
            }
        }
        // midpoint between the first two samples of the first row
        let expected = 0.5 * (original[0][0] + original[0][1]);
        assert!((resampled[0][1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_positions_outside_support_are_missing() {
        let field = line_field(vec![0.0, 1.0, 2.0, 3.0]);
        let wide = line("ResampleWide", 0.0, 6.0, 7);
        for mode in [SamplingMode::NearestNeighbor, SamplingMode::WeightedAverage] {
            let resampled = field.resample(&wide, mode, ErrorMode::NoErrors).unwrap();
            let values = resampled.values().unwrap();
            assert_eq!(&values[0][..4], &[0.0, 1.0, 2.0, 3.0]);
            assert!(values[0][4..].iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn test_target_units_are_converted() {
        let field = line_field(vec![0.0, 10.0, 20.0]);
        let axis = RealType::new("ResampleKm", Some(catalog::meter()), false).unwrap();
        let t = RealTupleType::new(vec![axis]).unwrap();
        let km = catalog::meter().scale(1000.0).unwrap();
        let target = Arc::new(
            DomainSet::linear_1d(t, 0.0, 0.0015, 2)
                .unwrap()
                .with_units(vec![Some(km)])
                .unwrap(),
        );
        let values = field
            .resample(&target, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap()
            .values()
            .unwrap();
        assert!((values[0][1] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_sampling_error_widens_range_error() {
        let field = line_field(vec![0.0, 2.0, 4.0, 6.0]);
        field
            .set_samples(
                &[vec![0.0, 2.0, 4.0, 6.0]],
                Some(vec![ErrorEstimate::new(3.0, 0.1, Some(catalog::meter()))]),
            )
            .unwrap();
        let plain = line("ResampleErr", 0.0, 2.0, 3);
        let with_errors = Arc::new(
            (*plain)
                .clone()
                .with_errors(vec![ErrorEstimate::new(1.0, 1.0, Some(catalog::meter()))])
                .unwrap(),
        );

        let independent = field
            .resample(&with_errors, SamplingMode::WeightedAverage, ErrorMode::Independent)
            .unwrap();
        let e = independent.range_errors()[0].clone().unwrap();
        assert!((e.error_value() - (0.01f64 + 4.0).sqrt()).abs() < 1e-9);
        assert!((e.mean() - 2.0).abs() < 1e-12);

        let dependent = field
            .resample(&with_errors, SamplingMode::WeightedAverage, ErrorMode::Dependent)
            .unwrap();
        assert!((dependent.range_errors()[0].clone().unwrap().error_value() - 2.1).abs() < 1e-9);

        let untouched = field
            .resample(&plain, SamplingMode::WeightedAverage, ErrorMode::Independent)
            .unwrap();
        assert!((untouched.range_errors()[0].clone().unwrap().error_value() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_irregular_domain_exact_hits() {
        let domain = Arc::new(
            DomainSet::irregular(
                plane("ResampleScatterX", "ResampleScatterY"),
                vec![vec![0.0, 1.0, 0.0, 1.0, 0.4], vec![0.0, 0.0, 1.0, 1.0, 0.7]],
            )
            .unwrap(),
        );
        let ft = FunctionType::new(
            MathType::RealTuple(domain.set_type().clone()),
            MathType::Real(RealType::new("ResampleScatter", None, false).unwrap()),
        )
        .unwrap();
        let field = FlatField::new(ft, Arc::clone(&domain)).unwrap();
        field.set_samples(&[vec![1.0, 2.0, 3.0, 4.0, 5.0]], None).unwrap();
        let target = Arc::new(
            DomainSet::irregular(
                plane("ResamplePointX", "ResamplePointY"),
                vec![vec![0.4, 1.0, 2.0], vec![0.7, 1.0, 2.0]],
            )
            .unwrap(),
        );
        let values = field
            .resample(&target, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap()
            .values()
            .unwrap();
        assert_eq!(values[0][0], 5.0);
        assert_eq!(values[0][1], 4.0);
        assert!(values[0][2].is_nan());
    }

    #[test]
    fn test_vectors_reprojected_into_target_frame() {
        let cartesian = plane("ResampleVecX", "ResampleVecY");
        let source = Arc::new(
            DomainSet::linear(
                cartesian.clone(),
                vec![Linear1D::new(-2.0, 2.0, 5).unwrap(), Linear1D::new(-2.0, 2.0, 5).unwrap()],
            )
            .unwrap(),
        );
        let wind = RealTupleType::vector(vec![
            RealType::new("ResampleWindU", None, false).unwrap(),
            RealType::new("ResampleWindV", None, false).unwrap(),
        ])
        .unwrap();
        let domain = MathType::RealTuple(cartesian.clone());
        let ft = FunctionType::new(domain, MathType::RealTuple(wind)).unwrap();
        let field = FlatField::new(ft, source).unwrap();
        field.set_samples(&[vec![1.0; 25], vec![0.0; 25]], None).unwrap();

        let polar = RealTupleType::new(vec![
            RealType::new("ResampleVecRange", Some(catalog::meter()), false).unwrap(),
            RealType::new("ResampleVecAzimuth", Some(catalog::radian()), false).unwrap(),
        ])
        .unwrap()
        .with_coordinate_system(Arc::new(CoordinateSystem::polar(cartesian).unwrap()))
        .unwrap();
        let points = vec![vec![1.0, 1.0], vec![0.0, PI / 2.0]];
        let target = Arc::new(DomainSet::irregular(polar, points).unwrap());

        let out = field
            .resample(&target, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap();
        let v = out.values().unwrap();
        // eastward flow is radial at azimuth 0 and clockwise at azimuth 90°
        assert!((v[0][0] - 1.0).abs() < 1e-6);
        assert!(v[1][0].abs() < 1e-6);
        assert!(v[0][1].abs() < 1e-6);
        assert!((v[1][1] + 1.0).abs() < 1e-6);
    }
}
