// ============================================================================
// Frame Transforms
// Move columns of points, their error bands and vectors between frames
// ============================================================================

use super::system::CoordinateSystem;
use crate::error::{Result, UnitFieldError};
use crate::uncertainty::ErrorEstimate;
use crate::units::{convert_values, Unit};
use tracing::trace;

/// The frame a set of coordinate columns is expressed in: an optional
/// coordinate system and the unit of each column.
///
/// An empty `units` slice means every column is unit-less.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub coordinate_system: Option<&'a CoordinateSystem>,
    pub units: &'a [Option<Unit>],
}

impl<'a> Frame<'a> {
    pub fn new(coordinate_system: Option<&'a CoordinateSystem>, units: &'a [Option<Unit>]) -> Self {
        Self {
            coordinate_system,
            units,
        }
    }

    fn unit(&self, axis: usize) -> Option<&'a Unit> {
        self.units.get(axis).and_then(Option::as_ref)
    }

    fn same_system(&self, other: &Frame<'_>) -> bool {
        self.coordinate_system == other.coordinate_system
    }
}

fn convert_columns(
    values: &[Vec<f64>],
    from: &[Option<Unit>],
    to: &[Option<Unit>],
) -> Result<Vec<Vec<f64>>> {
    values
        .iter()
        .enumerate()
        .map(|(axis, column)| {
            let f = from.get(axis).and_then(Option::as_ref);
            let t = to.get(axis).and_then(Option::as_ref);
            match (f, t) {
                (Some(_), Some(_)) => convert_values(column, f, t),
                _ => Ok(column.clone()),
            }
        })
        .collect()
}

/// Re-express `values` (one column per axis, in `from`) in the `to` frame.
///
/// Frames sharing a coordinate system only need unit conversion. Otherwise
/// the points go through the reference: `from` coordinates → reference →
/// `to` coordinates. A frame without a coordinate system is taken to be the
/// reference frame of the other side.
///
/// # Errors
/// - `ShapeMismatch` for ragged columns or a wrong column count
/// - `MalformedType` when both frames have coordinate systems over
///   different references
/// - `UnitConversion` when a column's unit cannot be converted
pub fn transform_coordinates(
    to: Frame<'_>,
    from: Frame<'_>,
    values: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>> {
    let n = values.first().map_or(0, Vec::len);
    if values.iter().any(|c| c.len() != n) {
        return Err(UnitFieldError::shape("coordinate columns differ in length"));
    }

    if to.same_system(&from) {
        return convert_columns(values, from.units, to.units);
    }

    if let (Some(a), Some(b)) = (from.coordinate_system, to.coordinate_system) {
        if a.reference() != b.reference() {
            return Err(UnitFieldError::malformed(format!(
                "coordinate systems over {} and {} share no reference",
                a.reference(),
                b.reference()
            )));
        }
    }

    trace!(points = n, "transforming coordinates through reference");

    // into the reference frame, in the reference's default units
    let (reference, ref_units): (Vec<Vec<f64>>, &[Option<Unit>]) = match from.coordinate_system {
        Some(cs) => {
            let local = convert_columns(values, from.units, cs.coordinate_units())?;
            (cs.to_reference(&local)?, cs.reference_units())
        }
        None => (values.to_vec(), from.units),
    };

    match to.coordinate_system {
        Some(cs) => {
            let reference = convert_columns(&reference, ref_units, cs.reference_units())?;
            let local = cs.from_reference(&reference)?;
            convert_columns(&local, cs.coordinate_units(), to.units)
        }
        None => convert_columns(&reference, ref_units, to.units),
    }
}

/// Carry per-axis error estimates through a frame change.
///
/// Each axis is perturbed by ± half its error around the estimates' means
/// while the other axes stay at their means; the transformed spread along
/// the same axis becomes the new error.
pub fn transform_errors(
    to: Frame<'_>,
    from: Frame<'_>,
    errors: &[ErrorEstimate],
) -> Result<Vec<ErrorEstimate>> {
    let dim = errors.len();
    if errors.iter().any(ErrorEstimate::is_missing) {
        return Ok((0..dim).map(|i| ErrorEstimate::missing(to.unit(i).cloned())).collect());
    }

    // column j holds axis j; sample 2i / 2i+1 perturb axis i down / up,
    // the final sample is the unperturbed mean
    let mut columns = vec![vec![0.0; 2 * dim + 1]; dim];
    for (j, column) in columns.iter_mut().enumerate() {
        let mean = errors[j].mean();
        let half = 0.5 * errors[j].error_value();
        for i in 0..dim {
            column[2 * i] = if i == j { mean - half } else { mean };
            column[2 * i + 1] = if i == j { mean + half } else { mean };
        }
        column[2 * dim] = mean;
    }

    let moved = transform_coordinates(to, from, &columns)?;
    Ok((0..dim)
        .map(|i| {
            let error = (moved[i][2 * i + 1] - moved[i][2 * i]).abs();
            let mean = moved[i][2 * dim];
            ErrorEstimate::with_count(mean, error, errors[i].count(), to.unit(i).cloned())
        })
        .collect())
}

/// Re-project vectors anchored at `locations` (both in `from`) into `to`.
///
/// The Jacobian of the point transform at each location is estimated by
/// central differences with a step relative to the coordinate magnitude,
/// then applied to the vector components. Missing locations or components
/// yield missing vectors.
///
/// # Errors
/// `ShapeMismatch` when the vector and location columns disagree in shape.
pub fn transform_vectors(
    to: Frame<'_>,
    from: Frame<'_>,
    locations: &[Vec<f64>],
    vectors: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>> {
    let dim = locations.len();
    if vectors.len() != dim {
        return Err(UnitFieldError::shape(format!(
            "{}-component vectors anchored in a {dim}-D frame",
            vectors.len()
        )));
    }
    let n = locations.first().map_or(0, Vec::len);
    if vectors.iter().chain(locations).any(|c| c.len() != n) {
        return Err(UnitFieldError::shape("vector and location columns differ in length"));
    }
    if to.same_system(&from) {
        return Ok(vectors.to_vec());
    }

    // perturb each location along each axis: 2 * dim samples per location
    let stride = 2 * dim;
    let mut perturbed = vec![vec![0.0; n * stride]; dim];
    let mut steps = vec![0.0; n * dim];
    for p in 0..n {
        for axis in 0..dim {
            let x = locations[axis][p];
            let h = 1e-6 * x.abs().max(1.0);
            steps[p * dim + axis] = h;
            for (j, column) in perturbed.iter_mut().enumerate() {
                let base = locations[j][p];
                column[p * stride + 2 * axis] = if j == axis { base - h } else { base };
                column[p * stride + 2 * axis + 1] = if j == axis { base + h } else { base };
            }
        }
    }
    let moved = transform_coordinates(to, from, &perturbed)?;

    let mut out = vec![vec![f64::NAN; n]; dim];
    for p in 0..n {
        for (row, column) in out.iter_mut().enumerate() {
            let mut sum = 0.0;
            for axis in 0..dim {
                let lo = moved[row][p * stride + 2 * axis];
                let hi = moved[row][p * stride + 2 * axis + 1];
                let partial = (hi - lo) / (2.0 * steps[p * dim + axis]);
                sum += partial * vectors[axis][p];
            }
            column[p] = sum;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RealTupleType, RealType};
    use crate::units::catalog;
    use std::f64::consts::PI;

    fn cartesian() -> RealTupleType {
        RealTupleType::new(vec![
            RealType::new("XAxis", Some(catalog::meter()), false).unwrap(),
            RealType::new("YAxis", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_same_frame_converts_units_only() {
        let km = catalog::meter().scale(1000.0).unwrap();
        let from_units = vec![Some(km)];
        let to_units = vec![Some(catalog::meter())];
        let out = transform_coordinates(
            Frame::new(None, &to_units),
            Frame::new(None, &from_units),
            &[vec![1.5, f64::NAN]],
        )
        .unwrap();
        assert!((out[0][0] - 1500.0).abs() < 1e-9);
        assert!(out[0][1].is_nan());
    }

    #[test]
    fn test_polar_to_cartesian_frame() {
        let cs = CoordinateSystem::polar(cartesian()).unwrap();
        let polar_units = vec![Some(catalog::meter()), Some(catalog::degree())];
        let xy_units = cs.reference_units().to_vec();
        let out = transform_coordinates(
            Frame::new(None, &xy_units),
            Frame::new(Some(&cs), &polar_units),
            &[vec![2.0], vec![90.0]],
        )
        .unwrap();
        assert!(out[0][0].abs() < 1e-12);
        assert!((out[1][0] - 2.0).abs() < 1e-12);

        let back = transform_coordinates(
            Frame::new(Some(&cs), &polar_units),
            Frame::new(None, &xy_units),
            &out,
        )
        .unwrap();
        assert!((back[1][0] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_errors_follow_the_transform() {
        let cs = CoordinateSystem::polar(cartesian()).unwrap();
        let polar_units = cs.coordinate_units().to_vec();
        let xy_units = cs.reference_units().to_vec();
        let errors = vec![
            ErrorEstimate::new(1.0, 0.2, Some(catalog::meter())),
            ErrorEstimate::new(0.0, 0.1, Some(catalog::radian())),
        ];
        let moved = transform_errors(
            Frame::new(None, &xy_units),
            Frame::new(Some(&cs), &polar_units),
            &errors,
        )
        .unwrap();
        // x = r cos θ at θ = 0: dx/dr = 1
        assert!((moved[0].error_value() - 0.2).abs() < 1e-9);
        assert!((moved[0].mean() - 1.0).abs() < 1e-12);
        // y = r sin θ at r = 1: dy/dθ ≈ 1
        assert!((moved[1].error_value() - 2.0 * (0.05f64).sin()).abs() < 1e-9);
    }

    #[test]
    fn test_vectors_are_reprojected() {
        let cs = CoordinateSystem::polar(cartesian()).unwrap();
        let polar_units = cs.coordinate_units().to_vec();
        let xy_units = cs.reference_units().to_vec();
        // unit radial vector at θ = π/2 points along +y
        let v = transform_vectors(
            Frame::new(None, &xy_units),
            Frame::new(Some(&cs), &polar_units),
            &[vec![3.0], vec![PI / 2.0]],
            &[vec![1.0], vec![0.0]],
        )
        .unwrap();
        assert!(v[0][0].abs() < 1e-6);
        assert!((v[1][0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_references_rejected() {
        let a = CoordinateSystem::polar(cartesian()).unwrap();
        let other = RealTupleType::new(vec![
            RealType::new("UAxis", None, false).unwrap(),
            RealType::new("VAxis", None, false).unwrap(),
        ])
        .unwrap();
        let b = CoordinateSystem::polar(other).unwrap();
        let units: Vec<Option<Unit>> = Vec::new();
        assert!(matches!(
            transform_coordinates(
                Frame::new(Some(&b), &units),
                Frame::new(Some(&a), &units),
                &[vec![1.0], vec![0.0]]
            ),
            Err(UnitFieldError::MalformedType(_))
        ));
    }
}
