// ============================================================================
// Coordinate Systems
// Reversible transforms between a RealTupleType and its reference frame
// ============================================================================

use crate::error::{Result, UnitFieldError};
use crate::types::RealTupleType;
use crate::units::{catalog, Unit};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DEG: f64 = PI / 180.0;

/// The closed set of supported transforms.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Transform {
    /// (r, θ in radians) ↔ (x, y)
    Polar2D,
    /// (r, θ in radians, z) ↔ (x, y, z)
    Cylindrical,
    /// (latitude, longitude in degrees, radius) ↔ (x, y, z)
    Spherical,
    /// reference = matrix · coordinates + offset, row-major `n × n`
    Affine {
        dimension: usize,
        matrix: Vec<f64>,
        offset: Vec<f64>,
        inverse: Vec<f64>,
    },
}

impl Transform {
    #[inline]
    pub fn dimension(&self) -> usize {
        match self {
            Transform::Polar2D => 2,
            Transform::Cylindrical | Transform::Spherical => 3,
            Transform::Affine { dimension, .. } => *dimension,
        }
    }
}

/// A reversible map from this frame's coordinates to a reference
/// RealTupleType, with the units this frame's coordinates are expressed in.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinateSystem {
    reference: RealTupleType,
    units: Vec<Option<Unit>>,
    transform: Transform,
}

impl CoordinateSystem {
    fn build(
        reference: RealTupleType,
        units: Vec<Option<Unit>>,
        transform: Transform,
    ) -> Result<Self> {
        if reference.dimension() != transform.dimension() {
            return Err(UnitFieldError::malformed(format!(
                "reference {} has dimension {}, transform needs {}",
                reference,
                reference.dimension(),
                transform.dimension()
            )));
        }
        Ok(Self {
            reference,
            units,
            transform,
        })
    }

    /// Polar coordinates over a 2-D cartesian reference.
    pub fn polar(reference: RealTupleType) -> Result<Self> {
        let radius = reference.default_units().first().cloned().flatten();
        let units = vec![radius, Some(catalog::radian())];
        Self::build(reference, units, Transform::Polar2D)
    }

    /// Cylindrical coordinates over a 3-D cartesian reference.
    pub fn cylindrical(reference: RealTupleType) -> Result<Self> {
        let ref_units = reference.default_units().to_vec();
        let units = vec![
            ref_units.first().cloned().flatten(),
            Some(catalog::radian()),
            ref_units.get(2).cloned().flatten(),
        ];
        Self::build(reference, units, Transform::Cylindrical)
    }

    /// Latitude/longitude/radius over a 3-D cartesian reference.
    pub fn spherical(reference: RealTupleType) -> Result<Self> {
        let units = vec![
            Some(catalog::degree()),
            Some(catalog::degree()),
            reference.default_units().first().cloned().flatten(),
        ];
        Self::build(reference, units, Transform::Spherical)
    }

    /// `reference = matrix · x + offset`.
    ///
    /// # Errors
    /// `MalformedType` for a wrongly sized or singular matrix.
    pub fn affine(reference: RealTupleType, matrix: Vec<f64>, offset: Vec<f64>) -> Result<Self> {
        let n = reference.dimension();
        if matrix.len() != n * n || offset.len() != n {
            return Err(UnitFieldError::malformed(format!(
                "affine transform over dimension {n} needs a {n}x{n} matrix and {n} offsets"
            )));
        }
        let inverse = invert(&matrix, n)
            .ok_or_else(|| UnitFieldError::malformed("affine transform matrix is singular"))?;
        let units = reference.default_units().to_vec();
        Self::build(
            reference,
            units,
            Transform::Affine {
                dimension: n,
                matrix,
                offset,
                inverse,
            },
        )
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.transform.dimension()
    }

    #[inline]
    pub fn reference(&self) -> &RealTupleType {
        &self.reference
    }

    /// Units of this frame's coordinates
    #[inline]
    pub fn coordinate_units(&self) -> &[Option<Unit>] {
        &self.units
    }

    /// Units of the reference frame's coordinates
    #[inline]
    pub fn reference_units(&self) -> &[Option<Unit>] {
        self.reference.default_units()
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    fn check_shape(&self, values: &[Vec<f64>]) -> Result<usize> {
        if values.len() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "coordinate system of dimension {} given {} columns",
                self.dimension(),
                values.len()
            )));
        }
        let n = values.first().map_or(0, Vec::len);
        if values.iter().any(|c| c.len() != n) {
            return Err(UnitFieldError::shape("coordinate columns differ in length"));
        }
        Ok(n)
    }

    /// Map columns in this frame (in `coordinate_units`) to the reference
    /// frame (in the reference's default units).
    pub fn to_reference(&self, values: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = self.check_shape(values)?;
        let mut out = vec![vec![0.0; n]; self.dimension()];
        for i in 0..n {
            let point: Vec<f64> = values.iter().map(|c| c[i]).collect();
            let mapped = self.point_to_reference(&point);
            for (column, v) in out.iter_mut().zip(mapped) {
                column[i] = v;
            }
        }
        Ok(out)
    }

    /// Inverse of [`CoordinateSystem::to_reference`].
    pub fn from_reference(&self, values: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = self.check_shape(values)?;
        let mut out = vec![vec![0.0; n]; self.dimension()];
        for i in 0..n {
            let point: Vec<f64> = values.iter().map(|c| c[i]).collect();
            let mapped = self.point_from_reference(&point);
            for (column, v) in out.iter_mut().zip(mapped) {
                column[i] = v;
            }
        }
        Ok(out)
    }

    pub(crate) fn point_to_reference(&self, p: &[f64]) -> Vec<f64> {
        match &self.transform {
            Transform::Polar2D => vec![p[0] * p[1].cos(), p[0] * p[1].sin()],
            Transform::Cylindrical => vec![p[0] * p[1].cos(), p[0] * p[1].sin(), p[2]],
            Transform::Spherical => {
                let (lat, lon, r) = (p[0] * DEG, p[1] * DEG, p[2]);
                vec![r * lat.cos() * lon.cos(), r * lat.cos() * lon.sin(), r * lat.sin()]
            }
            Transform::Affine {
                dimension,
                matrix,
                offset,
                ..
            } => mat_vec(matrix, p, *dimension)
                .into_iter()
                .zip(offset)
                .map(|(v, o)| v + o)
                .collect(),
        }
    }

    pub(crate) fn point_from_reference(&self, p: &[f64]) -> Vec<f64> {
        match &self.transform {
            Transform::Polar2D => vec![p[0].hypot(p[1]), p[1].atan2(p[0])],
            Transform::Cylindrical => vec![p[0].hypot(p[1]), p[1].atan2(p[0]), p[2]],
            Transform::Spherical => {
                let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
                let lat = if r == 0.0 { 0.0 } else { (p[2] / r).asin() };
                vec![lat / DEG, p[1].atan2(p[0]) / DEG, r]
            }
            Transform::Affine {
                dimension,
                offset,
                inverse,
                ..
            } => {
                let shifted: Vec<f64> = p.iter().zip(offset).map(|(v, o)| v - o).collect();
                mat_vec(inverse, &shifted, *dimension)
            }
        }
    }
}

fn mat_vec(matrix: &[f64], v: &[f64], n: usize) -> Vec<f64> {
    (0..n)
        .map(|r| (0..n).map(|c| matrix[r * n + c] * v[c]).sum())
        .collect()
}

/// Gauss-Jordan inverse with partial pivoting.
pub(crate) fn invert(matrix: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut a = matrix.to_vec();
    let mut inv = vec![0.0; n * n];
    for i in 0..n {
        inv[i * n + i] = 1.0;
    }
    for col in 0..n {
        let pivot =
            (col..n).max_by(|&x, &y| a[x * n + col].abs().total_cmp(&a[y * n + col].abs()))?;
        if a[pivot * n + col].abs() < 1e-300 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap(pivot * n + k, col * n + k);
                inv.swap(pivot * n + k, col * n + k);
            }
        }
        let d = a[col * n + col];
        for k in 0..n {
            a[col * n + k] /= d;
            inv[col * n + k] /= d;
        }
        for row in 0..n {
            if row != col {
                let factor = a[row * n + col];
                if factor != 0.0 {
                    for k in 0..n {
                        a[row * n + k] -= factor * a[col * n + k];
                        inv[row * n + k] -= factor * inv[col * n + k];
                    }
                }
            }
        }
    }
    Some(inv)
}
