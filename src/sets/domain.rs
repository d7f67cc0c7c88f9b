// ============================================================================
// Domain Sets
// Finite sample-point sets a field is defined over: regular lattices and
// irregular point clouds
// ============================================================================

use super::kdtree::KdTree;
use crate::coords::CoordinateSystem;
use crate::error::{Result, UnitFieldError};
use crate::types::RealTupleType;
use crate::uncertainty::ErrorEstimate;
use crate::units::Unit;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Fractions this close to a lattice node snap onto it.
const SNAP_EPSILON: f64 = 1e-10;

// ============================================================================
// Interpolation Stencil
// ============================================================================

/// Sample indices and weights (summing to one) reproducing a position.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub indices: SmallVec<[usize; 8]>,
    pub weights: SmallVec<[f64; 8]>,
}

impl Interpolation {
    fn single(index: usize) -> Self {
        let mut indices = SmallVec::new();
        indices.push(index);
        let mut weights = SmallVec::new();
        weights.push(1.0);
        Self { indices, weights }
    }

    /// Index carrying the largest weight
    pub fn dominant(&self) -> Option<usize> {
        self.indices
            .iter()
            .zip(&self.weights)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| *i)
    }
}

// ============================================================================
// Linear1D
// ============================================================================

/// `length` evenly spaced values from `first` to `last` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear1D {
    first: f64,
    last: f64,
    length: usize,
}

impl Linear1D {
    /// # Errors
    /// `MalformedType` for a zero length, non-finite bounds, or a
    /// single-point axis whose bounds differ.
    pub fn new(first: f64, last: f64, length: usize) -> Result<Self> {
        if length == 0 || !first.is_finite() || !last.is_finite() {
            return Err(UnitFieldError::malformed(format!(
                "invalid lattice axis {first}..{last} x {length}"
            )));
        }
        if length == 1 && first != last {
            return Err(UnitFieldError::malformed("single-point axis needs first == last"));
        }
        Ok(Self { first, last, length })
    }

    #[inline]
    pub fn first(&self) -> f64 {
        self.first
    }

    #[inline]
    pub fn last(&self) -> f64 {
        self.last
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn step(&self) -> f64 {
        if self.length > 1 {
            (self.last - self.first) / (self.length - 1) as f64
        } else {
            0.0
        }
    }

    #[inline]
    pub fn value_at(&self, index: usize) -> f64 {
        self.first + index as f64 * self.step()
    }

    /// Fractional grid position of `value`, or `None` beyond half a step
    /// outside the axis.
    fn grid_position(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        let step = self.step();
        if step == 0.0 {
            return (value == self.first).then_some(0.0);
        }
        let g = (value - self.first) / step;
        let max = (self.length - 1) as f64;
        if g < -0.5 || g > max + 0.5 {
            return None;
        }
        Some(g.clamp(0.0, max))
    }

    /// Nearest axis index.
    fn index_of(&self, value: f64) -> Option<usize> {
        self.grid_position(value)
            .map(|g| (g + 0.5).floor() as usize)
            .map(|i| i.min(self.length - 1))
    }

    /// Lower bracketing index and the weight of the upper neighbour.
    fn bracket(&self, value: f64) -> Option<(usize, f64)> {
        let g = self.grid_position(value)?;
        let lower = (g.floor() as usize).min(self.length.saturating_sub(2));
        let mut frac = g - lower as f64;
        if frac < SNAP_EPSILON {
            frac = 0.0;
        } else if frac > 1.0 - SNAP_EPSILON {
            frac = 1.0;
        }
        Some((lower, frac))
    }
}

// ============================================================================
// Topologies
// ============================================================================

/// Arbitrary sample positions.
#[derive(Debug, Clone, PartialEq)]
pub struct IrregularPoints {
    columns: Vec<Vec<f64>>,
    bounds: Vec<(f64, f64)>,
    /// 1-D sets: sample indices in ascending value order
    order: Vec<usize>,
    tree: Option<KdTree>,
}

impl IrregularPoints {
    fn new(columns: Vec<Vec<f64>>) -> Result<Self> {
        let n = columns.first().map_or(0, Vec::len);
        if columns.is_empty() || n == 0 {
            return Err(UnitFieldError::malformed("irregular set needs at least one sample"));
        }
        if columns.iter().any(|c| c.len() != n) {
            return Err(UnitFieldError::shape("irregular set columns differ in length"));
        }
        if columns.iter().flatten().any(|v| !v.is_finite()) {
            return Err(UnitFieldError::malformed("irregular set samples must be finite"));
        }
        let bounds = columns
            .iter()
            .map(|c| {
                c.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                })
            })
            .collect();
        let (order, tree) = if columns.len() == 1 {
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| columns[0][a].total_cmp(&columns[0][b]));
            (order, None)
        } else {
            (Vec::new(), Some(KdTree::new(&columns)))
        };
        Ok(Self {
            columns,
            bounds,
            order,
            tree,
        })
    }

    fn inside(&self, point: &[f64]) -> bool {
        point
            .iter()
            .zip(&self.bounds)
            .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    fn point(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[index]).collect()
    }

    /// Sorted-order slot of the first value `>= v` (1-D sets only).
    fn upper_slot(&self, v: f64) -> usize {
        let column = &self.columns[0];
        self.order.partition_point(|&i| column[i] < v)
    }

    fn nearest(&self, point: &[f64]) -> Option<usize> {
        if !self.inside(point) {
            return None;
        }
        match &self.tree {
            Some(tree) => tree.nearest(point, 1, None).first().map(|(i, _)| *i),
            None => {
                let column = &self.columns[0];
                let v = point[0];
                let slot = self.upper_slot(v);
                let above = self.order.get(slot).copied();
                let below = slot.checked_sub(1).map(|s| self.order[s]);
                match (below, above) {
                    (Some(b), Some(a)) => Some(if v - column[b] <= column[a] - v { b } else { a }),
                    (b, a) => b.or(a),
                }
            }
        }
    }

    fn interpolate(&self, point: &[f64]) -> Option<Interpolation> {
        if !self.inside(point) {
            return None;
        }
        match &self.tree {
            Some(tree) => {
                let k = (self.columns.len() + 1).min(tree.len());
                let found = tree.nearest(point, k, None);
                if let Some((i, d)) = found.first() {
                    if *d == 0.0 {
                        return Some(Interpolation::single(*i));
                    }
                }
                let raw: SmallVec<[f64; 8]> = found.iter().map(|(_, d)| 1.0 / (d * d)).collect();
                let total: f64 = raw.iter().sum();
                Some(Interpolation {
                    indices: found.iter().map(|(i, _)| *i).collect(),
                    weights: raw.iter().map(|w| w / total).collect(),
                })
            }
            None => {
                let column = &self.columns[0];
                let v = point[0];
                let slot = self.upper_slot(v);
                let above = *self.order.get(slot)?;
                if column[above] == v || slot == 0 {
                    return Some(Interpolation::single(above));
                }
                let below = self.order[slot - 1];
                let span = column[above] - column[below];
                let w = (v - column[below]) / span;
                Some(Interpolation {
                    indices: SmallVec::from_slice(&[below, above]),
                    weights: SmallVec::from_slice(&[1.0 - w, w]),
                })
            }
        }
    }
}

/// Sample topology of a domain set.
#[derive(Debug, Clone, PartialEq)]
pub enum Topology {
    /// Product of evenly spaced axes; the first axis varies fastest
    Linear(Vec<Linear1D>),
    Irregular(IrregularPoints),
}

// ============================================================================
// DomainSet
// ============================================================================

/// The finite set of positions a field is sampled at, with the units,
/// coordinate system and per-axis errors those positions carry.
#[derive(Debug, Clone)]
pub struct DomainSet {
    set_type: RealTupleType,
    topology: Topology,
    units: Vec<Option<Unit>>,
    coordinate_system: Option<Arc<CoordinateSystem>>,
    errors: Option<Vec<ErrorEstimate>>,
}

impl DomainSet {
    fn build(set_type: RealTupleType, topology: Topology) -> Self {
        let units = set_type.default_units().to_vec();
        let coordinate_system = set_type.coordinate_system().cloned();
        Self {
            set_type,
            topology,
            units,
            coordinate_system,
            errors: None,
        }
    }

    /// A regular lattice with one axis per domain component.
    ///
    /// # Errors
    /// `ShapeMismatch` when the axis count differs from the domain
    /// dimension.
    pub fn linear(set_type: RealTupleType, axes: Vec<Linear1D>) -> Result<Self> {
        if axes.len() != set_type.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} lattice axes for domain {}",
                axes.len(),
                set_type
            )));
        }
        Ok(Self::build(set_type, Topology::Linear(axes)))
    }

    /// Shorthand for a 1-D lattice.
    pub fn linear_1d(
        set_type: RealTupleType,
        first: f64,
        last: f64,
        length: usize,
    ) -> Result<Self> {
        Self::linear(set_type, vec![Linear1D::new(first, last, length)?])
    }

    /// An irregular point cloud, one column per domain component.
    pub fn irregular(set_type: RealTupleType, columns: Vec<Vec<f64>>) -> Result<Self> {
        if columns.len() != set_type.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} sample columns for domain {}",
                columns.len(),
                set_type
            )));
        }
        let points = IrregularPoints::new(columns)?;
        debug!(domain = %set_type, samples = points.columns[0].len(), "irregular set indexed");
        Ok(Self::build(set_type, Topology::Irregular(points)))
    }

    /// Override the units the sample positions are expressed in.
    pub fn with_units(mut self, units: Vec<Option<Unit>>) -> Result<Self> {
        if units.len() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} units for a {}-D set",
                units.len(),
                self.dimension()
            )));
        }
        self.units = units;
        Ok(self)
    }

    /// Override the coordinate system of the sample positions.
    pub fn with_coordinate_system(mut self, cs: Option<Arc<CoordinateSystem>>) -> Result<Self> {
        if let Some(cs) = &cs {
            if cs.dimension() != self.dimension() {
                return Err(UnitFieldError::malformed(format!(
                    "coordinate system of dimension {} for a {}-D set",
                    cs.dimension(),
                    self.dimension()
                )));
            }
        }
        self.coordinate_system = cs;
        Ok(self)
    }

    /// Attach per-axis position errors.
    pub fn with_errors(mut self, errors: Vec<ErrorEstimate>) -> Result<Self> {
        if errors.len() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} error estimates for a {}-D set",
                errors.len(),
                self.dimension()
            )));
        }
        self.errors = Some(errors);
        Ok(self)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn set_type(&self) -> &RealTupleType {
        &self.set_type
    }

    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.set_type.dimension()
    }

    /// Number of samples
    pub fn length(&self) -> usize {
        match &self.topology {
            Topology::Linear(axes) => axes.iter().map(Linear1D::length).product(),
            Topology::Irregular(points) => points.columns[0].len(),
        }
    }

    #[inline]
    pub fn units(&self) -> &[Option<Unit>] {
        &self.units
    }

    #[inline]
    pub fn coordinate_system(&self) -> Option<&Arc<CoordinateSystem>> {
        self.coordinate_system.as_ref()
    }

    #[inline]
    pub fn errors(&self) -> Option<&[ErrorEstimate]> {
        self.errors.as_deref()
    }

    #[inline]
    pub fn is_lattice(&self) -> bool {
        matches!(self.topology, Topology::Linear(_))
    }

    /// Same sample positions in the same frame.
    pub fn same_samples(&self, other: &DomainSet) -> bool {
        self.topology == other.topology
            && self.units == other.units
            && self.coordinate_system == other.coordinate_system
    }

    // ========================================================================
    // Index / Value Maps
    // ========================================================================

    fn lattice_coords(axes: &[Linear1D], mut index: usize) -> SmallVec<[usize; 4]> {
        axes.iter()
            .map(|axis| {
                let i = index % axis.length;
                index /= axis.length;
                i
            })
            .collect()
    }

    /// Sample positions for the given indices, one column per axis.
    ///
    /// # Errors
    /// `ShapeMismatch` for an index `>= length()`.
    pub fn index_to_value(&self, indices: &[usize]) -> Result<Vec<Vec<f64>>> {
        let length = self.length();
        if let Some(bad) = indices.iter().find(|&&i| i >= length) {
            return Err(UnitFieldError::shape(format!(
                "sample index {bad} outside set of length {length}"
            )));
        }
        let mut out = vec![Vec::with_capacity(indices.len()); self.dimension()];
        for &index in indices {
            match &self.topology {
                Topology::Linear(axes) => {
                    let coords = Self::lattice_coords(axes, index);
                    for ((column, axis), i) in out.iter_mut().zip(axes).zip(coords) {
                        column.push(axis.value_at(i));
                    }
                }
                Topology::Irregular(points) => {
                    for (column, source) in out.iter_mut().zip(&points.columns) {
                        column.push(source[index]);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Every sample position, one column per axis.
    pub fn samples(&self) -> Vec<Vec<f64>> {
        match &self.topology {
            Topology::Irregular(points) => points.columns.clone(),
            Topology::Linear(_) => {
                let all: Vec<usize> = (0..self.length()).collect();
                self.index_to_value(&all).unwrap_or_default()
            }
        }
    }

    /// Position of one sample.
    pub fn sample(&self, index: usize) -> Result<Vec<f64>> {
        Ok(self.index_to_value(&[index])?.into_iter().flatten().collect())
    }

    fn check_columns(&self, values: &[Vec<f64>]) -> Result<usize> {
        if values.len() != self.dimension() {
            return Err(UnitFieldError::shape(format!(
                "{} position columns for a {}-D set",
                values.len(),
                self.dimension()
            )));
        }
        let n = values.first().map_or(0, Vec::len);
        if values.iter().any(|c| c.len() != n) {
            return Err(UnitFieldError::shape("position columns differ in length"));
        }
        Ok(n)
    }

    /// Nearest sample to each position; `None` outside the support or for
    /// missing coordinates.
    pub fn value_to_index(&self, values: &[Vec<f64>]) -> Result<Vec<Option<usize>>> {
        let n = self.check_columns(values)?;
        Ok((0..n)
            .map(|p| {
                let point: SmallVec<[f64; 4]> = values.iter().map(|c| c[p]).collect();
                self.nearest_index(&point)
            })
            .collect())
    }

    fn nearest_index(&self, point: &[f64]) -> Option<usize> {
        if point.iter().any(|v| v.is_nan()) {
            return None;
        }
        match &self.topology {
            Topology::Linear(axes) => {
                let mut index = 0;
                let mut stride = 1;
                for (axis, v) in axes.iter().zip(point) {
                    index += axis.index_of(*v)? * stride;
                    stride *= axis.length;
                }
                Some(index)
            }
            Topology::Irregular(points) => points.nearest(point),
        }
    }

    /// Interpolation stencil for each position: multilinear on lattices,
    /// bracketing on 1-D irregular sets, inverse-distance over the
    /// `dimension + 1` nearest samples otherwise.
    pub fn value_to_interp(&self, values: &[Vec<f64>]) -> Result<Vec<Option<Interpolation>>> {
        let n = self.check_columns(values)?;
        Ok((0..n)
            .map(|p| {
                let point: SmallVec<[f64; 4]> = values.iter().map(|c| c[p]).collect();
                self.interpolate(&point)
            })
            .collect())
    }

    fn interpolate(&self, point: &[f64]) -> Option<Interpolation> {
        if point.iter().any(|v| v.is_nan()) {
            return None;
        }
        match &self.topology {
            Topology::Linear(axes) => {
                let mut stencil = Interpolation::single(0);
                let mut stride = 1;
                for (axis, v) in axes.iter().zip(point) {
                    let (lower, frac) = axis.bracket(*v)?;
                    let mut next = Interpolation {
                        indices: SmallVec::new(),
                        weights: SmallVec::new(),
                    };
                    for (i, w) in stencil.indices.iter().zip(&stencil.weights) {
                        if frac < 1.0 {
                            next.indices.push(i + lower * stride);
                            next.weights.push(w * (1.0 - frac));
                        }
                        if frac > 0.0 {
                            next.indices.push(i + (lower + 1) * stride);
                            next.weights.push(w * frac);
                        }
                    }
                    stencil = next;
                    stride *= axis.length;
                }
                Some(stencil)
            }
            Topology::Irregular(points) => points.interpolate(point),
        }
    }

    /// The `k` samples nearest to sample `index`, excluding itself, as
    /// `(index, distance)` pairs.
    pub fn neighbors(&self, index: usize, k: usize) -> Result<Vec<(usize, f64)>> {
        let point = self.sample(index)?;
        Ok(match &self.topology {
            Topology::Irregular(IrregularPoints {
                tree: Some(tree), ..
            }) => tree.nearest(&point, k, Some(index)),
            _ => {
                let samples = self.samples();
                let mut all: Vec<(usize, f64)> = (0..self.length())
                    .filter(|&i| i != index)
                    .map(|i| {
                        let d: f64 = samples
                            .iter()
                            .zip(&point)
                            .map(|(c, p)| (c[i] - p) * (c[i] - p))
                            .sum();
                        (i, d.sqrt())
                    })
                    .collect();
                all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                all.truncate(k);
                all
            }
        })
    }

    /// Per-axis lattice neighbours of sample `index`: for each axis, the
    /// lower and upper adjacent sample (clamped at the edges) and their
    /// coordinate separation. `None` for irregular sets.
    pub fn lattice_neighbors(&self, index: usize, axis: usize) -> Option<(usize, usize, f64)> {
        let Topology::Linear(axes) = &self.topology else {
            return None;
        };
        let line = axes.get(axis)?;
        if line.length < 2 || index >= self.length() {
            return None;
        }
        let coords = Self::lattice_coords(axes, index);
        let stride: usize = axes[..axis].iter().map(Linear1D::length).product();
        let i = coords[axis];
        let lo = i.saturating_sub(1);
        let hi = (i + 1).min(line.length - 1);
        let base = index - i * stride;
        Some((base + lo * stride, base + hi * stride, (hi - lo) as f64 * line.step()))
    }
}

impl PartialEq for DomainSet {
    fn eq(&self, other: &Self) -> bool {
        self.set_type == other.set_type && self.same_samples(other)
    }
}
